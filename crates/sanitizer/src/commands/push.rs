//! Implementation of the `sanitizer push` command

use anyhow::Context;

use sanitizer_core::ai::Assistant;
use sanitizer_core::interaction::InteractionAdapter;
use sanitizer_core::{GitCli, SanitizerError};

use super::{GlobalOptions, Workspace, interaction_failure, report_failure};
use crate::interaction::CliAdapter;
use crate::output::{JsonIssue, JsonResponse, PushData};

const COMMAND: &str = "push";

/// Run the push command
pub fn run_push(auto: bool, global: &GlobalOptions) -> Result<i32, String> {
    let adapter = CliAdapter::new(global.quiet || global.json);
    let mut data = PushData::default();

    let workspace = match Workspace::open(global) {
        Ok(workspace) => workspace,
        Err(e) => return Ok(report_failure(COMMAND, data, &e, global)),
    };
    let git = &workspace.git;

    let diff = match git.stage_all().and_then(|()| git.staged_diff()) {
        Ok(diff) => diff,
        Err(e) => return Ok(report_failure(COMMAND, data, &e, global)),
    };
    if diff.trim().is_empty() {
        if global.json {
            JsonResponse::ok(COMMAND, data).print();
        } else {
            adapter.print_info("No changes to commit");
        }
        return Ok(0);
    }

    let progress = adapter.start_progress("Writing commit message");
    let client = workspace.assistant();
    let (message, ai_error) = match &client {
        Ok(client) => generate_message(Some(client as &dyn Assistant), &diff),
        Err(e) => (fallback_message(e), Some(e.to_string())),
    };
    adapter.end_progress(progress, ai_error.is_none());

    let mut issues = Vec::new();
    if let Some(cause) = &ai_error {
        adapter.print_warning(&format!("commit message generation failed: {}", cause));
        issues.push(JsonIssue {
            code: "E030".to_string(),
            severity: "warning".to_string(),
            message: cause.clone(),
            branch: None,
        });
    }

    adapter.print_header("Commit message:");
    adapter.print_info(&message);
    data.message = Some(message.clone());

    if !auto {
        match adapter.ask_confirm("Commit and push?", true) {
            Ok(true) => {}
            Ok(false) => {
                adapter.print_info("Aborted; changes remain staged");
                if global.json {
                    JsonResponse::ok_with_issues(COMMAND, data, issues).print();
                }
                return Ok(0);
            }
            Err(e) => return Ok(interaction_failure(COMMAND, data, &e, &adapter, global)),
        }
    }

    match commit_and_push(git, &message, &mut data) {
        Ok(()) => {
            if global.json {
                JsonResponse::ok_with_issues(COMMAND, data, issues).print();
            } else {
                adapter.print_success("Committed and pushed");
            }
            Ok(0)
        }
        Err(e) => {
            if global.json {
                issues.push(JsonIssue {
                    code: "E010".to_string(),
                    severity: "error".to_string(),
                    message: format!("{:#}", e),
                    branch: None,
                });
                JsonResponse::error(COMMAND, data, issues).print();
                Ok(1)
            } else {
                Err(format!("{:#}", e))
            }
        }
    }
}

fn commit_and_push(git: &GitCli, message: &str, data: &mut PushData) -> anyhow::Result<()> {
    git.commit(message).context("commit failed")?;
    data.committed = true;
    tracing::info!(message, "committed");

    git.push_current().context("push failed")?;
    data.pushed = true;
    tracing::info!("pushed");
    Ok(())
}

/// Commit message from the assistant, or the fallback with the failure cause
pub fn generate_message(assistant: Option<&dyn Assistant>, diff: &str) -> (String, Option<String>) {
    let Some(assistant) = assistant else {
        let err = SanitizerError::AiService("no assistant configured".to_string());
        return (fallback_message(&err), Some(err.to_string()));
    };
    match assistant.commit_message(diff) {
        Ok(message) if !message.trim().is_empty() => (message, None),
        Ok(_) => {
            let err = SanitizerError::AiResponse("empty commit message".to_string());
            (fallback_message(&err), Some(err.to_string()))
        }
        Err(e) => (fallback_message(&e), Some(e.to_string())),
    }
}

fn fallback_message(cause: &SanitizerError) -> String {
    format!("chore: automated commit (AI failed: {})", cause)
}
