//! Implementation of the `sanitizer review` command

use sanitizer_core::ai::Assistant;
use sanitizer_core::interaction::InteractionAdapter;

use super::{GlobalOptions, Workspace, report_failure};
use crate::interaction::CliAdapter;
use crate::output::{JsonResponse, ReviewData};

const COMMAND: &str = "review";

/// Run the review command
pub fn run_review(staged: bool, global: &GlobalOptions) -> Result<i32, String> {
    let adapter = CliAdapter::new(global.quiet || global.json);
    let mut data = ReviewData {
        staged,
        review: None,
    };

    let workspace = match Workspace::open(global) {
        Ok(workspace) => workspace,
        Err(e) => return Ok(report_failure(COMMAND, data, &e, global)),
    };

    let diff = if staged {
        workspace.git.staged_diff()
    } else {
        workspace.git.working_diff()
    };
    let diff = match diff {
        Ok(diff) => diff,
        Err(e) => return Ok(report_failure(COMMAND, data, &e, global)),
    };

    if diff.trim().is_empty() {
        if global.json {
            JsonResponse::ok(COMMAND, data).print();
        } else {
            adapter.print_info("No changes to review");
        }
        return Ok(0);
    }

    let progress = adapter.start_progress("Reviewing changes");
    let review = workspace
        .assistant()
        .and_then(|client| client.code_review(&diff));
    adapter.end_progress(progress, review.is_ok());

    match review {
        Ok(text) => {
            if global.json {
                data.review = Some(text);
                JsonResponse::ok(COMMAND, data).print();
            } else if !global.quiet {
                adapter.print_header("Code review");
                println!("{}", text);
            }
            Ok(0)
        }
        Err(e) => Ok(report_failure(COMMAND, data, &e, global)),
    }
}
