//! Implementation of the `sanitizer history` command

use owo_colors::OwoColorize;

use sanitizer_core::ai::Assistant;
use sanitizer_core::interaction::InteractionAdapter;

use super::{GlobalOptions, Workspace, report_failure};
use crate::colors::COLORS;
use crate::interaction::CliAdapter;
use crate::output::{HistoryData, JsonResponse};

const COMMAND: &str = "history";

/// Run the history command
pub fn run_history(count: usize, global: &GlobalOptions) -> Result<i32, String> {
    let adapter = CliAdapter::new(global.quiet || global.json);
    let mut data = HistoryData::default();

    let workspace = match Workspace::open(global) {
        Ok(workspace) => workspace,
        Err(e) => return Ok(report_failure(COMMAND, data, &e, global)),
    };

    data.commits = match workspace.git.recent_commits(count) {
        Ok(commits) => commits,
        Err(e) => return Ok(report_failure(COMMAND, data, &e, global)),
    };

    if data.commits.is_empty() {
        if global.json {
            JsonResponse::ok(COMMAND, data).print();
        } else {
            adapter.print_info("No commits to summarize");
        }
        return Ok(0);
    }

    if !global.json && !global.quiet {
        adapter.print_header(&format!("Last {} commits", data.commits.len()));
        for commit in &data.commits {
            println!(
                "  {} {} {}",
                commit.hash.style(COLORS.muted),
                commit.message,
                format!("({})", commit.author).style(COLORS.muted)
            );
        }
        println!();
    }

    let progress = adapter.start_progress("Summarizing history");
    let summary = workspace
        .assistant()
        .and_then(|client| client.summarize_history(&data.commits));
    adapter.end_progress(progress, summary.is_ok());

    match summary {
        Ok(text) => {
            if global.json {
                data.summary = Some(text);
                JsonResponse::ok(COMMAND, data).print();
            } else if !global.quiet {
                adapter.print_header("Summary");
                println!("{}", text);
            }
            Ok(0)
        }
        Err(e) => Ok(report_failure(COMMAND, data, &e, global)),
    }
}
