//! Implementation of the `sanitizer undo` command

use owo_colors::OwoColorize;

use sanitizer_core::cleanup::{RestoreSource, restore_branch};

use super::{GlobalOptions, Workspace, report_failure};
use crate::colors::COLORS;
use crate::output::{JsonResponse, UndoData};

const COMMAND: &str = "undo";

/// Run the undo command
pub fn run_undo(branch: String, global: &GlobalOptions) -> Result<i32, String> {
    let mut data = UndoData {
        branch: branch.clone(),
        restored: None,
    };

    let workspace = match Workspace::open(global) {
        Ok(workspace) => workspace,
        Err(e) => return Ok(report_failure(COMMAND, data, &e, global)),
    };

    let journal = workspace.journal();
    let restored = match restore_branch(&workspace.git, Some(&journal), &branch) {
        Ok(restored) => restored,
        Err(e) => return Ok(report_failure(COMMAND, data, &e, global)),
    };

    if global.json {
        data.restored = Some(restored);
        JsonResponse::ok(COMMAND, data).print();
    } else if !global.quiet {
        let source = match restored.source {
            RestoreSource::Journal => "deletion journal",
            RestoreSource::Reflog => "reflog",
        };
        let line = format!("Restored {} at {}", restored.branch, restored.commit.short());
        println!(
            "{} {} {}",
            "✓".style(COLORS.success),
            line.style(COLORS.success),
            format!("(from {})", source).style(COLORS.muted)
        );
    }

    Ok(0)
}
