//! Implementation of the `sanitizer clean` command

use owo_colors::OwoColorize;

use sanitizer_core::ai::{Assistant, BranchContext};
use sanitizer_core::cleanup::{DeletionOutcome, delete_branches};
use sanitizer_core::interaction::{InteractionAdapter, InteractionResult};
use sanitizer_core::scan::{BranchEvaluation, BranchOutcome};
use sanitizer_core::{Config, GitCli, Scanner, StaleReason};

use super::{GlobalOptions, Workspace, interaction_failure, report_failure};
use crate::colors::COLORS;
use crate::interaction::CliAdapter;
use crate::output::{CleanData, Explanation, JsonIssue, JsonResponse};

const COMMAND: &str = "clean";

/// Flags of the clean command
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanOptions {
    pub dry_run: bool,
    pub all: bool,
    pub force: bool,
    pub explain: bool,
    pub no_fetch: bool,
}

/// How branches to delete are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// Every stale branch, no prompt
    Force,
    /// Every stale branch after a single confirmation
    ConfirmAll,
    /// Pick from a checklist
    Menu,
}

impl SelectionMode {
    pub fn resolve(options: &CleanOptions, config: &Config) -> Self {
        if options.force {
            SelectionMode::Force
        } else if options.all || config.auto_confirm {
            SelectionMode::ConfirmAll
        } else {
            SelectionMode::Menu
        }
    }
}

/// Run the clean command
pub fn run_clean(options: CleanOptions, global: &GlobalOptions) -> Result<i32, String> {
    let adapter = CliAdapter::new(global.quiet || global.json);
    let workspace = match Workspace::open(global) {
        Ok(workspace) => workspace,
        Err(e) => return Ok(report_failure(COMMAND, CleanData::default(), &e, global)),
    };

    let mut issues = Vec::new();
    if !options.no_fetch {
        fetch(&workspace.git, &adapter, &mut issues);
    }

    let progress = adapter.start_progress("Scanning branches");
    let report = match Scanner::from_config(&workspace.git, &workspace.config).scan() {
        Ok(report) => {
            adapter.end_progress(progress, true);
            report
        }
        Err(e) => {
            adapter.end_progress(progress, false);
            return Ok(report_failure(COMMAND, CleanData::default(), &e, global));
        }
    };

    for entry in report.failures() {
        if let BranchOutcome::Failed { code, error } = &entry.outcome {
            adapter.print_warning(&format!("{}: {}", entry.name, error));
            issues.push(JsonIssue {
                code: code.clone(),
                severity: "warning".to_string(),
                message: error.clone(),
                branch: Some(entry.name.clone()),
            });
        }
    }

    let dry_run = options.dry_run || workspace.config.dry_run_default;
    let mut data = CleanData {
        base_branch: report.base_branch.clone(),
        dry_run,
        branches: report.entries.clone(),
        ..CleanData::default()
    };

    let stale: Vec<&BranchEvaluation> = report.stale().collect();
    if stale.is_empty() {
        if global.json {
            JsonResponse::ok_with_issues(COMMAND, data, issues).print();
        } else {
            adapter.print_success("No stale branches found");
        }
        return Ok(0);
    }

    if !global.json {
        print_stale(&stale, report.base_branch.as_deref(), &adapter);
    }

    if options.explain {
        let assistant = match workspace.assistant() {
            Ok(client) => Some(client),
            Err(e) => {
                adapter.print_warning(&format!("explanations unavailable: {}", e));
                issues.push(JsonIssue::warning(&e));
                None
            }
        };
        let assistant = assistant.as_ref().map(|a| a as &dyn Assistant);
        let (explanations, explain_issues) =
            explain_branches(&workspace.git, assistant, &stale, &adapter, global.json);
        data.explanations = explanations;
        issues.extend(explain_issues);
    }

    if dry_run {
        if global.json {
            JsonResponse::ok_with_issues(COMMAND, data, issues).print();
        } else {
            for entry in &stale {
                let line = format!("DRY RUN → {}", entry.name);
                adapter.print_info(&line.style(COLORS.warning).to_string());
            }
        }
        return Ok(0);
    }

    let mode = SelectionMode::resolve(&options, &workspace.config);
    let selected = match select_branches(mode, &stale, &adapter) {
        Ok(selected) => selected,
        Err(e) => return Ok(interaction_failure(COMMAND, data, &e, &adapter, global)),
    };

    if selected.is_empty() {
        if global.json {
            JsonResponse::ok_with_issues(COMMAND, data, issues).print();
        } else {
            adapter.print_info("No branches selected");
        }
        return Ok(0);
    }

    let journal = workspace.journal();
    let outcomes = delete_branches(&workspace.git, Some(&journal), &selected, true);
    for outcome in &outcomes {
        if let Some(error) = &outcome.error {
            issues.push(JsonIssue {
                code: "E020".to_string(),
                severity: "error".to_string(),
                message: error.clone(),
                branch: Some(outcome.branch.clone()),
            });
        }
    }

    if global.json {
        data.deleted = outcomes;
        JsonResponse::ok_with_issues(COMMAND, data, issues).print();
    } else {
        print_deletions(&outcomes, &adapter);
    }

    Ok(0)
}

/// `git fetch --prune` when remotes exist; problems are only warnings
fn fetch(git: &GitCli, adapter: &dyn InteractionAdapter, issues: &mut Vec<JsonIssue>) {
    match git.has_remotes() {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!("no remotes configured, skipping fetch");
            return;
        }
        Err(e) => {
            adapter.print_warning(&format!("could not list remotes: {}", e));
            issues.push(JsonIssue::warning(&e));
            return;
        }
    }

    let progress = adapter.start_progress("Fetching and pruning remotes");
    match git.fetch_prune() {
        Ok(()) => adapter.end_progress(progress, true),
        Err(e) => {
            adapter.end_progress(progress, false);
            adapter.print_warning(&format!("fetch failed, using local state: {}", e));
            issues.push(JsonIssue::warning(&e));
        }
    }
}

/// Label shown for a stale branch in listings and menus
fn branch_label(entry: &BranchEvaluation) -> String {
    let reason = entry
        .verdict()
        .map(|v| v.reason)
        .unwrap_or(StaleReason::None);
    format!("{} ({})", entry.name, reason)
}

fn print_stale(stale: &[&BranchEvaluation], base: Option<&str>, adapter: &dyn InteractionAdapter) {
    let header = match base {
        Some(base) => format!("Stale branches (base: {})", base),
        None => "Stale branches (no base branch, merge checks skipped)".to_string(),
    };
    adapter.print_header(&header);

    let width = stale.iter().map(|e| e.name.len()).max().unwrap_or(0);
    for entry in stale {
        let reason = entry.verdict().map(|v| v.reason).unwrap_or(StaleReason::None);
        let head = entry
            .facts()
            .map(|f| f.branch.head.short().to_string())
            .unwrap_or_default();
        adapter.print_info(&format!(
            "  {:<width$}  {}  {}",
            entry.name,
            reason.to_string().style(COLORS.reason(reason)),
            head.style(COLORS.muted),
            width = width
        ));
    }
}

/// Ask the assistant about each stale branch
///
/// Failures are per branch and never stop the cleanup.
pub fn explain_branches(
    git: &GitCli,
    assistant: Option<&dyn Assistant>,
    stale: &[&BranchEvaluation],
    adapter: &dyn InteractionAdapter,
    quiet: bool,
) -> (Vec<Explanation>, Vec<JsonIssue>) {
    let mut explanations = Vec::new();
    let mut issues = Vec::new();
    let Some(assistant) = assistant else {
        return (explanations, issues);
    };

    for entry in stale {
        let (Some(facts), Some(verdict)) = (entry.facts(), entry.verdict()) else {
            continue;
        };
        let metadata = match git.branch_metadata(&entry.name) {
            Ok(metadata) => metadata,
            Err(e) => {
                adapter.print_warning(&format!("{}: {}", entry.name, e));
                issues.push(JsonIssue::warning(&e).with_branch(&entry.name));
                continue;
            }
        };

        let context = BranchContext {
            name: &entry.name,
            metadata: &metadata,
            upstream_status: facts.upstream_status,
            merged_into_base: facts.merged_into_base,
            reason: verdict.reason,
        };

        let progress = adapter.start_progress(&format!("Explaining {}", entry.name));
        match assistant.explain_branch(&context) {
            Ok(text) => {
                adapter.end_progress(progress, true);
                if !quiet {
                    adapter.print_header(&entry.name);
                    adapter.print_info(&text);
                }
                explanations.push(Explanation {
                    branch: entry.name.clone(),
                    text,
                });
            }
            Err(e) => {
                adapter.end_progress(progress, false);
                adapter.print_warning(&format!("no explanation for {}: {}", entry.name, e));
                issues.push(JsonIssue::warning(&e).with_branch(&entry.name));
            }
        }
    }

    (explanations, issues)
}

/// Pick the branches to delete
pub fn select_branches(
    mode: SelectionMode,
    stale: &[&BranchEvaluation],
    adapter: &dyn InteractionAdapter,
) -> InteractionResult<Vec<String>> {
    let names = || stale.iter().map(|e| e.name.clone()).collect::<Vec<_>>();

    match mode {
        SelectionMode::Force => Ok(names()),
        SelectionMode::ConfirmAll => {
            let prompt = format!("Delete all {} stale branches?", stale.len());
            if adapter.ask_confirm(&prompt, false)? {
                Ok(names())
            } else {
                Ok(Vec::new())
            }
        }
        SelectionMode::Menu => {
            let labels: Vec<String> = stale.iter().map(|e| branch_label(e)).collect();
            let options: Vec<&str> = labels.iter().map(String::as_str).collect();
            // Every stale branch starts checked
            let defaults = vec![true; options.len()];
            let picked =
                adapter.ask_multi_select("Select branches to delete", &options, &defaults)?;
            Ok(picked
                .into_iter()
                .filter_map(|i| stale.get(i).map(|e| e.name.clone()))
                .collect())
        }
    }
}

fn print_deletions(outcomes: &[DeletionOutcome], adapter: &dyn InteractionAdapter) {
    let mut deleted = 0;
    for outcome in outcomes {
        match &outcome.error {
            None => {
                deleted += 1;
                let commit = outcome
                    .commit
                    .as_ref()
                    .map(|c| c.short().to_string())
                    .unwrap_or_default();
                adapter.print_success(&format!("Deleted {} (was {})", outcome.branch, commit));
            }
            Some(error) => adapter.print_error(error),
        }
    }
    adapter.print_info(&format!(
        "{} of {} branches deleted; restore with `sanitizer undo <branch>`",
        deleted,
        outcomes.len()
    ));
}
