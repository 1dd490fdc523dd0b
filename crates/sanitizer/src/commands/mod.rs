//! CLI command implementations

pub mod clean;
pub mod history;
pub mod push;
pub mod review;
pub mod undo;

pub use clean::{CleanOptions, run_clean};
pub use history::run_history;
pub use push::run_push;
pub use review::run_review;
pub use undo::run_undo;

use std::path::PathBuf;
use std::time::Duration;

use owo_colors::OwoColorize;
use serde::Serialize;

use sanitizer_core::ai::OllamaClient;
use sanitizer_core::interaction::{InteractionAdapter, InteractionError};
use sanitizer_core::journal::Journal;
use sanitizer_core::{Config, GitCli, SanitizerError};

use crate::colors::COLORS;
use crate::logging;
use crate::output::{JsonIssue, JsonResponse};

/// Exit code after the user interrupts a prompt
const EXIT_CANCELLED: i32 = 130;

/// Flags accepted by every command
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub verbose: bool,
    pub quiet: bool,
    pub json: bool,
    pub config: Option<PathBuf>,
}

/// Repository and configuration a command runs against
pub struct Workspace {
    pub git: GitCli,
    pub config: Config,
}

impl Workspace {
    /// Find the repository around the working directory and load its configuration
    ///
    /// Also installs file logging; relative log paths live in the git directory
    /// so they never show up as untracked files.
    pub fn open(global: &GlobalOptions) -> Result<Self, SanitizerError> {
        let cwd = std::env::current_dir()?;
        let git = GitCli::discover(&cwd)?;
        let config = Config::load(global.config.as_deref(), Some(git.repo_root()))?;
        let git = git.with_timeout(Duration::from_secs(config.scan.git_timeout_secs));

        let log_path = config.log_path(git.git_dir());
        if logging::init(&log_path, global.verbose) {
            tracing::debug!(
                repo = %git.repo_root().display(),
                log = %log_path.display(),
                "workspace opened"
            );
        }

        Ok(Self { git, config })
    }

    pub fn journal(&self) -> Journal {
        Journal::in_git_dir(self.git.git_dir())
    }

    pub fn assistant(&self) -> Result<OllamaClient, SanitizerError> {
        OllamaClient::new(&self.config.ai)
    }
}

/// Print a command-level failure and return its exit code
pub fn report_failure<T: Serialize>(
    command: &str,
    data: T,
    err: &SanitizerError,
    global: &GlobalOptions,
) -> i32 {
    tracing::error!(command, error = %err, "command failed");
    if global.json {
        JsonResponse::error(command, data, vec![JsonIssue::error(err)]).print();
    } else {
        eprintln!("{} {}", "error:".style(COLORS.fail).bold(), err);
    }
    err.exit_code()
}

/// Report an interrupted or impossible prompt and return the exit code
pub fn interaction_failure<T: Serialize>(
    command: &str,
    data: T,
    err: &InteractionError,
    adapter: &dyn InteractionAdapter,
    global: &GlobalOptions,
) -> i32 {
    tracing::warn!(command, error = %err, "prompt failed");
    if global.json {
        JsonResponse::error(command, data, vec![JsonIssue::interaction(err)]).print();
    }
    match err {
        InteractionError::Cancelled => {
            adapter.print_warning("cancelled");
            EXIT_CANCELLED
        }
        other => {
            adapter.print_error(&other.to_string());
            1
        }
    }
}


#[cfg(test)]
mod tests {
    use super::scripted::ScriptedAdapter;
    use super::*;

    #[test]
    fn test_cancelled_prompt_exit_code() {
        let adapter = ScriptedAdapter::default();
        let global = GlobalOptions::default();
        assert_eq!(
            interaction_failure("clean", (), &InteractionError::Cancelled, &adapter, &global),
            EXIT_CANCELLED
        );
        assert_eq!(
            interaction_failure("clean", (), &InteractionError::NonTty, &adapter, &global),
            1
        );
        assert!(adapter.printed.borrow()[1].starts_with("error:"));
    }

    #[test]
    fn test_prompt_failure_in_json_mode_keeps_exit_code() {
        let adapter = ScriptedAdapter::default();
        let global = GlobalOptions {
            json: true,
            ..GlobalOptions::default()
        };
        assert_eq!(
            interaction_failure("push", (), &InteractionError::NonTty, &adapter, &global),
            1
        );
    }

    #[test]
    fn test_report_failure_uses_error_exit_code() {
        let global = GlobalOptions {
            json: true,
            ..GlobalOptions::default()
        };
        let err = SanitizerError::Config("bad yaml".to_string());
        assert_eq!(report_failure("clean", (), &err, &global), 4);
    }
}
