//! JSON output formatting

use serde::Serialize;

use sanitizer_core::SanitizerError;
use sanitizer_core::interaction::InteractionError;
use sanitizer_core::cleanup::{DeletionOutcome, RestoreOutcome};
use sanitizer_core::git::CommitSummary;
use sanitizer_core::scan::BranchEvaluation;

const SCHEMA_VERSION: &str = "1";

/// Issue code for a prompt that could not be shown
const PROMPT_UNAVAILABLE: &str = "E050";
/// Issue code for a prompt the user interrupted
const PROMPT_CANCELLED: &str = "E051";

/// JSON response envelope shared by every command
#[derive(Debug, Clone, Serialize)]
pub struct JsonResponse<T> {
    /// Schema version for forward compatibility
    pub schema_version: String,
    /// Command that generated this response
    pub command: String,
    /// Status: "ok" or "error"
    pub status: String,
    /// Command-specific payload
    pub data: T,
    /// Errors and warnings
    pub issues: Vec<JsonIssue>,
}

impl<T> JsonResponse<T> {
    pub fn ok(command: &str, data: T) -> Self {
        Self::ok_with_issues(command, data, vec![])
    }

    pub fn ok_with_issues(command: &str, data: T, issues: Vec<JsonIssue>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            command: command.to_string(),
            status: "ok".to_string(),
            data,
            issues,
        }
    }

    pub fn error(command: &str, data: T, issues: Vec<JsonIssue>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            command: command.to_string(),
            status: "error".to_string(),
            data,
            issues,
        }
    }
}

impl<T: Serialize> JsonResponse<T> {
    /// Pretty-print to stdout
    pub fn print(&self) {
        match serde_json::to_string_pretty(self) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("error: failed to serialize response: {}", e),
        }
    }
}

/// Issue object
#[derive(Debug, Clone, Serialize)]
pub struct JsonIssue {
    /// Error/warning code (e.g., "E001")
    pub code: String,
    /// "error" or "warning"
    pub severity: String,
    pub message: String,
    /// Branch the issue concerns, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl JsonIssue {
    pub fn error(err: &SanitizerError) -> Self {
        Self {
            code: err.code().to_string(),
            severity: "error".to_string(),
            message: err.to_string(),
            branch: None,
        }
    }

    pub fn warning(err: &SanitizerError) -> Self {
        Self {
            severity: "warning".to_string(),
            ..Self::error(err)
        }
    }

    pub fn interaction(err: &InteractionError) -> Self {
        let code = match err {
            InteractionError::Cancelled => PROMPT_CANCELLED,
            InteractionError::NonTty
            | InteractionError::InvalidInput(_)
            | InteractionError::Io(_) => PROMPT_UNAVAILABLE,
        };
        Self {
            code: code.to_string(),
            severity: "error".to_string(),
            message: err.to_string(),
            branch: None,
        }
    }

    pub fn with_branch(mut self, branch: &str) -> Self {
        self.branch = Some(branch.to_string());
        self
    }
}

/// Data payload for clean command
#[derive(Debug, Clone, Serialize, Default)]
pub struct CleanData {
    pub base_branch: Option<String>,
    pub dry_run: bool,
    /// Every local branch with its classification
    pub branches: Vec<BranchEvaluation>,
    pub deleted: Vec<DeletionOutcome>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub explanations: Vec<Explanation>,
}

/// Assistant explanation for one stale branch
#[derive(Debug, Clone, Serialize)]
pub struct Explanation {
    pub branch: String,
    pub text: String,
}

/// Data payload for undo command
#[derive(Debug, Clone, Serialize, Default)]
pub struct UndoData {
    pub branch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restored: Option<RestoreOutcome>,
}

/// Data payload for push command
#[derive(Debug, Clone, Serialize, Default)]
pub struct PushData {
    pub message: Option<String>,
    pub committed: bool,
    pub pushed: bool,
}

/// Data payload for review command
#[derive(Debug, Clone, Serialize, Default)]
pub struct ReviewData {
    pub staged: bool,
    pub review: Option<String>,
}

/// Data payload for history command
#[derive(Debug, Clone, Serialize, Default)]
pub struct HistoryData {
    pub commits: Vec<CommitSummary>,
    pub summary: Option<String>,
}
