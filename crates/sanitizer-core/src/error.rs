//! Error types for repo-sanitizer operations

use thiserror::Error;

/// Core error type for repo-sanitizer operations
#[derive(Error, Debug)]
pub enum SanitizerError {
    // === Environment errors (E001-E003) ===
    /// E001: Working directory is not inside a git repository
    #[error("E001: Not a git repository: {path}")]
    NotAGitRepository { path: String },

    /// E002: git executable missing or not runnable
    #[error("E002: git is not installed or could not be executed: {0}")]
    GitUnavailable(String),

    /// E003: Local branches could not be enumerated
    #[error("E003: Failed to enumerate local branches: {0}")]
    BranchListing(String),

    // === Query errors (E010-E012) ===
    /// E010: A git command exited unsuccessfully
    #[error("E010: git {command} failed: {stderr}")]
    GitCommand { command: String, stderr: String },

    /// E011: A git command exceeded its deadline
    #[error("E011: git {command} timed out after {secs} seconds")]
    GitTimeout { command: String, secs: u64 },

    /// E012: A branch or ref that was expected to exist does not
    #[error("E012: Ref not found: {0}")]
    RefNotFound(String),

    // === Execution errors (E020-E022) ===
    /// E020: Branch deletion failed
    #[error("E020: Failed to delete branch {branch}: {reason}")]
    DeleteFailed { branch: String, reason: String },

    /// E021: No commit could be found to restore a branch from
    #[error("E021: No recorded commit to restore branch {0} from")]
    NothingToRestore(String),

    /// E022: Branch to restore already exists
    #[error("E022: Branch already exists: {0}")]
    BranchExists(String),

    // === External service errors (E030-E031) ===
    /// E030: The local LLM service failed or was unreachable
    #[error("E030: AI service error: {0}")]
    AiService(String),

    /// E031: The local LLM service answered with an unexpected payload
    #[error("E031: AI service returned an invalid response: {0}")]
    AiResponse(String),

    // === IO and system errors ===
    /// IO error
    #[error("E040: IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("E041: Configuration error: {0}")]
    Config(String),

    /// Deletion journal could not be read or written
    #[error("E042: Journal error: {0}")]
    Journal(String),
}

impl SanitizerError {
    /// Get the error code (e.g., "E001", "E010")
    pub fn code(&self) -> &'static str {
        match self {
            SanitizerError::NotAGitRepository { .. } => "E001",
            SanitizerError::GitUnavailable(_) => "E002",
            SanitizerError::BranchListing(_) => "E003",
            SanitizerError::GitCommand { .. } => "E010",
            SanitizerError::GitTimeout { .. } => "E011",
            SanitizerError::RefNotFound(_) => "E012",
            SanitizerError::DeleteFailed { .. } => "E020",
            SanitizerError::NothingToRestore(_) => "E021",
            SanitizerError::BranchExists(_) => "E022",
            SanitizerError::AiService(_) => "E030",
            SanitizerError::AiResponse(_) => "E031",
            SanitizerError::Io(_) => "E040",
            SanitizerError::Config(_) => "E041",
            SanitizerError::Journal(_) => "E042",
        }
    }

    /// Get the exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            SanitizerError::NotAGitRepository { .. } | SanitizerError::GitUnavailable(_) => 2,

            SanitizerError::BranchListing(_) => 3,

            SanitizerError::GitCommand { .. }
            | SanitizerError::GitTimeout { .. }
            | SanitizerError::RefNotFound(_)
            | SanitizerError::DeleteFailed { .. } => 1,

            SanitizerError::NothingToRestore(_) | SanitizerError::BranchExists(_) => 1,

            SanitizerError::AiService(_) | SanitizerError::AiResponse(_) => 1,

            SanitizerError::Io(_) | SanitizerError::Journal(_) => 1,

            SanitizerError::Config(_) => 4,
        }
    }

    /// True for failures that mean the repository itself is unusable
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SanitizerError::NotAGitRepository { .. }
                | SanitizerError::GitUnavailable(_)
                | SanitizerError::BranchListing(_)
        )
    }
}
