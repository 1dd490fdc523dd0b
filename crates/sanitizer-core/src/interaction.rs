//! User interaction abstraction
//!
//! Commands talk to the user only through `InteractionAdapter`, so the
//! cleanup flow can be driven by a terminal adapter or by a scripted one in
//! tests.

use thiserror::Error;

/// Errors from interactive prompts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InteractionError {
    /// A prompt was needed but stdin is not a terminal
    #[error("interactive input required but stdin is not a terminal (use --force or --dry-run)")]
    NonTty,

    /// User interrupted the prompt
    #[error("operation cancelled")]
    Cancelled,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("terminal error: {0}")]
    Io(String),
}

pub type InteractionResult<T> = Result<T, InteractionError>;

/// Handle for a running progress indicator
#[derive(Debug)]
pub struct ProgressHandle {
    id: u64,
    message: String,
}

impl ProgressHandle {
    pub fn new(id: u64, message: impl Into<String>) -> Self {
        Self {
            id,
            message: message.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Prompts, progress and status messages
pub trait InteractionAdapter {
    /// Yes/no question
    fn ask_confirm(&self, prompt: &str, default: bool) -> InteractionResult<bool>;

    /// Pick any subset of `options`; returns selected indices
    ///
    /// `defaults[i]` pre-checks option `i`; missing entries start unchecked.
    fn ask_multi_select(
        &self,
        prompt: &str,
        options: &[&str],
        defaults: &[bool],
    ) -> InteractionResult<Vec<usize>>;

    fn start_progress(&self, message: &str) -> ProgressHandle;
    fn end_progress(&self, handle: ProgressHandle, success: bool);

    fn print_info(&self, message: &str);
    fn print_warning(&self, message: &str);
    fn print_error(&self, message: &str);
    fn print_success(&self, message: &str);
    fn print_header(&self, message: &str);
}
