//! Semantic color theme for consistent terminal output
//!
//! - `active` => blue: headers, branch names being worked on
//! - `success` => green: deleted or restored branches
//! - `warning` => yellow: stale reasons, dry-run notices
//! - `fail` => red: per-branch failures
//! - `muted` => dimmed: commit ids and secondary details
//!
//! Output that is not a terminal gets no escape codes.

use std::io::IsTerminal;
use std::sync::LazyLock;

use owo_colors::Style;
use sanitizer_core::StaleReason;

/// Semantic color definitions for terminal output
pub struct SemanticColors {
    pub active: Style,
    pub success: Style,
    pub warning: Style,
    pub fail: Style,
    pub muted: Style,
}

impl Default for SemanticColors {
    fn default() -> Self {
        if std::io::stdout().is_terminal() {
            Self::colored()
        } else {
            Self::plain()
        }
    }
}

impl SemanticColors {
    pub fn colored() -> Self {
        Self {
            active: Style::new().blue(),
            success: Style::new().green(),
            warning: Style::new().yellow(),
            fail: Style::new().red(),
            muted: Style::new().dimmed(),
        }
    }

    /// No escape codes, for pipes and files
    pub fn plain() -> Self {
        Self {
            active: Style::new(),
            success: Style::new(),
            warning: Style::new(),
            fail: Style::new(),
            muted: Style::new(),
        }
    }

    /// Style for a classification reason
    pub fn reason(&self, reason: StaleReason) -> Style {
        match reason {
            StaleReason::UpstreamGone | StaleReason::MergedIntoBase => self.warning,
            StaleReason::ProtectedSkip | StaleReason::None => self.muted,
        }
    }
}

/// Global default theme
pub static COLORS: LazyLock<SemanticColors> = LazyLock::new(SemanticColors::default);
