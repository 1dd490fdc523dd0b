//! sanitizer-core: stale-branch detection and cleanup for git repositories
//!
//! This crate holds the classifier, the concurrent scanner, git access and
//! the supporting pieces used by the `sanitizer` binary.

/// Core error types
pub mod error;

/// Configuration handling
pub mod config;

/// Core data types (Branch, StaleVerdict, ProtectedSet, etc.)
pub mod types;

/// Git access through the `git` executable
pub mod git;

/// Stale-branch classification
pub mod classify;

/// Concurrent repository scan
pub mod scan;

/// Branch deletion and restoration
pub mod cleanup;

/// Record of deleted branch tips
pub mod journal;

/// Local LLM assistant
pub mod ai;

/// User interaction abstraction
pub mod interaction;

#[cfg(test)]
mod fake;

// Re-exports for convenience
pub use classify::{MergeStrategy, classify, resolve_base_branch};
pub use config::Config;
pub use error::SanitizerError;
pub use git::{GitCli, VcsGateway};
pub use scan::{BranchEvaluation, BranchOutcome, ScanOptions, ScanReport, Scanner};
pub use types::{Branch, CommitId, ProtectedSet, StaleReason, StaleVerdict, UpstreamStatus};
