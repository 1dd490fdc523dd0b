//! Core data types for stale-branch classification

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A full commit object id as printed by git
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitId(String);

impl CommitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for display
    pub fn short(&self) -> &str {
        let end = self.0.len().min(8);
        &self.0[..end]
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A local branch as seen at scan time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Short branch name (without `refs/heads/`)
    pub name: String,
    /// Full upstream ref name, if tracking is configured
    pub upstream: Option<String>,
    /// Commit the branch points to
    pub head: CommitId,
}

/// Whether a branch's configured upstream still resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpstreamStatus {
    /// No tracking ref configured
    NoUpstream,
    /// Tracking ref configured and resolvable
    Exists,
    /// Tracking ref configured but no longer resolvable
    Gone,
}

impl fmt::Display for UpstreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamStatus::NoUpstream => write!(f, "no-upstream"),
            UpstreamStatus::Exists => write!(f, "exists"),
            UpstreamStatus::Gone => write!(f, "gone"),
        }
    }
}

/// Why a branch was (or was not) classified stale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StaleReason {
    /// Branch is in the protected set
    ProtectedSkip,
    /// Upstream tracking ref disappeared
    UpstreamGone,
    /// Branch history is contained in the base branch
    MergedIntoBase,
    /// Nothing marks the branch as stale
    None,
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaleReason::ProtectedSkip => write!(f, "protected"),
            StaleReason::UpstreamGone => write!(f, "upstream gone"),
            StaleReason::MergedIntoBase => write!(f, "merged into base"),
            StaleReason::None => write!(f, "active"),
        }
    }
}

/// Classification outcome for a single branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleVerdict {
    pub stale: bool,
    pub reason: StaleReason,
}

impl StaleVerdict {
    pub fn stale(reason: StaleReason) -> Self {
        Self {
            stale: true,
            reason,
        }
    }

    pub fn keep(reason: StaleReason) -> Self {
        Self {
            stale: false,
            reason,
        }
    }
}

/// Branch names that are never classified stale
///
/// Keeps the configured order so the first existing entry can serve as the
/// base branch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProtectedSet {
    ordered: Vec<String>,
    lookup: BTreeSet<String>,
}

impl ProtectedSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ordered = Vec::new();
        let mut lookup = BTreeSet::new();
        for name in names {
            let name = name.into();
            if lookup.insert(name.clone()) {
                ordered.push(name);
            }
        }
        Self { ordered, lookup }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup.contains(name)
    }

    /// Names in configured priority order
    pub fn priority_order(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}
