//! Stale-branch classification
//!
//! `classify` is a pure function of the facts gathered for one branch. The
//! gathering helpers below turn gateway queries into those facts.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::SanitizerError;
use crate::git::{VcsGateway, local_ref};
use crate::types::{CommitId, ProtectedSet, StaleReason, StaleVerdict, UpstreamStatus};

/// How "merged into base" is decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeStrategy {
    /// merge-base(base, branch) equals the branch head
    #[default]
    Ancestor,
    /// branch is listed among the branches merged into base
    MergedList,
}

/// Decide whether a branch is stale
///
/// Protection is checked first and wins over everything else; a gone
/// upstream wins over merge state.
pub fn classify(
    branch: &str,
    protected: &ProtectedSet,
    upstream: UpstreamStatus,
    merged_into_base: bool,
) -> StaleVerdict {
    if protected.contains(branch) {
        return StaleVerdict::keep(StaleReason::ProtectedSkip);
    }

    match (upstream, merged_into_base) {
        (UpstreamStatus::Gone, _) => StaleVerdict::stale(StaleReason::UpstreamGone),
        (UpstreamStatus::Exists | UpstreamStatus::NoUpstream, true) => {
            StaleVerdict::stale(StaleReason::MergedIntoBase)
        }
        (UpstreamStatus::Exists | UpstreamStatus::NoUpstream, false) => {
            StaleVerdict::keep(StaleReason::None)
        }
    }
}

/// First protected name, in priority order, present in the branch snapshot
pub fn resolve_base_branch(protected: &ProtectedSet, local_branches: &[String]) -> Option<String> {
    protected
        .priority_order()
        .find(|candidate| local_branches.iter().any(|b| b == candidate))
        .map(str::to_string)
}

/// Upstream status of a branch, with the upstream ref name when configured
pub fn upstream_status<G: VcsGateway + ?Sized>(
    gateway: &G,
    branch: &str,
) -> Result<(UpstreamStatus, Option<String>), SanitizerError> {
    match gateway.resolve_upstream(branch)? {
        None => Ok((UpstreamStatus::NoUpstream, None)),
        Some(upstream) => {
            let status = if gateway.ref_exists(&upstream)? {
                UpstreamStatus::Exists
            } else {
                UpstreamStatus::Gone
            };
            Ok((status, Some(upstream)))
        }
    }
}

/// Merge-state lookup prepared once per scan
///
/// `MergedList` lists the merged branches a single time; `Ancestor` asks for
/// a merge base per branch. No base branch means nothing counts as merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeCheck {
    NoBase,
    Ancestor { base: String },
    Listed { merged: BTreeSet<String> },
}

impl MergeCheck {
    pub fn prepare<G: VcsGateway + ?Sized>(
        gateway: &G,
        strategy: MergeStrategy,
        base: Option<&str>,
    ) -> Result<Self, SanitizerError> {
        let Some(base) = base else {
            return Ok(MergeCheck::NoBase);
        };

        match strategy {
            MergeStrategy::Ancestor => Ok(MergeCheck::Ancestor {
                base: base.to_string(),
            }),
            MergeStrategy::MergedList => {
                let merged = gateway.merged_branches(&local_ref(base))?;
                Ok(MergeCheck::Listed {
                    merged: merged.into_iter().collect(),
                })
            }
        }
    }

    /// Whether `branch` (pointing at `head`) is fully contained in the base
    ///
    /// Histories with no common commit are "not merged".
    pub fn is_merged<G: VcsGateway + ?Sized>(
        &self,
        gateway: &G,
        branch: &str,
        head: &CommitId,
    ) -> Result<bool, SanitizerError> {
        match self {
            MergeCheck::NoBase => Ok(false),
            MergeCheck::Ancestor { base } => {
                let merge_base = gateway.merge_base(&local_ref(base), &local_ref(branch))?;
                Ok(merge_base.as_ref() == Some(head))
            }
            MergeCheck::Listed { merged } => Ok(merged.contains(branch)),
        }
    }
}
