//! Repository scan: classify every local branch
//!
//! The branch list and the base branch are taken once, up front. Protected
//! branches are classified without touching git; every other branch is
//! evaluated on a bounded pool of worker threads. Results come back in the
//! order `list_local_branches` returned them, whatever order workers finish in.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classify::{
    MergeCheck, MergeStrategy, classify, resolve_base_branch, upstream_status,
};
use crate::config::Config;
use crate::error::SanitizerError;
use crate::git::VcsGateway;
use crate::types::{Branch, ProtectedSet, StaleReason, StaleVerdict, UpstreamStatus};

/// Worker count used when available parallelism cannot be determined
const FALLBACK_WORKERS: usize = 4;

/// Facts gathered about one non-protected branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchFacts {
    pub branch: Branch,
    pub upstream_status: UpstreamStatus,
    pub merged_into_base: bool,
}

/// Result of evaluating one branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum BranchOutcome {
    /// Classification succeeded. Facts are absent for protected branches.
    Classified {
        verdict: StaleVerdict,
        #[serde(skip_serializing_if = "Option::is_none")]
        facts: Option<BranchFacts>,
    },
    /// A git query for this branch failed; no verdict was produced
    Failed { code: String, error: String },
}

/// One entry of a scan report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchEvaluation {
    pub name: String,
    #[serde(flatten)]
    pub outcome: BranchOutcome,
}

impl BranchEvaluation {
    pub fn verdict(&self) -> Option<StaleVerdict> {
        match &self.outcome {
            BranchOutcome::Classified { verdict, .. } => Some(*verdict),
            BranchOutcome::Failed { .. } => None,
        }
    }

    pub fn facts(&self) -> Option<&BranchFacts> {
        match &self.outcome {
            BranchOutcome::Classified { facts, .. } => facts.as_ref(),
            BranchOutcome::Failed { .. } => None,
        }
    }

    pub fn is_stale(&self) -> bool {
        self.verdict().is_some_and(|v| v.stale)
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            BranchOutcome::Failed { error, .. } => Some(error),
            BranchOutcome::Classified { .. } => None,
        }
    }
}

/// Outcome of a full scan, in branch enumeration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Base branch used for merge checks, if any protected branch exists
    pub base_branch: Option<String>,
    pub entries: Vec<BranchEvaluation>,
}

impl ScanReport {
    /// Branches classified stale
    pub fn stale(&self) -> impl Iterator<Item = &BranchEvaluation> {
        self.entries.iter().filter(|e| e.is_stale())
    }

    pub fn stale_names(&self) -> Vec<String> {
        self.stale().map(|e| e.name.clone()).collect()
    }

    /// Branches whose evaluation failed
    pub fn failures(&self) -> impl Iterator<Item = &BranchEvaluation> {
        self.entries.iter().filter(|e| e.error().is_some())
    }

    pub fn get(&self, name: &str) -> Option<&BranchEvaluation> {
        self.entries.iter().find(|e| e.name == name)
    }
}

/// Tuning for a scan
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    /// Worker threads; available parallelism when None
    pub workers: Option<usize>,
    pub strategy: MergeStrategy,
}

impl ScanOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            workers: config.scan.workers,
            strategy: config.scan.merge_strategy,
        }
    }

    /// Number of workers to run for `pending` branches
    pub fn worker_count(&self, pending: usize) -> usize {
        let wanted = self.workers.unwrap_or_else(|| {
            thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(FALLBACK_WORKERS)
        });
        wanted.max(1).min(pending.max(1))
    }
}

/// Classifies every local branch of a repository
pub struct Scanner<'a, G: VcsGateway + ?Sized> {
    gateway: &'a G,
    protected: ProtectedSet,
    options: ScanOptions,
}

impl<'a, G: VcsGateway + ?Sized> Scanner<'a, G> {
    pub fn new(gateway: &'a G, protected: ProtectedSet, options: ScanOptions) -> Self {
        Self {
            gateway,
            protected,
            options,
        }
    }

    pub fn from_config(gateway: &'a G, config: &Config) -> Self {
        Self::new(gateway, config.protected_set(), ScanOptions::from_config(config))
    }

    /// Run a scan
    ///
    /// Only a failure to enumerate branches is an error. Per-branch query
    /// failures are reported as `BranchOutcome::Failed` entries.
    pub fn scan(&self) -> Result<ScanReport, SanitizerError> {
        let branches = self.gateway.list_local_branches().map_err(|e| match e {
            fatal if fatal.is_fatal() => fatal,
            other => SanitizerError::BranchListing(other.to_string()),
        })?;
        let base_branch = resolve_base_branch(&self.protected, &branches);

        let mut slots: Vec<Option<BranchOutcome>> = vec![None; branches.len()];
        let mut pending = Vec::new();
        for (index, name) in branches.iter().enumerate() {
            if self.protected.contains(name) {
                let verdict = classify(name, &self.protected, UpstreamStatus::NoUpstream, false);
                slots[index] = Some(BranchOutcome::Classified {
                    verdict,
                    facts: None,
                });
            } else {
                pending.push(index);
            }
        }

        let workers = self.options.worker_count(pending.len());
        info!(
            branches = branches.len(),
            pending = pending.len(),
            workers,
            base = base_branch.as_deref().unwrap_or("<none>"),
            "scanning branches"
        );

        let check = if pending.is_empty() {
            Ok(MergeCheck::NoBase)
        } else {
            MergeCheck::prepare(self.gateway, self.options.strategy, base_branch.as_deref())
        };

        match check {
            Err(e) => {
                // Without merge state no pending branch can be classified
                warn!(error = %e, "merge state unavailable");
                for &index in &pending {
                    slots[index] = Some(BranchOutcome::Failed {
                        code: e.code().to_string(),
                        error: e.to_string(),
                    });
                }
            }
            Ok(_) if pending.is_empty() => {}
            Ok(check) => self.evaluate_pending(&branches, &pending, &check, workers, &mut slots),
        }

        let entries: Vec<BranchEvaluation> = branches
            .into_iter()
            .zip(slots)
            .map(|(name, slot)| BranchEvaluation {
                outcome: slot.unwrap_or_else(|| BranchOutcome::Failed {
                    code: "E010".to_string(),
                    error: "evaluation did not complete".to_string(),
                }),
                name,
            })
            .collect();

        let report = ScanReport {
            base_branch,
            entries,
        };
        info!(
            stale = report.stale().count(),
            failed = report.failures().count(),
            "scan complete"
        );
        Ok(report)
    }

    /// Fan pending branches out over `workers` threads; results land by index
    fn evaluate_pending(
        &self,
        branches: &[String],
        pending: &[usize],
        check: &MergeCheck,
        workers: usize,
        slots: &mut [Option<BranchOutcome>],
    ) {
        let cursor = AtomicUsize::new(0);
        let cursor = &cursor;
        let (tx, rx) = mpsc::channel();

        thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                scope.spawn(move || {
                    loop {
                        let next = cursor.fetch_add(1, Ordering::Relaxed);
                        let Some(&index) = pending.get(next) else {
                            break;
                        };
                        let outcome = self.evaluate(&branches[index], check);
                        if tx.send((index, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(tx);

            for (index, outcome) in rx {
                slots[index] = Some(outcome);
            }
        });
    }

    fn evaluate(&self, name: &str, check: &MergeCheck) -> BranchOutcome {
        match self.gather(name, check) {
            Ok(facts) => {
                let verdict = classify(
                    name,
                    &self.protected,
                    facts.upstream_status,
                    facts.merged_into_base,
                );
                debug!(branch = name, stale = verdict.stale, reason = %verdict.reason, "classified");
                BranchOutcome::Classified {
                    verdict,
                    facts: Some(facts),
                }
            }
            Err(e) => {
                warn!(branch = name, error = %e, "branch evaluation failed");
                BranchOutcome::Failed {
                    code: e.code().to_string(),
                    error: e.to_string(),
                }
            }
        }
    }

    fn gather(&self, name: &str, check: &MergeCheck) -> Result<BranchFacts, SanitizerError> {
        let head = self.gateway.head_commit(name)?;
        let (status, upstream) = upstream_status(self.gateway, name)?;
        // A gone upstream decides the verdict whatever the merge state
        let merged = match status {
            UpstreamStatus::Gone => false,
            UpstreamStatus::Exists | UpstreamStatus::NoUpstream => {
                check.is_merged(self.gateway, name, &head)?
            }
        };
        Ok(BranchFacts {
            branch: Branch {
                name: name.to_string(),
                upstream,
                head,
            },
            upstream_status: status,
            merged_into_base: merged,
        })
    }
}

/// Reason shown for a stale entry, if any
pub fn stale_reason(entry: &BranchEvaluation) -> Option<StaleReason> {
    entry.verdict().filter(|v| v.stale).map(|v| v.reason)
}
