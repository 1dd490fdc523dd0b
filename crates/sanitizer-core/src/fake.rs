//! In-memory `VcsGateway` for unit tests

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use crate::error::SanitizerError;
use crate::git::VcsGateway;
use crate::types::CommitId;

#[derive(Debug, Clone)]
struct FakeBranch {
    /// Commits reachable from the tip, newest first
    history: Vec<String>,
    upstream: Option<String>,
    delay: Option<Duration>,
}

#[derive(Debug, Default)]
struct State {
    branches: BTreeMap<String, FakeBranch>,
    remote_refs: BTreeSet<String>,
    current: Option<String>,
    deleted: BTreeMap<String, String>,
    queried: Vec<String>,
    merged_list_calls: usize,
}

/// Branch graph described by explicit commit histories
#[derive(Debug, Default)]
pub struct FakeRepo {
    state: Mutex<State>,
    broken_merge_base: BTreeSet<String>,
    broken_upstream: BTreeSet<String>,
    undeletable: BTreeSet<String>,
    fail_listing: bool,
    fail_merged_list: bool,
}

fn strip(reference: &str) -> &str {
    reference.strip_prefix("refs/heads/").unwrap_or(reference)
}

impl FakeRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a branch with no upstream
    pub fn branch(self, name: &str, history: &[&str]) -> Self {
        self.insert(name, history, None)
    }

    /// Add a branch tracking `origin/<name>`, present on the remote or not
    pub fn tracking(self, name: &str, history: &[&str], remote_exists: bool) -> Self {
        let upstream = format!("refs/remotes/origin/{}", name);
        if remote_exists {
            self.lock().remote_refs.insert(upstream.clone());
        }
        self.insert(name, history, Some(upstream))
    }

    fn insert(self, name: &str, history: &[&str], upstream: Option<String>) -> Self {
        self.lock().branches.insert(
            name.to_string(),
            FakeBranch {
                history: history.iter().map(|c| c.to_string()).collect(),
                upstream,
                delay: None,
            },
        );
        self
    }

    /// Slow down every query about `name`
    pub fn delay(self, name: &str, delay: Duration) -> Self {
        if let Some(branch) = self.lock().branches.get_mut(name) {
            branch.delay = Some(delay);
        }
        self
    }

    pub fn checked_out(self, name: &str) -> Self {
        self.lock().current = Some(name.to_string());
        self
    }

    pub fn broken_merge_base(mut self, name: &str) -> Self {
        self.broken_merge_base.insert(name.to_string());
        self
    }

    pub fn broken_upstream(mut self, name: &str) -> Self {
        self.broken_upstream.insert(name.to_string());
        self
    }

    pub fn undeletable(mut self, name: &str) -> Self {
        self.undeletable.insert(name.to_string());
        self
    }

    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn failing_merged_list(mut self) -> Self {
        self.fail_merged_list = true;
        self
    }

    /// Branch names that had per-branch queries issued against them
    pub fn queried(&self) -> Vec<String> {
        self.lock().queried.clone()
    }

    /// How many times `merged_branches` was called
    pub fn merged_list_calls(&self) -> usize {
        self.lock().merged_list_calls
    }

    pub fn has_branch(&self, name: &str) -> bool {
        self.lock().branches.contains_key(name)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn visit(&self, name: &str) -> Result<FakeBranch, SanitizerError> {
        let branch = {
            let mut state = self.lock();
            state.queried.push(name.to_string());
            state.branches.get(name).cloned()
        };
        let branch = branch.ok_or_else(|| SanitizerError::RefNotFound(name.to_string()))?;
        if let Some(delay) = branch.delay {
            thread::sleep(delay);
        }
        Ok(branch)
    }
}

impl VcsGateway for FakeRepo {
    fn list_local_branches(&self) -> Result<Vec<String>, SanitizerError> {
        if self.fail_listing {
            return Err(SanitizerError::BranchListing("repository is gone".to_string()));
        }
        Ok(self.lock().branches.keys().cloned().collect())
    }

    fn resolve_upstream(&self, branch: &str) -> Result<Option<String>, SanitizerError> {
        if self.broken_upstream.contains(branch) {
            return Err(SanitizerError::GitCommand {
                command: format!("for-each-ref refs/heads/{}", branch),
                stderr: "fatal: bad config".to_string(),
            });
        }
        Ok(self.visit(branch)?.upstream)
    }

    fn ref_exists(&self, reference: &str) -> Result<bool, SanitizerError> {
        Ok(self.lock().remote_refs.contains(reference))
    }

    fn merge_base(&self, a: &str, b: &str) -> Result<Option<CommitId>, SanitizerError> {
        let (a, b) = (strip(a), strip(b));
        if self.broken_merge_base.contains(b) {
            return Err(SanitizerError::GitCommand {
                command: format!("merge-base {} {}", a, b),
                stderr: format!("fatal: bad object refs/heads/{}", b),
            });
        }
        let base = self.visit(a)?;
        let other = self.visit(b)?;
        Ok(other
            .history
            .iter()
            .find(|commit| base.history.contains(commit))
            .map(|commit| CommitId::new(commit.clone())))
    }

    fn head_commit(&self, branch: &str) -> Result<CommitId, SanitizerError> {
        let branch = self.visit(branch)?;
        branch
            .history
            .first()
            .map(|c| CommitId::new(c.clone()))
            .ok_or_else(|| SanitizerError::RefNotFound("empty history".to_string()))
    }

    fn merged_branches(&self, base: &str) -> Result<Vec<String>, SanitizerError> {
        if self.fail_merged_list {
            return Err(SanitizerError::GitCommand {
                command: format!("for-each-ref --merged={}", base),
                stderr: "fatal: malformed object name".to_string(),
            });
        }
        let base = self.visit(strip(base))?;
        let mut state = self.lock();
        state.merged_list_calls += 1;
        Ok(state
            .branches
            .iter()
            .filter(|(_, b)| b.history.first().is_some_and(|tip| base.history.contains(tip)))
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn branch_exists(&self, branch: &str) -> Result<bool, SanitizerError> {
        Ok(self.has_branch(branch))
    }

    fn current_branch(&self) -> Result<Option<String>, SanitizerError> {
        Ok(self.lock().current.clone())
    }

    fn delete_branch(&self, branch: &str, _force: bool) -> Result<(), SanitizerError> {
        if self.undeletable.contains(branch) {
            return Err(SanitizerError::DeleteFailed {
                branch: branch.to_string(),
                reason: "error: cannot lock ref".to_string(),
            });
        }
        let mut state = self.lock();
        if state.current.as_deref() == Some(branch) {
            return Err(SanitizerError::DeleteFailed {
                branch: branch.to_string(),
                reason: "branch is currently checked out".to_string(),
            });
        }
        let removed = state.branches.remove(branch).ok_or_else(|| {
            SanitizerError::DeleteFailed {
                branch: branch.to_string(),
                reason: "branch not found".to_string(),
            }
        })?;
        if let Some(tip) = removed.history.first() {
            state.deleted.insert(branch.to_string(), tip.clone());
        }
        Ok(())
    }

    fn create_branch(&self, branch: &str, at: &CommitId) -> Result<(), SanitizerError> {
        let mut state = self.lock();
        if state.branches.contains_key(branch) {
            return Err(SanitizerError::BranchExists(branch.to_string()));
        }
        state.branches.insert(
            branch.to_string(),
            FakeBranch {
                history: vec![at.to_string()],
                upstream: None,
                delay: None,
            },
        );
        Ok(())
    }

    fn reflog_last_commit(&self, branch: &str) -> Result<Option<CommitId>, SanitizerError> {
        Ok(self.lock().deleted.get(branch).map(|c| CommitId::new(c.clone())))
    }
}
