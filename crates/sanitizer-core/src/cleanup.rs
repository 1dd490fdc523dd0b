//! Branch deletion and restoration

use serde::Serialize;
use tracing::{info, warn};

use crate::error::SanitizerError;
use crate::git::VcsGateway;
use crate::journal::Journal;
use crate::types::CommitId;

/// Result of deleting one branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionOutcome {
    pub branch: String,
    /// Tip the branch pointed to before deletion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<CommitId>,
    pub deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Delete each named branch, recording its tip in the journal
///
/// A failure on one branch does not stop the others.
pub fn delete_branches<G: VcsGateway + ?Sized>(
    gateway: &G,
    journal: Option<&Journal>,
    names: &[String],
    force: bool,
) -> Vec<DeletionOutcome> {
    names
        .iter()
        .map(|name| delete_one(gateway, journal, name, force))
        .collect()
}

fn delete_one<G: VcsGateway + ?Sized>(
    gateway: &G,
    journal: Option<&Journal>,
    name: &str,
    force: bool,
) -> DeletionOutcome {
    let commit = gateway.head_commit(name).ok();

    if let Err(e) = gateway.delete_branch(name, force) {
        warn!(branch = name, error = %e, "delete failed");
        return DeletionOutcome {
            branch: name.to_string(),
            commit,
            deleted: false,
            error: Some(e.to_string()),
        };
    }

    info!(branch = name, "deleted branch");
    if let (Some(journal), Some(commit)) = (journal, commit.as_ref()) {
        if let Err(e) = journal.record(name, commit) {
            warn!(branch = name, error = %e, "could not record deletion in journal");
        }
    }

    DeletionOutcome {
        branch: name.to_string(),
        commit,
        deleted: true,
        error: None,
    }
}

/// Where a restored commit was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestoreSource {
    Journal,
    Reflog,
}

/// A branch brought back by `restore_branch`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreOutcome {
    pub branch: String,
    pub commit: CommitId,
    pub source: RestoreSource,
}

/// Recreate a deleted branch at its last known tip
///
/// The journal is consulted first, then the reflog. Refuses to overwrite an
/// existing branch. A journal that cannot be read is treated as empty.
pub fn restore_branch<G: VcsGateway + ?Sized>(
    gateway: &G,
    journal: Option<&Journal>,
    name: &str,
) -> Result<RestoreOutcome, SanitizerError> {
    if gateway.branch_exists(name)? {
        return Err(SanitizerError::BranchExists(name.to_string()));
    }

    // An unreadable journal must not block the reflog fallback
    let recorded = match journal.map(|j| j.latest(name)) {
        Some(Ok(entry)) => entry.map(|e| e.commit),
        Some(Err(e)) => {
            warn!(branch = name, error = %e, "journal unreadable, falling back to reflog");
            None
        }
        None => None,
    };
    let (commit, source) = match recorded {
        Some(commit) => (commit, RestoreSource::Journal),
        None => match gateway.reflog_last_commit(name)? {
            Some(commit) => (commit, RestoreSource::Reflog),
            None => return Err(SanitizerError::NothingToRestore(name.to_string())),
        },
    };

    gateway.create_branch(name, &commit)?;
    info!(branch = name, commit = %commit, "restored branch");

    if let Some(journal) = journal {
        if let Err(e) = journal.forget(name) {
            warn!(branch = name, error = %e, "could not update journal");
        }
    }

    Ok(RestoreOutcome {
        branch: name.to_string(),
        commit,
        source,
    })
}
