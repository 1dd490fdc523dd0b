//! Deletion journal used by `undo`
//!
//! Deleting a branch also deletes its reflog, so the tip of every deleted
//! branch is recorded here before git forgets it. The journal lives inside
//! the git directory and is never committed.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SanitizerError;
use crate::types::CommitId;

const JOURNAL_DIR: &str = "repo-sanitizer";
const JOURNAL_FILE: &str = "deleted.json";

/// One deleted branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub branch: String,
    pub commit: CommitId,
    pub deleted_at: DateTime<Utc>,
}

/// Append-only record of deleted branch tips
#[derive(Debug, Clone)]
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    /// Journal stored under `git_dir`
    pub fn in_git_dir(git_dir: &Path) -> Self {
        Self {
            path: git_dir.join(JOURNAL_DIR).join(JOURNAL_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All entries, oldest first. A missing file is an empty journal.
    pub fn entries(&self) -> Result<Vec<JournalEntry>, SanitizerError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            SanitizerError::Journal(format!("{}: {}", self.path.display(), e))
        })
    }

    pub fn record(&self, branch: &str, commit: &CommitId) -> Result<(), SanitizerError> {
        let mut entries = self.entries()?;
        entries.push(JournalEntry {
            branch: branch.to_string(),
            commit: commit.clone(),
            deleted_at: Utc::now(),
        });
        self.write(&entries)
    }

    /// Most recently recorded tip of `branch`
    pub fn latest(&self, branch: &str) -> Result<Option<JournalEntry>, SanitizerError> {
        Ok(self
            .entries()?
            .into_iter()
            .rev()
            .find(|e| e.branch == branch))
    }

    /// Drop every entry for `branch`
    pub fn forget(&self, branch: &str) -> Result<(), SanitizerError> {
        let entries = self.entries()?;
        let before = entries.len();
        let kept: Vec<JournalEntry> = entries.into_iter().filter(|e| e.branch != branch).collect();
        if kept.len() == before {
            return Ok(());
        }
        self.write(&kept)
    }

    fn write(&self, entries: &[JournalEntry]) -> Result<(), SanitizerError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| SanitizerError::Journal(e.to_string()))?;

        // Write beside the journal and rename, so readers never see a partial file
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, content)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}
