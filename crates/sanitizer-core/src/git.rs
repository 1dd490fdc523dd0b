//! Git access for branch scanning and cleanup
//!
//! `VcsGateway` is the narrow contract the classifier, scanner and cleanup
//! code depend on. `GitCli` implements it by running the `git` executable,
//! one subprocess per query, each under a deadline.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use crate::error::SanitizerError;
use crate::types::CommitId;

/// Default deadline for a single read-only git query
pub const DEFAULT_GIT_TIMEOUT_SECS: u64 = 30;

/// Deadline for commands that talk to a remote
const NETWORK_TIMEOUT_SECS: u64 = 120;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

const HEADS_PREFIX: &str = "refs/heads/";

/// Fully qualified ref for a local branch name
pub fn local_ref(branch: &str) -> String {
    format!("{}{}", HEADS_PREFIX, branch)
}

/// Operations the stale-branch core needs from version control
///
/// Implementations must be safe to query from several threads at once.
pub trait VcsGateway: Sync {
    /// Local branch names, in refname order, at call time
    fn list_local_branches(&self) -> Result<Vec<String>, SanitizerError>;

    /// Full name of the configured upstream ref, or None if no tracking is set
    fn resolve_upstream(&self, branch: &str) -> Result<Option<String>, SanitizerError>;

    /// Whether `reference` resolves to a commit. A removed ref is `Ok(false)`.
    fn ref_exists(&self, reference: &str) -> Result<bool, SanitizerError>;

    /// Best common ancestor of two refs, or None for unrelated histories
    fn merge_base(&self, a: &str, b: &str) -> Result<Option<CommitId>, SanitizerError>;

    /// Commit a local branch points to
    fn head_commit(&self, branch: &str) -> Result<CommitId, SanitizerError>;

    /// Local branches whose tips are reachable from `base`
    fn merged_branches(&self, base: &str) -> Result<Vec<String>, SanitizerError>;

    /// Whether a local branch with this name exists
    fn branch_exists(&self, branch: &str) -> Result<bool, SanitizerError>;

    /// Checked-out branch, or None when HEAD is detached
    fn current_branch(&self) -> Result<Option<String>, SanitizerError>;

    /// Delete a local branch (`-D` when `force`, `-d` otherwise)
    fn delete_branch(&self, branch: &str, force: bool) -> Result<(), SanitizerError>;

    /// Create a local branch pointing at `at`
    fn create_branch(&self, branch: &str, at: &CommitId) -> Result<(), SanitizerError>;

    /// Last commit a (possibly deleted) branch is known to have pointed to
    fn reflog_last_commit(&self, branch: &str) -> Result<Option<CommitId>, SanitizerError>;
}

/// Raw result of a git invocation
#[derive(Debug)]
struct GitOutput {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

impl GitOutput {
    fn exit_code(&self) -> Option<i32> {
        self.status.code()
    }
}

/// Metadata about a branch tip, used for explanations
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchMetadata {
    pub last_commit_message: String,
    pub last_commit_date: String,
    pub commit_count: u64,
}

/// One entry of `git log` output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    pub hash: String,
    pub author: String,
    pub message: String,
}

/// Git CLI wrapper rooted at a repository working tree
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_root: PathBuf,
    git_dir: PathBuf,
    timeout: Duration,
}

impl GitCli {
    /// Locate the repository containing `path`
    pub fn discover(path: &Path) -> Result<Self, SanitizerError> {
        Self::discover_with_timeout(path, Duration::from_secs(DEFAULT_GIT_TIMEOUT_SECS))
    }

    pub fn discover_with_timeout(path: &Path, timeout: Duration) -> Result<Self, SanitizerError> {
        let locator = Self {
            repo_root: path.to_path_buf(),
            git_dir: path.to_path_buf(),
            timeout,
        };

        let output = locator.run(&["rev-parse", "--show-toplevel", "--absolute-git-dir"])?;
        if !output.status.success() {
            return Err(SanitizerError::NotAGitRepository {
                path: path.display().to_string(),
            });
        }

        let mut lines = output.stdout.lines();
        let (Some(root), Some(git_dir)) = (lines.next(), lines.next()) else {
            return Err(SanitizerError::NotAGitRepository {
                path: path.display().to_string(),
            });
        };

        Ok(Self {
            repo_root: PathBuf::from(root.trim()),
            git_dir: PathBuf::from(git_dir.trim()),
            timeout,
        })
    }

    /// Replace the per-query deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// Run git with the default deadline
    fn run(&self, args: &[&str]) -> Result<GitOutput, SanitizerError> {
        self.run_with_timeout(args, self.timeout)
    }

    /// Run git, killing it if it outlives `timeout`
    ///
    /// stdout and stderr are drained on their own threads so a chatty command
    /// cannot block on a full pipe while we poll for exit.
    fn run_with_timeout(
        &self,
        args: &[&str],
        timeout: Duration,
    ) -> Result<GitOutput, SanitizerError> {
        let command_name = args.join(" ");
        debug!(command = %command_name, "running git");

        let mut child = Command::new("git")
            .arg("-C")
            .arg(&self.repo_root)
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    SanitizerError::GitUnavailable(e.to_string())
                } else {
                    SanitizerError::Io(e)
                }
            })?;

        let stdout_reader = drain(child.stdout.take());
        let stderr_reader = drain(child.stderr.take());

        let start = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if start.elapsed() >= timeout {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(SanitizerError::GitTimeout {
                            command: command_name,
                            secs: timeout.as_secs(),
                        });
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    let _ = child.kill();
                    return Err(SanitizerError::Io(e));
                }
            }
        };

        let stdout = stdout_reader.join().unwrap_or_default();
        let stderr = stderr_reader.join().unwrap_or_default();

        Ok(GitOutput {
            status,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
        })
    }

    /// Run git and require a zero exit status, returning trimmed stdout
    fn run_ok(&self, args: &[&str]) -> Result<String, SanitizerError> {
        let output = self.run(args)?;
        if !output.status.success() {
            return Err(SanitizerError::GitCommand {
                command: args.join(" "),
                stderr: output.stderr,
            });
        }
        Ok(output.stdout.trim_end().to_string())
    }

    /// Whether any remote is configured
    pub fn has_remotes(&self) -> Result<bool, SanitizerError> {
        Ok(!self.run_ok(&["remote"])?.trim().is_empty())
    }

    /// Fetch all remotes and drop remote-tracking refs that no longer exist
    pub fn fetch_prune(&self) -> Result<(), SanitizerError> {
        let timeout = self.timeout.max(Duration::from_secs(NETWORK_TIMEOUT_SECS));
        let output = self.run_with_timeout(&["fetch", "--all", "--prune", "--quiet"], timeout)?;
        if !output.status.success() {
            return Err(SanitizerError::GitCommand {
                command: "fetch --all --prune".to_string(),
                stderr: output.stderr,
            });
        }
        Ok(())
    }

    /// Last commit message, date and commit count for a branch
    pub fn branch_metadata(&self, branch: &str) -> Result<BranchMetadata, SanitizerError> {
        let reference = local_ref(branch);
        let log = self.run_ok(&["log", "-1", "--format=%s%x1f%cI", &reference])?;
        let (message, date) = log.split_once('\u{1f}').unwrap_or((log.as_str(), ""));

        let count = self.run_ok(&["rev-list", "--count", &reference])?;
        let commit_count = count.trim().parse::<u64>().map_err(|e| SanitizerError::GitCommand {
            command: format!("rev-list --count {}", reference),
            stderr: format!("unexpected output {:?}: {}", count, e),
        })?;

        Ok(BranchMetadata {
            last_commit_message: message.trim().to_string(),
            last_commit_date: date.trim().to_string(),
            commit_count,
        })
    }

    /// Stage every change in the working tree, including untracked files
    pub fn stage_all(&self) -> Result<(), SanitizerError> {
        self.run_ok(&["add", "-A"]).map(|_| ())
    }

    /// Diff of the index against HEAD
    pub fn staged_diff(&self) -> Result<String, SanitizerError> {
        self.run_ok(&["diff", "--cached"])
    }

    /// Diff of the working tree against HEAD
    pub fn working_diff(&self) -> Result<String, SanitizerError> {
        self.run_ok(&["diff", "HEAD"])
    }

    pub fn commit(&self, message: &str) -> Result<(), SanitizerError> {
        self.run_ok(&["commit", "-m", message]).map(|_| ())
    }

    /// Push the current branch, setting `origin` as upstream when none is configured
    pub fn push_current(&self) -> Result<(), SanitizerError> {
        let branch = self
            .current_branch()?
            .ok_or_else(|| SanitizerError::RefNotFound("HEAD is detached".to_string()))?;
        let timeout = self.timeout.max(Duration::from_secs(NETWORK_TIMEOUT_SECS));

        let args: Vec<&str> = if self.resolve_upstream(&branch)?.is_some() {
            vec!["push"]
        } else {
            vec!["push", "--set-upstream", "origin", branch.as_str()]
        };

        let output = self.run_with_timeout(&args, timeout)?;
        if !output.status.success() {
            return Err(SanitizerError::GitCommand {
                command: args.join(" "),
                stderr: output.stderr,
            });
        }
        Ok(())
    }

    /// Most recent `count` commits reachable from HEAD
    pub fn recent_commits(&self, count: usize) -> Result<Vec<CommitSummary>, SanitizerError> {
        let limit = format!("-n{}", count);
        let log = self.run_ok(&["log", &limit, "--format=%h%x1f%an%x1f%s"])?;
        Ok(log
            .lines()
            .filter_map(|line| {
                let mut parts = line.splitn(3, '\u{1f}');
                Some(CommitSummary {
                    hash: parts.next()?.to_string(),
                    author: parts.next()?.to_string(),
                    message: parts.next()?.to_string(),
                })
            })
            .collect())
    }

    /// Reflog entries of HEAD as (commit, subject), newest first
    fn head_reflog(&self) -> Result<Vec<(String, String)>, SanitizerError> {
        let output = self.run(&["reflog", "show", "--format=%H%x09%gs", "HEAD"])?;
        if !output.status.success() {
            // A fresh repository has no HEAD reflog yet
            return Ok(Vec::new());
        }
        Ok(output
            .stdout
            .lines()
            .filter_map(|line| {
                let (hash, subject) = line.split_once('\t')?;
                Some((hash.to_string(), subject.to_string()))
            })
            .collect())
    }
}

fn drain<R: Read + Send + 'static>(source: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut source) = source {
            let _ = source.read_to_end(&mut buf);
        }
        buf
    })
}

impl VcsGateway for GitCli {
    fn list_local_branches(&self) -> Result<Vec<String>, SanitizerError> {
        let output = self
            .run_ok(&["for-each-ref", "--format=%(refname)", HEADS_PREFIX])
            .map_err(|e| SanitizerError::BranchListing(e.to_string()))?;

        Ok(output
            .lines()
            .filter_map(|line| line.trim().strip_prefix(HEADS_PREFIX))
            .map(str::to_string)
            .collect())
    }

    fn resolve_upstream(&self, branch: &str) -> Result<Option<String>, SanitizerError> {
        let reference = local_ref(branch);
        // The pattern also matches refs nested below this name, so pick the exact line
        let args = [
            "for-each-ref",
            "--format=%(refname)%09%(upstream)",
            reference.as_str(),
        ];
        let output = self.run(&args)?;
        if !output.status.success() {
            return Err(SanitizerError::GitCommand {
                command: args.join(" "),
                stderr: output.stderr,
            });
        }

        // An empty upstream leaves a trailing tab, so lines are not trimmed
        for line in output.stdout.lines() {
            if let Some((name, upstream)) = line.split_once('\t') {
                if name == reference {
                    let upstream = upstream.trim();
                    return Ok((!upstream.is_empty()).then(|| upstream.to_string()));
                }
            }
        }

        Err(SanitizerError::RefNotFound(reference))
    }

    fn ref_exists(&self, reference: &str) -> Result<bool, SanitizerError> {
        let spec = format!("{}^{{commit}}", reference);
        let output = self.run(&["rev-parse", "--verify", "--quiet", &spec])?;
        match output.exit_code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(SanitizerError::GitCommand {
                command: format!("rev-parse --verify {}", spec),
                stderr: output.stderr,
            }),
        }
    }

    fn merge_base(&self, a: &str, b: &str) -> Result<Option<CommitId>, SanitizerError> {
        let output = self.run(&["merge-base", a, b])?;
        match output.exit_code() {
            Some(0) => Ok(Some(CommitId::new(output.stdout.trim()))),
            // Exit 1 without diagnostics means the histories share no commit
            Some(1) if output.stderr.is_empty() => Ok(None),
            _ => Err(SanitizerError::GitCommand {
                command: format!("merge-base {} {}", a, b),
                stderr: output.stderr,
            }),
        }
    }

    fn head_commit(&self, branch: &str) -> Result<CommitId, SanitizerError> {
        let spec = format!("{}^{{commit}}", local_ref(branch));
        let output = self.run(&["rev-parse", "--verify", "--quiet", &spec])?;
        if !output.status.success() {
            return Err(SanitizerError::RefNotFound(local_ref(branch)));
        }
        Ok(CommitId::new(output.stdout.trim()))
    }

    fn merged_branches(&self, base: &str) -> Result<Vec<String>, SanitizerError> {
        let merged = format!("--merged={}", base);
        let output = self.run_ok(&["for-each-ref", &merged, "--format=%(refname)", HEADS_PREFIX])?;
        Ok(output
            .lines()
            .filter_map(|line| line.trim().strip_prefix(HEADS_PREFIX))
            .map(str::to_string)
            .collect())
    }

    fn branch_exists(&self, branch: &str) -> Result<bool, SanitizerError> {
        let output = self.run(&["show-ref", "--verify", "--quiet", &local_ref(branch)])?;
        Ok(output.status.success())
    }

    fn current_branch(&self) -> Result<Option<String>, SanitizerError> {
        let output = self.run(&["symbolic-ref", "--quiet", "--short", "HEAD"])?;
        if !output.status.success() {
            return Ok(None);
        }
        Ok(Some(output.stdout.trim().to_string()))
    }

    fn delete_branch(&self, branch: &str, force: bool) -> Result<(), SanitizerError> {
        if self.current_branch()?.as_deref() == Some(branch) {
            return Err(SanitizerError::DeleteFailed {
                branch: branch.to_string(),
                reason: "branch is currently checked out".to_string(),
            });
        }

        let flag = if force { "-D" } else { "-d" };
        let output = self.run(&["branch", flag, branch])?;
        if !output.status.success() {
            return Err(SanitizerError::DeleteFailed {
                branch: branch.to_string(),
                reason: output.stderr,
            });
        }
        Ok(())
    }

    fn create_branch(&self, branch: &str, at: &CommitId) -> Result<(), SanitizerError> {
        self.run_ok(&["branch", branch, at.as_str()]).map(|_| ())
    }

    fn reflog_last_commit(&self, branch: &str) -> Result<Option<CommitId>, SanitizerError> {
        // The branch's own reflog survives only while the branch exists
        let reference = local_ref(branch);
        let output = self.run(&["reflog", "show", "--format=%H", "-n", "1", &reference])?;
        if output.status.success() {
            if let Some(hash) = output.stdout.lines().next().filter(|l| !l.trim().is_empty()) {
                return Ok(Some(CommitId::new(hash.trim())));
            }
        }

        // Otherwise look for the last time HEAD left the branch; the entry
        // just below it records where the branch pointed at that moment.
        let leaving = format!("checkout: moving from {} to ", branch);
        let entries = self.head_reflog()?;
        for (i, (_, subject)) in entries.iter().enumerate() {
            if subject.starts_with(&leaving) {
                if let Some((hash, _)) = entries.get(i + 1) {
                    return Ok(Some(CommitId::new(hash.clone())));
                }
            }
        }

        Ok(None)
    }
}
