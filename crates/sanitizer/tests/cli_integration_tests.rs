//! End-to-end tests for the sanitizer binary

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn commit_file(dir: &Path, name: &str) {
    fs::write(dir.join(name), format!("{}\n", name)).expect("failed to write file");
    git(dir, &["add", name]);
    git(dir, &["commit", "-m", &format!("add {}", name)]);
}

/// Temp directory holding a working repo and an isolated config home
struct TestRepo {
    temp: tempfile::TempDir,
    work: PathBuf,
}

impl TestRepo {
    fn new() -> Self {
        let temp = tempfile::tempdir().expect("failed to create temp dir");
        let work = temp.path().join("work");
        fs::create_dir_all(&work).unwrap();
        fs::create_dir_all(temp.path().join("config-home")).unwrap();

        git(&work, &["init", "-b", "main"]);
        git(&work, &["config", "user.name", "Test User"]);
        git(&work, &["config", "user.email", "test@example.com"]);
        git(&work, &["config", "commit.gpgsign", "false"]);
        commit_file(&work, "README.md");
        Self { temp, work }
    }

    /// Add a bare remote and push main to it
    fn with_remote(self) -> Self {
        let remote = self.temp.path().join("remote.git");
        git(self.temp.path(), &["init", "--bare", remote.to_str().unwrap()]);
        git(&self.work, &["remote", "add", "origin", remote.to_str().unwrap()]);
        git(&self.work, &["push", "-u", "origin", "main"]);
        self
    }

    /// Branch at the current main tip; main then moves on
    fn merged_branch(&self, name: &str) -> String {
        git(&self.work, &["branch", name]);
        let tip = git(&self.work, &["rev-parse", name]);
        commit_file(&self.work, &format!("after-{}.txt", name));
        tip
    }

    /// Pushed branch whose remote copy is then deleted
    fn gone_branch(&self, name: &str) {
        git(&self.work, &["checkout", "-b", name]);
        commit_file(&self.work, &format!("{}.txt", name));
        git(&self.work, &["push", "-u", "origin", name]);
        git(&self.work, &["checkout", "main"]);
        git(&self.work, &["push", "origin", "--delete", name]);
    }

    fn local_branch(&self, name: &str) {
        git(&self.work, &["checkout", "-b", name]);
        commit_file(&self.work, &format!("{}.txt", name));
        git(&self.work, &["checkout", "main"]);
    }

    fn branches(&self) -> Vec<String> {
        git(&self.work, &["for-each-ref", "--format=%(refname:short)", "refs/heads/"])
            .lines()
            .map(String::from)
            .collect()
    }

    fn run(&self, args: &[&str]) -> Output {
        run_in(&self.work, self.temp.path(), args)
    }
}

fn run_in(dir: &Path, home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sanitizer"))
        .args(args)
        .current_dir(dir)
        .env("XDG_CONFIG_HOME", home.join("config-home"))
        .env("HOME", home)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run sanitizer")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn test_outside_repository_fails() {
    let temp = tempfile::tempdir().expect("failed to create temp dir");
    let output = run_in(temp.path(), temp.path(), &["clean", "--no-fetch"]);
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("E001"), "stderr: {}", stderr(&output));
}

#[test]
fn test_no_stale_branches_exits_zero() {
    let repo = TestRepo::new();
    repo.local_branch("wip");

    let output = repo.run(&["clean", "--no-fetch"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("No stale branches found"));
    assert_eq!(repo.branches(), vec!["main", "wip"]);
}

#[test]
fn test_dry_run_lists_without_deleting() {
    let repo = TestRepo::new();
    repo.merged_branch("old-feature");
    repo.local_branch("wip");

    let output = repo.run(&["clean", "--dry-run", "--no-fetch"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("DRY RUN → old-feature"), "stdout: {}", out);
    assert!(!out.contains("DRY RUN → wip"));
    assert_eq!(repo.branches(), vec!["main", "old-feature", "wip"]);
}

#[test]
fn test_dry_run_default_from_repo_config() {
    let repo = TestRepo::new();
    repo.merged_branch("old-feature");
    fs::write(repo.work.join(".repo-sanitizer.yml"), "dry_run_default: true\n").unwrap();

    let output = repo.run(&["clean", "--force", "--no-fetch"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("DRY RUN → old-feature"));
    assert!(repo.branches().contains(&"old-feature".to_string()));
}

#[test]
fn test_force_deletes_gone_and_merged_branches() {
    let repo = TestRepo::new().with_remote();
    repo.gone_branch("feature-x");
    repo.merged_branch("old-feature");
    repo.local_branch("wip");

    let output = repo.run(&["clean", "--force"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(repo.branches(), vec!["main", "wip"]);

    let journal = repo.work.join(".git").join("repo-sanitizer").join("deleted.json");
    let entries: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(journal).unwrap()).unwrap();
    assert_eq!(entries.as_array().unwrap().len(), 2);
}

#[test]
fn test_undo_restores_deleted_branch() {
    let repo = TestRepo::new();
    let tip = repo.merged_branch("old-feature");

    let output = repo.run(&["clean", "--force", "--no-fetch"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(!repo.branches().contains(&"old-feature".to_string()));

    let output = repo.run(&["undo", "old-feature"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Restored old-feature"));
    assert_eq!(git(&repo.work, &["rev-parse", "old-feature"]), tip);

    // a second undo refuses to overwrite the restored branch
    let output = repo.run(&["undo", "old-feature"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("E022"));
}

#[test]
fn test_undo_unknown_branch_fails() {
    let repo = TestRepo::new();
    let output = repo.run(&["undo", "never-existed"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("E021"));
}

#[test]
fn test_json_dry_run_report() {
    let repo = TestRepo::new();
    repo.merged_branch("old-feature");

    let output = repo.run(&["--json", "clean", "--dry-run", "--no-fetch"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["command"], "clean");
    assert_eq!(value["status"], "ok");
    assert_eq!(value["data"]["base_branch"], "main");
    assert_eq!(value["data"]["dry_run"], true);

    let branches = value["data"]["branches"].as_array().unwrap();
    assert_eq!(branches.len(), 2);
    assert_eq!(branches[0]["name"], "main");
    assert_eq!(branches[0]["verdict"]["reason"], "protected-skip");
    assert_eq!(branches[1]["name"], "old-feature");
    assert_eq!(branches[1]["verdict"]["reason"], "merged-into-base");
}

#[test]
fn test_malformed_config_exit_code() {
    let repo = TestRepo::new();
    let config = repo.temp.path().join("broken.yml");
    fs::write(&config, "protected_branches: {nope").unwrap();

    let output = repo.run(&["--config", config.to_str().unwrap(), "clean", "--no-fetch"]);
    assert_eq!(output.status.code(), Some(4));
    assert!(stderr(&output).contains("E041"));
}

#[test]
fn test_menu_without_terminal_does_not_hang() {
    let repo = TestRepo::new();
    repo.merged_branch("old-feature");

    let output = repo.run(&["clean", "--no-fetch"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("not a terminal"));
    assert!(repo.branches().contains(&"old-feature".to_string()));
}

#[test]
fn test_json_prompt_failure_reports_envelope() {
    let repo = TestRepo::new();
    repo.merged_branch("old-feature");

    let output = repo.run(&["--json", "clean", "--no-fetch"]);
    assert_eq!(output.status.code(), Some(1));
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["command"], "clean");
    assert_eq!(value["status"], "error");
    assert_eq!(value["issues"][0]["code"], "E050");
    assert!(repo.branches().contains(&"old-feature".to_string()));
}

#[test]
fn test_json_report_has_no_failed_entries() {
    let repo = TestRepo::new();
    repo.merged_branch("old-feature");
    repo.local_branch("wip");

    let output = repo.run(&["--json", "clean", "--dry-run", "--no-fetch"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    for entry in value["data"]["branches"].as_array().unwrap() {
        assert_eq!(entry["status"], "classified", "entry: {}", entry);
    }
    assert!(value["issues"].as_array().unwrap().is_empty());
}

#[test]
fn test_no_subcommand_prints_version() {
    let temp = tempfile::tempdir().expect("failed to create temp dir");
    let output = run_in(temp.path(), temp.path(), &[]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("sanitizer v"));
}
