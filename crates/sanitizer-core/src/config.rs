//! Configuration handling for repo-sanitizer
//!
//! Configuration is YAML. Every field has a built-in default, so a file only
//! needs to name the settings it changes.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classify::MergeStrategy;
use crate::error::SanitizerError;
use crate::git::DEFAULT_GIT_TIMEOUT_SECS;
use crate::types::ProtectedSet;

/// Repository-local configuration file name
pub const REPO_CONFIG_FILE: &str = ".repo-sanitizer.yml";

/// Configuration file name inside the user config directory
const USER_CONFIG_DIR: &str = "repo-sanitizer";
const USER_CONFIG_FILE: &str = "config.yml";

/// repo-sanitizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Branches never classified stale; the first existing one is the base branch
    #[serde(default = "default_protected_branches")]
    pub protected_branches: Vec<String>,

    /// Select every stale branch without showing the menu
    #[serde(default)]
    pub auto_confirm: bool,

    /// Report stale branches without deleting them
    #[serde(default)]
    pub dry_run_default: bool,

    /// Where log records are written
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub ai: AiConfig,
}

/// Scan tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Worker threads for branch evaluation (available parallelism when unset)
    #[serde(default)]
    pub workers: Option<usize>,

    /// Deadline for each git query
    #[serde(default = "default_git_timeout_secs")]
    pub git_timeout_secs: u64,

    /// How merge state is determined
    #[serde(default)]
    pub merge_strategy: MergeStrategy,
}

/// Local LLM service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_ai_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_ai_model")]
    pub model: String,

    #[serde(default = "default_ai_timeout_secs")]
    pub timeout_secs: u64,

    /// Context window passed to the model
    #[serde(default = "default_num_ctx")]
    pub num_ctx: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_protected_branches() -> Vec<String> {
    ["main", "master", "dev", "develop"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_log_file() -> PathBuf {
    PathBuf::from("repo-sanitizer.log")
}

fn default_git_timeout_secs() -> u64 {
    DEFAULT_GIT_TIMEOUT_SECS
}

fn default_ai_endpoint() -> String {
    "http://localhost:11434/api/chat".to_string()
}

fn default_ai_model() -> String {
    "llama3.2".to_string()
}

fn default_ai_timeout_secs() -> u64 {
    120
}

fn default_num_ctx() -> u32 {
    2048
}

fn default_temperature() -> f32 {
    0.2
}

impl Default for Config {
    fn default() -> Self {
        Self {
            protected_branches: default_protected_branches(),
            auto_confirm: false,
            dry_run_default: false,
            log_file: default_log_file(),
            scan: ScanConfig::default(),
            ai: AiConfig::default(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: None,
            git_timeout_secs: default_git_timeout_secs(),
            merge_strategy: MergeStrategy::default(),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_ai_endpoint(),
            model: default_ai_model(),
            timeout_secs: default_ai_timeout_secs(),
            num_ctx: default_num_ctx(),
            temperature: default_temperature(),
        }
    }
}

impl Config {
    /// Parse YAML, filling unspecified fields with defaults
    pub fn from_yaml(content: &str) -> Result<Self, SanitizerError> {
        // An empty file parses as null rather than an empty mapping
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| SanitizerError::Config(e.to_string()))
    }

    /// Read a configuration file
    pub fn from_file(path: &Path) -> Result<Self, SanitizerError> {
        let content = fs::read_to_string(path).map_err(|e| {
            SanitizerError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content).map_err(|e| match e {
            SanitizerError::Config(msg) => {
                SanitizerError::Config(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Load configuration for a repository
    ///
    /// An explicit path must exist. Otherwise the repository file wins over
    /// the user file, and built-in defaults apply when neither exists.
    pub fn load(explicit: Option<&Path>, repo_root: Option<&Path>) -> Result<Self, SanitizerError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let candidates = repo_root
            .map(|root| root.join(REPO_CONFIG_FILE))
            .into_iter()
            .chain(user_config_path());

        for candidate in candidates {
            if candidate.is_file() {
                tracing::debug!(path = %candidate.display(), "loading configuration");
                return Self::from_file(&candidate);
            }
        }

        Ok(Self::default())
    }

    /// Immutable protected set for a scan
    pub fn protected_set(&self) -> ProtectedSet {
        ProtectedSet::new(self.protected_branches.iter().cloned())
    }

    /// Log file path, relative paths resolved against `base`
    pub fn log_path(&self, base: &Path) -> PathBuf {
        if self.log_file.is_absolute() {
            self.log_file.clone()
        } else {
            base.join(&self.log_file)
        }
    }
}

/// `<user config dir>/repo-sanitizer/config.yml`, if a config dir is known
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(USER_CONFIG_DIR).join(USER_CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(
            config.protected_branches,
            vec!["main", "master", "dev", "develop"]
        );
        assert!(!config.auto_confirm);
        assert!(!config.dry_run_default);
        assert_eq!(config.log_file, PathBuf::from("repo-sanitizer.log"));
        assert_eq!(config.scan.git_timeout_secs, 30);
        assert_eq!(config.scan.merge_strategy, MergeStrategy::Ancestor);
        assert_eq!(config.ai.model, "llama3.2");
        assert_eq!(config.ai.num_ctx, 2048);
    }

    #[test]
    fn test_partial_yaml_merges_over_defaults() {
        let yaml = "protected_branches: [trunk, release]\nauto_confirm: true\n";
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.protected_branches, vec!["trunk", "release"]);
        assert!(config.auto_confirm);
        assert!(!config.dry_run_default);
        assert_eq!(config.log_file, PathBuf::from("repo-sanitizer.log"));
        assert_eq!(config.ai.endpoint, "http://localhost:11434/api/chat");
    }

    #[test]
    fn test_nested_sections() {
        let yaml = r#"
scan:
  workers: 3
  merge_strategy: merged-list
ai:
  model: qwen2.5
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.scan.workers, Some(3));
        assert_eq!(config.scan.merge_strategy, MergeStrategy::MergedList);
        assert_eq!(config.scan.git_timeout_secs, 30);
        assert_eq!(config.ai.model, "qwen2.5");
        assert_eq!(config.ai.timeout_secs, 120);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = Config::from_yaml("   \n").unwrap();
        assert_eq!(config.protected_branches.len(), 4);
    }

    #[test]
    fn test_malformed_yaml_is_config_error() {
        let err = Config::from_yaml("protected_branches: {nope").unwrap_err();
        assert!(matches!(err, SanitizerError::Config(_)));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_load_prefers_repo_file() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join(REPO_CONFIG_FILE), "dry_run_default: true\n").unwrap();
        let config = Config::load(None, Some(temp.path())).unwrap();
        assert!(config.dry_run_default);
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let temp = tempfile::tempdir().unwrap();
        let missing = temp.path().join("nope.yml");
        assert!(matches!(
            Config::load(Some(&missing), None),
            Err(SanitizerError::Config(_))
        ));
    }

    #[test]
    fn test_log_path_resolution() {
        let config = Config::default();
        let base = Path::new("/repo");
        assert_eq!(config.log_path(base), PathBuf::from("/repo/repo-sanitizer.log"));
    }

    #[test]
    fn test_protected_set_from_config() {
        let config = Config::from_yaml("protected_branches: [main, dev]").unwrap();
        let set = config.protected_set();
        assert!(set.contains("dev"));
        assert!(!set.contains("master"));
    }
}
