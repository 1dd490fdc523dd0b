//! CLI argument parsing with clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// sanitizer - find and delete stale local git branches
#[derive(Parser)]
#[command(name = "sanitizer")]
#[command(version = VERSION)]
#[command(about = "Find and delete stale local git branches")]
#[command(long_about = "sanitizer finds local branches whose upstream is gone or whose history is already merged into the base branch, and offers to delete them.\n\nProtected branches (main, master, dev, develop by default) are never touched. The first protected branch that exists locally is the base branch for merge checks.\n\nOptional helpers use a local Ollama model to explain stale branches, write commit messages, review diffs and summarize history.")]
pub struct Cli {
    /// Increase output verbosity (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .repo-sanitizer.yml, then the user config)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Find stale branches and delete the ones you pick
    ///
    /// Fetches with --prune, classifies every local branch, then asks which
    /// stale branches to delete.
    #[command(long_about = "Find stale branches and delete the ones you pick.\n\nA branch is stale when:\n  - its upstream tracking branch no longer exists, or\n  - its history is fully merged into the base branch\n\nDeleted branch tips are recorded so `sanitizer undo <branch>` can bring them back.")]
    Clean {
        /// Report stale branches without deleting anything
        #[arg(long)]
        dry_run: bool,

        /// Select every stale branch, then ask once for confirmation
        #[arg(long)]
        all: bool,

        /// Delete every stale branch without asking
        #[arg(short, long)]
        force: bool,

        /// Ask the local model to explain each stale branch
        #[arg(long)]
        explain: bool,

        /// Skip `git fetch --prune` before scanning
        #[arg(long)]
        no_fetch: bool,
    },

    /// Restore a deleted branch at its last known commit
    Undo {
        /// Branch to restore
        branch: String,
    },

    /// Stage everything, commit with a generated message and push
    Push {
        /// Commit and push without confirming the message
        #[arg(long)]
        auto: bool,
    },

    /// Review uncommitted changes with the local model
    Review {
        /// Review only staged changes
        #[arg(long)]
        staged: bool,
    },

    /// Summarize recent commits with the local model
    History {
        /// Number of commits to summarize
        #[arg(short = 'n', long = "count", default_value_t = 10)]
        count: usize,
    },
}

/// Get the command args for use in the application
pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_clean_flags() {
        let cli = Cli::try_parse_from(["sanitizer", "clean", "--dry-run", "-f", "--no-fetch"])
            .unwrap();
        match cli.command {
            Some(Commands::Clean {
                dry_run,
                force,
                no_fetch,
                all,
                explain,
            }) => {
                assert!(dry_run && force && no_fetch);
                assert!(!all && !explain);
            }
            _ => panic!("expected clean"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["sanitizer", "undo", "topic", "--json", "--config", "x.yml"])
            .unwrap();
        assert!(cli.json);
        assert_eq!(cli.config, Some(PathBuf::from("x.yml")));
        assert!(matches!(cli.command, Some(Commands::Undo { ref branch }) if branch == "topic"));
    }

    #[test]
    fn test_history_default_count() {
        let cli = Cli::try_parse_from(["sanitizer", "history"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::History { count: 10 })));
    }
}
