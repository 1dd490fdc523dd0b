//! sanitizer CLI - find and delete stale local git branches

mod cli;
mod colors;
mod commands;
mod interaction;
mod logging;
mod output;

use std::process::ExitCode;

use cli::Commands;
use commands::{CleanOptions, GlobalOptions};

fn main() -> ExitCode {
    let cli = cli::parse();
    let global = GlobalOptions {
        verbose: cli.verbose,
        quiet: cli.quiet,
        json: cli.json,
        config: cli.config,
    };

    let result = match cli.command {
        Some(Commands::Clean {
            dry_run,
            all,
            force,
            explain,
            no_fetch,
        }) => commands::run_clean(
            CleanOptions {
                dry_run,
                all,
                force,
                explain,
                no_fetch,
            },
            &global,
        ),
        Some(Commands::Undo { branch }) => commands::run_undo(branch, &global),
        Some(Commands::Push { auto }) => commands::run_push(auto, &global),
        Some(Commands::Review { staged }) => commands::run_review(staged, &global),
        Some(Commands::History { count }) => commands::run_history(count, &global),
        None => {
            // No subcommand - print version info
            if !global.quiet {
                println!("sanitizer v{}", env!("CARGO_PKG_VERSION"));
                println!("Use --help for usage information");
            }
            Ok(0)
        }
    };

    match result {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(1)
        }
    }
}
