//! CLI interaction module
//!
//! Provides `CliAdapter`, the terminal implementation of `InteractionAdapter`.

mod cli_adapter;

pub use cli_adapter::CliAdapter;
