//! Terminal implementation of `InteractionAdapter`
//!
//! Prompts use dialoguer, spinners use indicatif. Every prompt refuses to run
//! without a terminal on stdin and honours Ctrl+C.

use std::collections::HashMap;
use std::fmt::Write as FmtWrite;
use std::io::{IsTerminal, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use console::Style;
use dialoguer::theme::Theme;
use dialoguer::{Confirm, MultiSelect};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

use sanitizer_core::interaction::{
    InteractionAdapter, InteractionError, InteractionResult, ProgressHandle,
};

use crate::colors::COLORS;

/// Set once Ctrl+C is pressed
static CANCELLED: AtomicBool = AtomicBool::new(false);

fn is_cancelled() -> bool {
    CANCELLED.load(Ordering::SeqCst)
}

/// Install the Ctrl+C handler (once per process)
pub fn setup_ctrl_c_handler() {
    static HANDLER_SET: AtomicBool = AtomicBool::new(false);

    if HANDLER_SET.swap(true, Ordering::SeqCst) {
        return;
    }

    if let Err(e) = ctrlc::set_handler(move || {
        CANCELLED.store(true, Ordering::SeqCst);
        eprintln!();
    }) {
        tracing::warn!(error = %e, "could not install Ctrl+C handler");
    }
}

/// Prompt theme: `?` prefix, checkbox list for branch selection
struct BranchTheme {
    prompt_style: Style,
    active_style: Style,
    hint_style: Style,
}

impl BranchTheme {
    fn new() -> Self {
        Self {
            prompt_style: Style::new().cyan().bold(),
            active_style: Style::new().cyan(),
            hint_style: Style::new().dim(),
        }
    }

    fn prompt(&self, prompt: &str) -> String {
        self.prompt_style.apply_to(format!("? {}", prompt)).to_string()
    }
}

impl Theme for BranchTheme {
    fn format_prompt(&self, f: &mut dyn FmtWrite, prompt: &str) -> std::fmt::Result {
        write!(f, "{}", self.prompt(prompt))
    }

    fn format_confirm_prompt(
        &self,
        f: &mut dyn FmtWrite,
        prompt: &str,
        default: Option<bool>,
    ) -> std::fmt::Result {
        let hint = match default {
            Some(true) => "(Y/n)",
            Some(false) => "(y/N)",
            None => "(y/n)",
        };
        write!(f, "{} {}", self.prompt(prompt), self.hint_style.apply_to(hint))
    }

    fn format_confirm_prompt_selection(
        &self,
        f: &mut dyn FmtWrite,
        prompt: &str,
        selection: Option<bool>,
    ) -> std::fmt::Result {
        let answer = match selection {
            Some(true) => "yes",
            Some(false) => "no",
            None => "?",
        };
        write!(f, "{} {}", self.prompt(prompt), self.active_style.apply_to(answer))
    }

    fn format_multi_select_prompt(&self, f: &mut dyn FmtWrite, prompt: &str) -> std::fmt::Result {
        write!(
            f,
            "{} {}",
            self.prompt(prompt),
            self.hint_style.apply_to("(space to toggle, enter to confirm)")
        )
    }

    fn format_multi_select_prompt_selection(
        &self,
        f: &mut dyn FmtWrite,
        prompt: &str,
        selections: &[&str],
    ) -> std::fmt::Result {
        let summary = if selections.is_empty() {
            "none".to_string()
        } else {
            format!("{} selected", selections.len())
        };
        write!(f, "{} {}", self.prompt(prompt), self.active_style.apply_to(summary))
    }

    fn format_multi_select_prompt_item(
        &self,
        f: &mut dyn FmtWrite,
        text: &str,
        checked: bool,
        active: bool,
    ) -> std::fmt::Result {
        let checkbox = if checked { "[x]" } else { "[ ]" };
        if active {
            write!(
                f,
                "{} {} {}",
                self.active_style.apply_to(">"),
                self.active_style.apply_to(checkbox),
                self.active_style.apply_to(text)
            )
        } else {
            write!(f, "  {} {}", checkbox, text)
        }
    }
}

/// Terminal adapter
pub struct CliAdapter {
    is_tty: bool,
    quiet: bool,
    progress_counter: AtomicU64,
    active_progress: Mutex<HashMap<u64, ProgressBar>>,
}

impl CliAdapter {
    pub fn new(quiet: bool) -> Self {
        Self::with_tty(std::io::stdin().is_terminal(), quiet)
    }

    pub fn with_tty(is_tty: bool, quiet: bool) -> Self {
        setup_ctrl_c_handler();
        Self {
            is_tty,
            quiet,
            progress_counter: AtomicU64::new(0),
            active_progress: Mutex::new(HashMap::new()),
        }
    }

    fn ready_for_prompt(&self) -> InteractionResult<()> {
        if !self.is_tty {
            return Err(InteractionError::NonTty);
        }
        if is_cancelled() {
            return Err(InteractionError::Cancelled);
        }
        Ok(())
    }

    fn convert_dialoguer_error(err: dialoguer::Error) -> InteractionError {
        match err {
            dialoguer::Error::IO(e) if e.kind() == std::io::ErrorKind::Interrupted => {
                InteractionError::Cancelled
            }
            other => InteractionError::Io(other.to_string()),
        }
    }
}

impl InteractionAdapter for CliAdapter {
    fn ask_confirm(&self, prompt: &str, default: bool) -> InteractionResult<bool> {
        self.ready_for_prompt()?;

        Confirm::with_theme(&BranchTheme::new())
            .with_prompt(prompt)
            .default(default)
            .interact()
            .map_err(Self::convert_dialoguer_error)
    }

    fn ask_multi_select(
        &self,
        prompt: &str,
        options: &[&str],
        defaults: &[bool],
    ) -> InteractionResult<Vec<usize>> {
        self.ready_for_prompt()?;

        if options.is_empty() {
            return Err(InteractionError::InvalidInput(
                "options cannot be empty".to_string(),
            ));
        }

        MultiSelect::with_theme(&BranchTheme::new())
            .with_prompt(prompt)
            .items(options)
            .defaults(defaults)
            .interact()
            .map_err(Self::convert_dialoguer_error)
    }

    fn start_progress(&self, message: &str) -> ProgressHandle {
        let id = self.progress_counter.fetch_add(1, Ordering::SeqCst);

        if self.is_tty && !self.quiet {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg} [{elapsed}]") {
                pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
            }
            pb.set_message(message.to_string());
            pb.enable_steady_tick(Duration::from_millis(100));

            if let Ok(mut progress_map) = self.active_progress.lock() {
                progress_map.insert(id, pb);
            }
        }

        ProgressHandle::new(id, message)
    }

    fn end_progress(&self, handle: ProgressHandle, success: bool) {
        let bar = self
            .active_progress
            .lock()
            .ok()
            .and_then(|mut map| map.remove(&handle.id()));
        let Some(pb) = bar else {
            return;
        };
        let elapsed = format!("{:.1}s", pb.elapsed().as_secs_f64());
        pb.finish_and_clear();

        if success {
            println!("{} {} [{}]", "✓".style(COLORS.success), handle.message(), elapsed);
        } else {
            println!("{} {} [{}]", "✗".style(COLORS.fail), handle.message(), elapsed);
        }
    }

    fn print_info(&self, message: &str) {
        if self.quiet {
            return;
        }
        println!("{}", message);
        let _ = std::io::stdout().flush();
    }

    fn print_warning(&self, message: &str) {
        eprintln!("{} {}", "warning:".style(COLORS.warning).bold(), message);
        let _ = std::io::stderr().flush();
    }

    fn print_error(&self, message: &str) {
        eprintln!("{} {}", "error:".style(COLORS.fail).bold(), message);
        let _ = std::io::stderr().flush();
    }

    fn print_success(&self, message: &str) {
        if self.quiet {
            return;
        }
        println!("{} {}", "✓".style(COLORS.success), message.style(COLORS.success));
        let _ = std::io::stdout().flush();
    }

    fn print_header(&self, message: &str) {
        if self.quiet {
            return;
        }
        println!("{}", message.style(COLORS.active).bold());
        let _ = std::io::stdout().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_tty_override() {
        let adapter = CliAdapter::with_tty(false, false);
        assert!(!adapter.is_tty);
        let adapter = CliAdapter::with_tty(true, true);
        assert!(adapter.is_tty && adapter.quiet);
    }

    #[test]
    fn test_non_tty_confirm_is_error() {
        let adapter = CliAdapter::with_tty(false, false);
        let result = adapter.ask_confirm("delete?", false);
        assert!(matches!(result, Err(InteractionError::NonTty)));
    }

    #[test]
    fn test_non_tty_multi_select_is_error() {
        let adapter = CliAdapter::with_tty(false, false);
        let result = adapter.ask_multi_select("pick", &["a", "b"], &[true, true]);
        assert!(matches!(result, Err(InteractionError::NonTty)));
    }

    #[test]
    fn test_progress_without_tty_is_silent() {
        let adapter = CliAdapter::with_tty(false, false);
        let first = adapter.start_progress("scanning");
        let second = adapter.start_progress("fetching");
        assert_ne!(first.id(), second.id());
        assert_eq!(first.message(), "scanning");
        adapter.end_progress(first, true);
        adapter.end_progress(second, false);
    }

    #[test]
    fn test_print_methods_dont_panic() {
        let adapter = CliAdapter::with_tty(false, true);
        adapter.print_info("info");
        adapter.print_warning("warning");
        adapter.print_error("error");
        adapter.print_success("success");
        adapter.print_header("header");
    }
}
