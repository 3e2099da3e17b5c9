//! Progress indicators for long-running crawls.
//!
//! A crawl issues one request at a time and has no known length, so the only
//! indicator is a spinner showing the feedstock being processed. Spinners are
//! drawn on stderr and hidden when:
//!
//! - `FEEDCRAWL_NO_PROGRESS` is set
//! - the command runs with `--quiet`
//! - stderr is not a terminal (indicatif's own check)

use std::time::Duration;

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle};

fn is_progress_disabled() -> bool {
    std::env::var("FEEDCRAWL_NO_PROGRESS").is_ok()
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{prefix:.bold} {spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"])
}

/// Spinner with feedcrawl styling.
#[derive(Clone)]
pub struct Spinner {
    inner: IndicatifBar,
}

impl Spinner {
    /// Visible spinner unless progress output is disabled.
    pub fn new(quiet: bool) -> Self {
        if quiet || is_progress_disabled() {
            return Self::hidden();
        }
        let bar = IndicatifBar::new_spinner();
        bar.set_style(spinner_style());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { inner: bar }
    }

    pub fn hidden() -> Self {
        Self {
            inner: IndicatifBar::hidden(),
        }
    }

    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    pub fn set_prefix(&self, prefix: impl Into<String>) {
        self.inner.set_prefix(prefix.into());
    }

    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_spinner_accepts_updates() {
        let spinner = Spinner::new(true);
        spinner.set_prefix("crawl");
        spinner.set_message("numpy-feedstock");
        spinner.finish_and_clear();
        assert!(spinner.inner.is_hidden());
    }
}
