//! Progress indicators for the terminal
//!
//! Thin wrappers over [`indicatif`] used by the CLI to render the update
//! session: a percentage bar while the package downloads and a spinner while
//! talking to the server or handing the package to the installer.
//!
//! # Environment Variables
//!
//! - `FLOAT_UPDATE_NO_PROGRESS`: Set to any value to disable all progress indicators
//!
//! Hidden bars accept every call and draw nothing, so callers never need to
//! branch on whether progress is shown.
//!
//! # Examples
//!
//! ```rust
//! use float_update::utils::progress::ProgressBar;
//!
//! let progress = ProgressBar::percent();
//! progress.set_prefix("Downloading");
//! progress.set_position(25);
//! progress.set_position(100);
//! progress.finish_with_message("Package downloaded");
//! ```

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::time::Duration;

use crate::constants::ENV_NO_PROGRESS;

/// Whether progress output was disabled through the environment.
fn is_progress_disabled() -> bool {
    std::env::var(ENV_NO_PROGRESS).is_ok()
}

/// A progress bar or spinner that may be hidden.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// A bar counting from 0 to 100 percent.
    pub fn percent() -> Self {
        let bar = if is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new(100);
            bar.set_style(percent_style());
            bar
        };
        Self {
            inner: bar,
        }
    }

    /// A spinner for work of unknown length.
    pub fn new_spinner() -> Self {
        let bar = if is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new_spinner();
            bar.set_style(spinner_style());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        };
        Self {
            inner: bar,
        }
    }

    /// A bar that never draws, for `--no-progress` and non-terminals.
    pub fn hidden() -> Self {
        Self {
            inner: IndicatifBar::hidden(),
        }
    }

    /// Whether this bar draws nothing.
    pub fn is_hidden(&self) -> bool {
        self.inner.is_hidden()
    }

    /// Set the message shown after the bar.
    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    /// Set the label shown before the bar.
    pub fn set_prefix(&self, prefix: impl Into<String>) {
        self.inner.set_prefix(prefix.into());
    }

    /// Move the bar to `pos`.
    pub fn set_position(&self, pos: u64) {
        self.inner.set_position(pos);
    }

    /// Current position.
    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    /// Stop the bar, leaving `msg` on screen.
    pub fn finish_with_message(&self, msg: impl Into<String>) {
        self.inner.finish_with_message(msg.into());
    }

    /// Stop the bar and erase it.
    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }
}

fn percent_style() -> IndicatifStyle {
    IndicatifStyle::default_bar()
        .template("{prefix:.bold} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
        .unwrap_or_else(|_| IndicatifStyle::default_bar())
        .progress_chars("━╸━")
}

fn spinner_style() -> IndicatifStyle {
    IndicatifStyle::default_spinner()
        .template("{prefix:.bold} {spinner:.cyan} {msg}")
        .unwrap_or_else(|_| IndicatifStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
}
