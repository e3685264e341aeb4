//! Progress reporting utilities using indicatif.
//!
//! This module provides the [`Progress`] struct which implements
//! [`ScanEvents`] to display a spinner (indeterminate collection phase) or
//! a percent bar (processing phase) in the terminal.
//!
//! In quiet mode nothing is drawn; status text still reaches the log at
//! debug level so `-v` runs remain traceable.

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::pipeline::{ScanEvents, ScanPhase, ScanProgress};

/// Terminal progress display for non-quiet scans.
pub struct Progress {
    bar: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress is displayed.
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            quiet,
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█>-")
    }

    fn replace_with_spinner(&self) {
        let mut guard = self.bar.lock().unwrap();
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(Self::spinner_style());
        pb.enable_steady_tick(Duration::from_millis(100));
        *guard = Some(pb);
    }

    fn replace_with_bar(&self) {
        let mut guard = self.bar.lock().unwrap();
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        let pb = ProgressBar::new(100);
        pb.set_style(Self::bar_style());
        *guard = Some(pb);
    }
}

impl ScanEvents for Progress {
    fn on_status(&self, text: &str) {
        log::debug!("{text}");
        if self.quiet {
            return;
        }
        if let Some(ref pb) = *self.bar.lock().unwrap() {
            pb.set_message(truncate_message(text, 60));
        }
    }

    fn on_phase(&self, phase: ScanPhase) {
        if self.quiet {
            return;
        }
        match phase {
            ScanPhase::Collecting => self.replace_with_spinner(),
            ScanPhase::Processing => self.replace_with_bar(),
            ScanPhase::Assembling => {}
            ScanPhase::Done | ScanPhase::Cancelled | ScanPhase::Failed => {
                if let Some(pb) = self.bar.lock().unwrap().take() {
                    pb.finish_and_clear();
                }
            }
        }
    }

    fn on_progress(&self, progress: ScanProgress) {
        if self.quiet {
            return;
        }
        if let ScanProgress::Percent(percent) = progress {
            if let Some(ref pb) = *self.bar.lock().unwrap() {
                pb.set_position(u64::from(percent.min(100)));
            }
        }
    }

    fn on_done(&self) {
        if let Some(pb) = self.bar.lock().unwrap().take() {
            pb.finish_and_clear();
        }
    }
}

/// Truncate a status message for the bar, keeping the tail (file names
/// matter more than prefixes).
fn truncate_message(text: &str, max_len: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_len {
        return text.to_string();
    }
    let tail: String = chars[chars.len() - (max_len - 3)..].iter().collect();
    format!("...{tail}")
}
