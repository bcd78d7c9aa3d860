//! Progress indicators for pushsync apply runs

use colored::Colorize;
use declarative::{ApplyResult, Change, EntityFailure, ProgressCallback};
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar over the entities that change
pub struct ApplyProgress {
    bar: ProgressBar,
}

impl ApplyProgress {
    pub fn new(quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(0)
        };
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }
        Self { bar }
    }
}

impl ProgressCallback for ApplyProgress {
    fn on_start(&self, count: usize) {
        self.bar.set_length(count as u64);
        self.bar.set_position(0);
    }

    fn on_unit_start(&self, address: &str, change: &Change) {
        self.bar.set_message(format!("{} {address}", change.symbol().trim()));
    }

    fn on_unit_complete(&self, address: &str, result: &Result<ApplyResult, EntityFailure>) {
        match result {
            Ok(_) => self
                .bar
                .println(format!("  {} {address}", "✓".green())),
            Err(failure) => self
                .bar
                .println(format!("  {} {address}: {}", "✗".red(), failure.error)),
        }
        self.bar.inc(1);
    }

    fn on_finish(&self) {
        self.bar.finish_and_clear();
    }
}
