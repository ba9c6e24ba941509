//! # Progress Tracking Module
//!
//! Questo modulo gestisce il feedback visuale durante i run.
//!
//! ## Responsabilità:
//! - Progress bar con `indicatif` per i run sequenziali e paralleli
//! - Spinner mentre il coordinatore distribuito attende i nodi
//! - Modalità nascosta per `--no-progress`, `--json` e per i test
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:02] [========================================] 150/150 (100%) [OK] photo.jpg
//! ```
//!
//! La barra è `Clone + Send + Sync`: ogni worker del pool ne tiene una copia.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Manages progress reporting for a batch run
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager; `visible = false` draws nothing
    pub fn new(total_tasks: u64, visible: bool) -> Self {
        if !visible {
            return Self::hidden();
        }

        let bar = ProgressBar::new(total_tasks);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Progress manager that never draws
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Advance by one task with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Set a custom message without incrementing
    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Create a spinner for indeterminate progress
    pub fn spinner(message: &str, visible: bool) -> Self {
        if !visible {
            return Self::hidden();
        }

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));

        Self { bar: spinner }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_bar_still_counts() {
        let progress = ProgressManager::new(3, false);
        progress.update("[OK] a.png");
        progress.update("[ERROR] b.png");
        assert_eq!(progress.position(), 2);
        progress.finish("done");
    }

    #[test]
    fn test_clones_share_position() {
        let progress = ProgressManager::hidden();
        let clone = progress.clone();
        std::thread::scope(|s| {
            s.spawn(|| clone.update("x"));
            s.spawn(|| progress.update("y"));
        });
        assert_eq!(progress.position(), 2);
    }
}
