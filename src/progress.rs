//! Progress reporting for batch fingerprinting using indicatif.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Progress bar over a known number of files.
///
/// Hidden when quiet or when there is only one file. Safe to share across
/// rayon workers.
#[derive(Clone)]
pub struct Progress {
    bar: ProgressBar,
}

impl Progress {
    /// Create a progress bar for `total` files.
    #[must_use]
    pub fn new(total: usize, quiet: bool) -> Self {
        let bar = ProgressBar::new(total as u64);
        if quiet || total < 2 {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        } else {
            bar.set_style(
                ProgressStyle::with_template(
                    "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█>-"),
            );
            bar.enable_steady_tick(Duration::from_millis(100));
        }
        Self { bar }
    }

    /// Record one finished file.
    pub fn inc(&self, identifier: &str) {
        self.bar.set_message(truncate_path(identifier, 30));
        self.bar.inc(1);
    }

    /// Number of files recorded so far.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Remove the bar from the terminal.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Keep the last `max_len` characters of `path`, prefixed with `...`.
fn truncate_path(path: &str, max_len: usize) -> String {
    let count = path.chars().count();
    if count <= max_len {
        return path.to_string();
    }
    let tail: String = path.chars().skip(count - max_len.saturating_sub(3)).collect();
    format!("...{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_path() {
        assert_eq!(truncate_path("short.png", 30), "short.png");
        assert_eq!(truncate_path("abcdefghij", 6), "...hij");
    }

    #[test]
    fn test_hidden_progress_counts() {
        let progress = Progress::new(3, true);
        progress.inc("a.png");
        progress.inc("b.png");
        assert_eq!(progress.position(), 2);
        progress.finish();
    }
}
