//! Progress reporting for TTY and non-TTY environments.
//!
//! TTY mode: a discovery spinner, an overall records bar, and one byte bar
//! per active download. Non-TTY mode: hidden bars, logs carry the progress.

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Per-download bytes bar
fn bytes_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix:<28.dim} {bar:30.green/dim} {binary_bytes:>7}/{binary_total_bytes:7} {eta:>4} {wide_msg:.dim}")
        .expect("invalid template")
        .progress_chars("--")
}

/// Shown before the content length is known
fn pending_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix:<28.dim} {binary_bytes:>7} {wide_msg:.dim}")
        .expect("invalid template")
}

fn records_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} records ({eta}) {wide_msg}")
        .expect("invalid template")
        .progress_chars("=>-")
}

/// Switch a download bar to the bytes style once the total is known.
pub fn upgrade_to_bar(pb: &ProgressBar, total: u64) {
    pb.set_length(total);
    pb.set_style(bytes_style());
}

/// Central progress context managing multi-progress bars.
pub struct ProgressContext {
    multi: MultiProgress,
    is_tty: bool,
}

impl ProgressContext {
    /// Create new context, detecting TTY automatically.
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            is_tty: std::io::stderr().is_terminal(),
        }
    }

    /// Context whose bars are all hidden (tests, piped output)
    pub fn hidden() -> Self {
        Self {
            multi: MultiProgress::new(),
            is_tty: false,
        }
    }

    /// Spinner line for a stage such as discovery.
    ///
    /// Update with `pb.set_message(...)`; call `pb.finish_and_clear()` when done.
    pub fn stage_line(&self, name: &str) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }
        let pb = self.multi.add(ProgressBar::new(0));
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} {prefix:<10.cyan.bold} {wide_msg}")
                .expect("invalid template"),
        );
        pb.set_prefix(name.to_string());
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    /// Overall bar counting processed records
    pub fn records_bar(&self, total: usize) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }
        let pb = self.multi.add(ProgressBar::new(total as u64));
        pb.set_style(records_style());
        pb
    }

    /// Bar for one asset download, pending until [`upgrade_to_bar`].
    pub fn download_bar(&self, name: &str) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }
        let pb = self.multi.add(ProgressBar::new(0));
        pb.set_style(pending_style());
        // Truncate long names to keep bars aligned
        let display: String = name.chars().take(28).collect();
        pb.set_prefix(display);
        pb
    }

    pub fn is_tty(&self) -> bool {
        self.is_tty
    }

    /// Get reference to `MultiProgress` for the log bridge.
    pub fn multi(&self) -> &MultiProgress {
        &self.multi
    }
}

impl Default for ProgressContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe wrapper for `ProgressContext`.
pub type SharedProgress = Arc<ProgressContext>;

/// Render a count with comma-separated thousands, e.g. `12,480`.
pub fn fmt_num(n: usize) -> String {
    let digits = n.to_string();
    let lead = digits.len() % 3;
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.char_indices() {
        if i > 0 && (i + 3 - lead) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmt_num_below_separator() {
        assert_eq!(fmt_num(0), "0");
        assert_eq!(fmt_num(999), "999");
    }

    #[test]
    fn fmt_num_groups_by_three() {
        assert_eq!(fmt_num(4_096), "4,096");
        assert_eq!(fmt_num(12_480), "12,480");
        assert_eq!(fmt_num(250_000), "250,000");
        assert_eq!(fmt_num(10_000_001), "10,000,001");
    }

    #[test]
    fn hidden_context_hands_out_hidden_bars() {
        let ctx = ProgressContext::hidden();
        assert!(!ctx.is_tty());
        assert!(ctx.records_bar(10).is_hidden());
        assert!(ctx.download_bar("BILLS-116hr34enr.pdf").is_hidden());
        assert!(ctx.stage_line("discover").is_hidden());
    }
}
