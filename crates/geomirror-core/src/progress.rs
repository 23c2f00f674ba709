//! Progress reporting for TTY and non-TTY environments.
//!
//! TTY mode: an indicatif byte bar per download plus a spinner per edition.
//! Non-TTY mode: log-based output (no progress bars).

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Prefix column width shared by every line
const PREFIX_WIDTH: usize = 20;

/// Download bar once the content length is known
fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{prefix:<20.dim} {bar:30.green/dim} {binary_bytes:>9}/{binary_total_bytes:9} {binary_bytes_per_sec:>11} {eta:>4}",
    )
    .expect("invalid template")
    .progress_chars("=> ")
}

/// Download without a content length: byte counter only
fn pending_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:<20.dim} {binary_bytes:>9} {binary_bytes_per_sec:>11}")
        .expect("invalid template")
}

/// Upgrade a progress bar from pending to bytes bar.
///
/// Called by the downloader once the response carries a content length.
pub fn upgrade_to_bar(pb: &ProgressBar, total: u64) {
    pb.set_length(total);
    pb.set_style(bar_style());
}

/// Central progress context managing multi-progress bars.
pub struct ProgressContext {
    multi: MultiProgress,
    is_tty: bool,
}

impl ProgressContext {
    /// Context that draws only when stderr is a terminal.
    pub fn new() -> Self {
        let is_tty = std::io::stderr().is_terminal();
        Self {
            multi: MultiProgress::new(),
            is_tty,
        }
    }

    /// Context that never draws, for tests and scripted runs.
    pub fn hidden() -> Self {
        Self {
            multi: MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden()),
            is_tty: false,
        }
    }

    /// Create a download progress bar.
    ///
    /// TTY: visible bar with pending style until the length is known.
    /// Non-TTY: hidden (no-op).
    pub fn transfer_bar(&self, name: &str) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }

        let pb = self.multi.add(ProgressBar::new(0).with_style(pending_style()));
        pb.set_prefix(name.chars().take(PREFIX_WIDTH).collect::<String>());
        pb
    }

    /// Create a stage status line managed by MultiProgress.
    ///
    /// Update with `pb.set_message(...)` as the edition moves through its
    /// steps, then `pb.finish_and_clear()`.
    pub fn stage_line(&self, name: &str) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }
        let pb = self.multi.add(ProgressBar::new(0));
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} {prefix:<18.cyan.bold} {wide_msg}")
                .expect("invalid template"),
        );
        pb.set_prefix(name.to_string());
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    /// Print a block of text above the bars, or straight to stderr off a TTY.
    pub fn println(&self, msg: impl AsRef<str>) {
        if self.is_tty {
            let _ = self.multi.println(msg);
        } else {
            eprintln!("{}", msg.as_ref());
        }
    }

    /// Whether bars are drawn.
    pub fn is_tty(&self) -> bool {
        self.is_tty
    }

    /// Bar container, needed by the log bridge.
    pub fn multi(&self) -> &MultiProgress {
        &self.multi
    }
}

impl Default for ProgressContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a byte count with binary units (e.g. `3.2 MiB`).
pub fn fmt_bytes(n: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    if n < 1024 {
        return format!("{n} B");
    }
    let mut value = n as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
