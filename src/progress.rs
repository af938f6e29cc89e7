//! Run feedback for the enrichment binaries.
//!
//! `ProgressMode` is picked once per run and handed to whatever draws: with
//! `LogOnly` the bars are hidden and `log_progress` emits a tracing line
//! every so often, so a run redirected to a file stays readable.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// How progress is shown for a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProgressMode {
    /// Interactive progress bars on stderr
    #[default]
    Bars,
    /// No bars; periodic progress lines through the logger
    LogOnly,
}

impl ProgressMode {
    pub fn from_log_only(log_only: bool) -> Self {
        if log_only {
            ProgressMode::LogOnly
        } else {
            ProgressMode::Bars
        }
    }

    pub fn is_log_only(self) -> bool {
        self == ProgressMode::LogOnly
    }
}

/// Install the tracing subscriber for a binary. `RUST_LOG` overrides the
/// default `info` level.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Format duration in human-readable format
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else if secs < 3600.0 {
        format!("{:.1}m", secs / 60.0)
    } else {
        let hours = (secs / 3600.0).floor();
        let mins = ((secs - hours * 3600.0) / 60.0).floor();
        format!("{}h {}m", hours as u64, mins as u64)
    }
}

/// Create a progress bar with consistent styling.
/// In log-only mode, the progress bar is hidden.
pub fn create_progress_bar(len: u64, msg: &str, mode: ProgressMode) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if mode.is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else if let Ok(style) = ProgressStyle::default_bar()
        .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, ETA: {eta})")
    {
        pb.set_style(style.progress_chars("=> "));
    }
    pb.set_message(msg.to_string());
    pb
}

/// Log progress periodically for tail-friendly output.
/// Only logs when in log-only mode and at specified intervals.
pub fn log_progress(mode: ProgressMode, phase: &str, current: u64, total: u64, interval: u64) {
    if mode.is_log_only() && interval > 0 && (current % interval == 0 || current == total) {
        let pct = if total == 0 {
            100.0
        } else {
            100.0 * current as f64 / total as f64
        };
        info!("[{}] {}/{} ({:.1}%)", phase, current, total, pct);
    }
}

/// Create a spinner for indeterminate progress.
/// In log-only mode, the spinner is hidden.
pub fn create_spinner(msg: &str, mode: ProgressMode) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if mode.is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        if let Ok(style) = ProgressStyle::default_spinner().template("{msg} {spinner} [{elapsed_precise}]") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
    }
    pb.set_message(msg.to_string());
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1.5m");
        assert_eq!(format_duration(Duration::from_secs(2 * 3600 + 5 * 60 + 7)), "2h 5m");
    }

    #[test]
    fn test_mode_from_flag() {
        assert_eq!(ProgressMode::from_log_only(true), ProgressMode::LogOnly);
        assert_eq!(ProgressMode::from_log_only(false), ProgressMode::Bars);
        assert!(!ProgressMode::default().is_log_only());
    }

    #[test]
    fn test_hidden_bar_still_counts() {
        let pb = create_progress_bar(10, "phase", ProgressMode::LogOnly);
        pb.inc(3);
        assert_eq!(pb.position(), 3);
        assert!(pb.is_hidden());
    }
}
