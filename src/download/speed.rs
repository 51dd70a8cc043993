//! Human-readable throughput and remaining-time formatting.
//!
//! The engine samples a rolling window roughly once per second and turns
//! the measured rate into the status line users see while a transfer is
//! streaming.

use std::time::{Duration, Instant};

/// Rolling measurement window for instantaneous transfer speed.
#[derive(Debug)]
pub struct SpeedWindow {
    started: Instant,
    bytes: u64,
}

impl SpeedWindow {
    /// Opens a window starting now.
    #[must_use]
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            bytes: 0,
        }
    }

    /// Records bytes written since the last sample.
    pub fn record(&mut self, bytes: u64) {
        self.bytes += bytes;
    }

    /// Returns the measured rate in bytes per second and resets the
    /// window, once at least `interval` has elapsed. Returns `None`
    /// while the window is still filling.
    pub fn sample(&mut self, interval: Duration) -> Option<f64> {
        let elapsed = self.started.elapsed();
        if elapsed < interval {
            return None;
        }
        let rate = self.bytes as f64 / elapsed.as_secs_f64();
        self.started = Instant::now();
        self.bytes = 0;
        Some(rate)
    }
}

/// Formats a rate in bytes per second as `MB/s` or `KB/s` with one
/// decimal (1024-based units).
#[must_use]
pub fn format_speed(bytes_per_sec: f64) -> String {
    let kb = bytes_per_sec / 1024.0;
    let mb = kb / 1024.0;
    if mb >= 1.0 {
        format!("{mb:.1} MB/s")
    } else {
        format!("{kb:.1} KB/s")
    }
}

/// Formats a remaining-time estimate as `HH:MM:SS`.
///
/// Hours do not wrap at 24; a thirty-hour estimate renders as `30:00:00`.
#[must_use]
pub fn format_remaining(remaining: Duration) -> String {
    let total = remaining.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Composes the streaming status line: percentage, speed, and (when an
/// estimate exists) the remaining time tagged `剩`.
#[must_use]
pub fn compose_status(percent: f64, bytes_per_sec: f64, remaining: Option<Duration>) -> String {
    let speed = format_speed(bytes_per_sec);
    match remaining {
        Some(eta) => format!("{percent:.1}% | {speed} | 剩 {}", format_remaining(eta)),
        None => format!("{percent:.1}% | {speed}"),
    }
}
