//! Constants for the download module (buffering, polling, reporting).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Write granularity for the streaming copy loop (8 KiB).
pub const COPY_BUFFER_SIZE: usize = 8 * 1024;

/// How often a paused download re-checks the pause gate.
pub const PAUSE_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Minimum elapsed time between two throughput/status updates.
pub const SPEED_REPORT_INTERVAL: Duration = Duration::from_millis(1000);

/// User-Agent sent on every request.
pub const USER_AGENT: &str = concat!("patchdl/", env!("CARGO_PKG_VERSION"));
