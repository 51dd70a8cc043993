//! Progress reporting seam between the engine and its front end.
//!
//! The engine emits connection milestones, warnings, and terminal states
//! as UTF-8 text lines. Front ends decide where the lines go (tracing, a
//! terminal widget, a test buffer) without the engine knowing about them.

/// Consumer of human-readable progress lines emitted during a transfer.
pub trait ProgressSink: Send + Sync {
    /// Receives one line of progress text.
    fn report(&self, line: &str);
}

/// Every `Fn(&str)` closure is a sink.
impl<F> ProgressSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn report(&self, line: &str) {
        self(line);
    }
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn report(&self, _line: &str) {}
}

/// Sink that forwards every line to the tracing log at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn report(&self, line: &str) {
        tracing::info!("{line}");
    }
}
