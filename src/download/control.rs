//! Shared pause and cancel signals consulted by every in-flight download.
//!
//! Both handles are cheap clones over a single atomic flag. Engine runs
//! only poll them (at the pause poll interval or once per written slice),
//! so relaxed ordering carries no observable cost in staleness.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Process-wide pause signal shared by all concurrent downloads.
///
/// The gate starts runnable. `pause` and `resume` are idempotent and may
/// be called from any thread; every clone observes the same state.
#[derive(Debug, Clone, Default)]
pub struct PauseGate {
    paused: Arc<AtomicBool>,
}

impl PauseGate {
    /// Creates a gate in the runnable state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Suspends all downloads sharing this gate.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Relaxed);
    }

    /// Lets suspended downloads continue.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Relaxed);
    }

    /// Returns `true` while the gate is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }
}

/// Cooperative cancellation signal for one batch of downloads.
///
/// One-way for the lifetime of the batch: once tripped it stays tripped,
/// and every clone observes it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates an untripped token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
