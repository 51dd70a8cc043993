//! Resumable HTTP download engine with batch scheduling.
//!
//! This module provides the transfer core: a per-file engine that
//! negotiates byte-range resumption and streams to disk, a process-wide
//! pause gate and cancel token shared by all transfers, a bounded batch
//! scheduler, and the progress sink the engine reports through.
//!
//! # Features
//!
//! - Streaming downloads (memory-efficient for large files)
//! - Byte-range resumption from whatever partial file exists on disk
//! - Global pause/resume honored between 8 KiB slices
//! - Bounded-concurrency batch execution in sequential groups
//! - Per-file throughput and ETA status lines
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use patchdl_core::download::{CancelToken, DownloadEngine, NullSink, PauseGate};
//! use patchdl_core::item::DownloadItem;
//!
//! # async fn example() {
//! let engine = DownloadEngine::new(PauseGate::new());
//! let item = DownloadItem::new(
//!     "Client patch 1",
//!     "Client-001.bin",
//!     "https://cdn.example.com/patches/Client-001.bin",
//! );
//! let outcome = engine
//!     .run(&item, Path::new("./downloads"), &NullSink, &CancelToken::new())
//!     .await;
//! println!("{}: {outcome:?}", item.status());
//! # }
//! ```

mod batch;
pub mod constants;
mod control;
mod engine;
mod error;
mod sink;
mod speed;

pub use batch::{BatchStats, DEFAULT_MAX_PARALLEL, run_batch};
pub use control::{CancelToken, PauseGate};
pub use engine::{DownloadEngine, DownloadOutcome};
pub use error::DownloadError;
pub use sink::{LogSink, NullSink, ProgressSink};
pub use speed::{SpeedWindow, compose_status, format_remaining, format_speed};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
