//! Patchdl Core Library
//!
//! This library provides the core functionality for the patchdl tool,
//! which fetches sets of large binary patch files over HTTP(S) with
//! byte-range resumption, global pause/resume, and bounded-concurrency
//! batch execution.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`download`] - Resumable download engine, pause gate, batch scheduler
//! - [`item`] - Download descriptors shared between engine and observers
//! - [`source`] - Item discovery from listing pages or raw URL text
//! - [`manager`] - Composition root exposing load/start/pause/resume/cancel

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
pub mod item;
pub mod manager;
pub mod source;

// Re-export commonly used types
pub use download::{
    BatchStats, CancelToken, DEFAULT_MAX_PARALLEL, DownloadEngine, DownloadError, DownloadOutcome,
    LogSink, NullSink, PauseGate, ProgressSink, run_batch,
};
pub use item::DownloadItem;
pub use manager::DownloadManager;
pub use source::{DEFAULT_FILE_PATTERN, ItemSource, ListingSource, SourceError, UrlListSource};
