//! Resumable download engine: one state machine per file transfer.
//!
//! The engine negotiates byte-range resumption with the server, streams
//! the body to disk in fixed-size slices, and reacts to the shared pause
//! gate and cancel token between slices. Every fault is folded into the
//! returned [`DownloadOutcome`] so sibling transfers are never affected.
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
//! println!("{} -> {outcome:?}", item.file_name());
//! # }
//! ```

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::{ACCEPT_ENCODING, CONTENT_RANGE, RANGE};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, info, instrument, warn};

use super::constants::{
    CONNECT_TIMEOUT_SECS, COPY_BUFFER_SIZE, PAUSE_POLL_INTERVAL, SPEED_REPORT_INTERVAL, USER_AGENT,
};
use super::control::{CancelToken, PauseGate};
use super::error::DownloadError;
use super::sink::ProgressSink;
use super::speed::{SpeedWindow, compose_status};
use crate::item::{DownloadItem, is_safe_file_name};

/// Terminal result of one engine run.
///
/// `run` never returns `Err`: faults are classified, written into the
/// item's status, reported to the sink, and carried here.
#[derive(Debug)]
pub enum DownloadOutcome {
    /// The stream finished and the file was flushed to disk.
    Completed,
    /// A rejected range request proved the on-disk file is already whole.
    CompletedVerified,
    /// The shared cancel token tripped mid-transfer.
    Cancelled,
    /// The transfer failed; partial bytes may remain on disk for resume.
    Failed(DownloadError),
}

impl DownloadOutcome {
    /// Returns `true` for both completion variants.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed | Self::CompletedVerified)
    }
}

/// How a successful run ended (internal to the engine).
enum Completion {
    /// Bytes were streamed and flushed.
    Streamed,
    /// The server's 416 confirmed the local file without a body transfer.
    Verified,
}

/// Download engine with a shared HTTP client and pause gate.
///
/// Create once and clone per concurrent transfer; clones share the
/// client's connection pool and the same gate.
#[derive(Debug, Clone)]
pub struct DownloadEngine {
    client: Client,
    gate: PauseGate,
}

impl Default for DownloadEngine {
    fn default() -> Self {
        Self::new(PauseGate::new())
    }
}

impl DownloadEngine {
    /// Creates an engine with its own HTTP client.
    ///
    /// The client applies a connect timeout only; transfers themselves
    /// run for as long as the server keeps sending.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(gate: PauseGate) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self { client, gate }
    }

    /// Creates an engine around an existing client.
    #[must_use]
    pub fn with_client(client: Client, gate: PauseGate) -> Self {
        Self { client, gate }
    }

    /// The pause gate shared by every transfer on this engine.
    #[must_use]
    pub fn gate(&self) -> &PauseGate {
        &self.gate
    }

    /// The underlying reqwest client, reusable for listing fetches.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Transfers one item into `dest_dir`, resuming from whatever partial
    /// file is already there.
    ///
    /// Mutates the item's status, total and downloaded counters, writes
    /// exactly one file at `dest_dir/file_name`, and emits progress lines
    /// to `sink`. Faults never escape: the returned outcome carries them.
    #[instrument(skip_all, fields(file = %item.file_name()))]
    pub async fn run(
        &self,
        item: &DownloadItem,
        dest_dir: &Path,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> DownloadOutcome {
        let file_name = item.file_name();
        match self.run_inner(item, dest_dir, sink, cancel).await {
            Ok(Completion::Streamed) => {
                item.set_status("completed");
                sink.report(&format!(
                    "{file_name}: completed ({} bytes)",
                    item.downloaded_bytes()
                ));
                info!(bytes = item.downloaded_bytes(), "download complete");
                DownloadOutcome::Completed
            }
            Ok(Completion::Verified) => {
                item.set_status("completed (verified)");
                sink.report(&format!(
                    "{file_name}: already complete ({} bytes)",
                    item.downloaded_bytes()
                ));
                info!(
                    bytes = item.downloaded_bytes(),
                    "existing file verified complete"
                );
                DownloadOutcome::CompletedVerified
            }
            Err(DownloadError::Cancelled) => {
                item.set_status("cancelled");
                sink.report(&format!("{file_name}: cancelled"));
                info!("download cancelled");
                DownloadOutcome::Cancelled
            }
            Err(err) => {
                item.set_status(format!("failed: {err}"));
                sink.report(&format!("{file_name}: {err}"));
                warn!(error = %err, "download failed");
                DownloadOutcome::Failed(err)
            }
        }
    }

    async fn run_inner(
        &self,
        item: &DownloadItem,
        dest_dir: &Path,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<Completion, DownloadError> {
        let file_name = item.file_name();
        if !is_safe_file_name(file_name) {
            return Err(DownloadError::unknown(format!(
                "unusable file name {file_name:?}"
            )));
        }
        let path = dest_dir.join(file_name);

        item.set_status("connecting");
        sink.report(&format!("{file_name}: connecting"));

        // Resume probe: the partial file's length is the resume offset.
        let (mut downloaded, send_range) = match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => (meta.len(), true),
            // Something non-file in the way; the open below will surface it.
            Ok(_) => (0, false),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (0, false),
            Err(e) => {
                warn!(error = %e, "cannot read existing file; starting over");
                sink.report(&format!(
                    "{file_name}: cannot read existing file ({e}); starting over"
                ));
                let _ = tokio::fs::remove_file(&path).await;
                (0, false)
            }
        };
        item.set_downloaded_bytes(downloaded);
        if send_range {
            sink.report(&format!(
                "{file_name}: found existing file; resuming from {downloaded} bytes"
            ));
        }

        if cancel.is_cancelled() {
            return Err(DownloadError::Cancelled);
        }

        // Range offsets address stored bytes; content codings would break
        // that mapping, so downloads pin the identity encoding.
        let mut request = self
            .client
            .get(item.url())
            .header(ACCEPT_ENCODING, "identity");
        if send_range {
            request = request.header(RANGE, format!("bytes={downloaded}-"));
        }
        let response = request
            .send()
            .await
            .map_err(|e| DownloadError::transport(&e))?;
        let status = response.status();
        debug!(status = status.as_u16(), "response headers received");

        let mut resumed = false;
        match status.as_u16() {
            // Resumption accepted; total from Content-Range when present.
            206 => {
                let total = response
                    .headers()
                    .get(CONTENT_RANGE)
                    .and_then(|v| v.to_str().ok())
                    .and_then(parse_content_range_total);
                if let Some(total) = total {
                    item.set_total_bytes(total);
                } else {
                    item.set_total_bytes(downloaded + response.content_length().unwrap_or(0));
                    warn!("Content-Range carries no total size; approximating");
                    sink.report(&format!(
                        "{file_name}: total size unknown; approximating from remaining bytes"
                    ));
                }
                if downloaded > 0 {
                    item.set_status("resuming");
                    resumed = true;
                }
            }
            // Range rejected: on a partial file this usually means the
            // file is already whole.
            416 => {
                sink.report(&format!(
                    "{file_name}: range rejected by server; verifying local file"
                ));
                if downloaded > 0 {
                    let total = item.total_bytes();
                    if total == 0 || total == downloaded {
                        item.set_total_bytes(downloaded);
                        return Ok(Completion::Verified);
                    }
                    sink.report(&format!("{file_name}: size mismatch; will not verify"));
                    item.set_downloaded_bytes(0);
                    return Err(DownloadError::http_status(
                        416,
                        format!(
                            "range not satisfiable and sizes disagree (local {downloaded}, expected {total})"
                        ),
                    ));
                }
                return Err(DownloadError::http_status(416, "range not satisfiable"));
            }
            code if !status.is_success() => {
                return Err(DownloadError::http_status(
                    code,
                    status.canonical_reason().unwrap_or("request failed"),
                ));
            }
            // Plain 200: the whole file from the start, whether or not a
            // range was asked for.
            _ => {
                item.set_total_bytes(response.content_length().unwrap_or(0));
                if downloaded > 0 {
                    warn!("server ignored the range request; restarting from zero");
                    sink.report(&format!(
                        "{file_name}: server does not support resumption; starting over"
                    ));
                    downloaded = 0;
                    item.set_downloaded_bytes(0);
                    let _ = tokio::fs::remove_file(&path).await;
                }
            }
        }

        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(|e| DownloadError::io(dest_dir, e))?;

        // Append only for a true resume; anything else starts the file over.
        let append = status.as_u16() == 206 && downloaded > 0;
        let mut file = if append {
            let mut handle = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await
                .map_err(|e| DownloadError::io(&path, e))?;
            handle
                .seek(std::io::SeekFrom::End(0))
                .await
                .map_err(|e| DownloadError::io(&path, e))?;
            handle
        } else {
            File::create(&path)
                .await
                .map_err(|e| DownloadError::io(&path, e))?
        };

        if !resumed {
            item.set_status("downloading");
        }

        let mut stream = response.bytes_stream();
        let mut window = SpeedWindow::start();
        let mut was_paused = false;

        while let Some(next) = stream.next().await {
            let chunk = next.map_err(|e| DownloadError::transport(&e))?;
            for slice in chunk.chunks(COPY_BUFFER_SIZE) {
                while self.gate.is_paused() {
                    if cancel.is_cancelled() {
                        return Err(DownloadError::Cancelled);
                    }
                    if !was_paused {
                        item.set_status("paused");
                        was_paused = true;
                    }
                    tokio::time::sleep(PAUSE_POLL_INTERVAL).await;
                }
                if was_paused {
                    item.set_status("downloading");
                    was_paused = false;
                }

                if cancel.is_cancelled() {
                    return Err(DownloadError::Cancelled);
                }

                file.write_all(slice)
                    .await
                    .map_err(|e| DownloadError::io(&path, e))?;
                let done = item.add_downloaded_bytes(slice.len() as u64);
                window.record(slice.len() as u64);

                if let Some(rate) = window.sample(SPEED_REPORT_INTERVAL) {
                    let total = item.total_bytes();
                    let remaining = (rate > 0.0 && total > 0)
                        .then(|| total.saturating_sub(done))
                        .filter(|left| *left > 0)
                        .and_then(|left| Duration::try_from_secs_f64(left as f64 / rate).ok());
                    item.set_status(compose_status(item.progress_percent(), rate, remaining));
                }
            }
        }

        file.flush().await.map_err(|e| DownloadError::io(&path, e))?;
        file.sync_all()
            .await
            .map_err(|e| DownloadError::io(&path, e))?;

        // Servers that never told us a size: the stream's end defines it.
        if item.total_bytes() == 0 {
            item.set_total_bytes(item.downloaded_bytes());
        }
        Ok(Completion::Streamed)
    }
}

/// Total length from a `Content-Range: bytes <start>-<end>/<total>` value.
///
/// Returns `None` for the unknown-length form (`bytes 0-99/*`) and for
/// anything unparsable.
fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.rsplit_once('/')?;
    total.trim().parse::<u64>().ok()
}
