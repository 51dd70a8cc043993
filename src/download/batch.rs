//! Bounded-concurrency batch scheduler.
//!
//! Partitions items into consecutive groups of `max_parallel` and runs
//! the groups strictly in order, all downloads within a group
//! concurrently. A group must finish entirely before the next one
//! starts, so peak connection count never exceeds `max_parallel`.
//! Individual failures never abort siblings or later groups.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::control::CancelToken;
use super::engine::{DownloadEngine, DownloadOutcome};
use super::sink::ProgressSink;
use crate::item::DownloadItem;

/// Default bound on concurrent downloads within a batch.
pub const DEFAULT_MAX_PARALLEL: usize = 4;

/// Tally of terminal outcomes across one batch run.
#[derive(Debug, Default, Clone, Copy)]
pub struct BatchStats {
    completed: usize,
    failed: usize,
    cancelled: usize,
}

impl BatchStats {
    /// Items that finished, whether streamed or verified in place.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Items that ended in a classified failure.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Items stopped by the shared cancel token.
    #[must_use]
    pub fn cancelled(&self) -> usize {
        self.cancelled
    }

    /// Total number of items processed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.completed + self.failed + self.cancelled
    }

    fn tally(&mut self, outcome: &DownloadOutcome) {
        match outcome {
            DownloadOutcome::Completed | DownloadOutcome::CompletedVerified => {
                self.completed += 1;
            }
            DownloadOutcome::Cancelled => self.cancelled += 1,
            DownloadOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// Runs every item through the engine in bounded concurrent groups.
///
/// Items are taken in the order given. Once the cancel token trips,
/// remaining items still pass through the engine so each one records
/// its own `cancelled` status.
#[instrument(skip_all, fields(items = items.len(), max_parallel))]
pub async fn run_batch(
    engine: &DownloadEngine,
    items: &[Arc<DownloadItem>],
    dest_dir: &Path,
    sink: &Arc<dyn ProgressSink>,
    cancel: &CancelToken,
    max_parallel: usize,
) -> BatchStats {
    let mut stats = BatchStats::default();
    let group_size = max_parallel.max(1);

    info!(items = items.len(), group_size, "starting batch");

    for (group_index, group) in items.chunks(group_size).enumerate() {
        debug!(group = group_index, size = group.len(), "starting group");

        let mut handles = Vec::with_capacity(group.len());
        for item in group {
            let engine = engine.clone();
            let item = Arc::clone(item);
            let join_item = Arc::clone(&item);
            let dest_dir = dest_dir.to_path_buf();
            let sink = Arc::clone(sink);
            let cancel = cancel.clone();
            handles.push((
                join_item,
                tokio::spawn(async move {
                    engine.run(&item, &dest_dir, sink.as_ref(), &cancel).await
                }),
            ));
        }

        // Group barrier: the next group starts only after every handle here
        // has settled.
        for (item, handle) in handles {
            match handle.await {
                Ok(outcome) => stats.tally(&outcome),
                Err(e) => {
                    warn!(file = %item.file_name(), error = %e, "download task panicked");
                    item.set_status("failed: task panicked");
                    sink.report(&format!("{}: task panicked", item.file_name()));
                    stats.failed += 1;
                }
            }
        }
    }

    info!(
        completed = stats.completed,
        failed = stats.failed,
        cancelled = stats.cancelled,
        "batch finished"
    );
    stats
}
