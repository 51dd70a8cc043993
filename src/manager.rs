//! Composition root: one manager owning the item list and the controls.
//!
//! [`DownloadManager`] ties an item source, the download engine, the
//! pause gate and the cancel token together behind the command surface
//! a front end needs: `load`, `start`, `pause_all`, `resume_all`,
//! `cancel_all`. All methods take `&self` so the manager can sit in an
//! `Arc` and be driven from UI tasks while a batch is running.

use std::path::Path;
use std::sync::{Arc, RwLock};

use tracing::{info, instrument};

use crate::download::{
    BatchStats, CancelToken, DownloadEngine, PauseGate, ProgressSink, run_batch,
};
use crate::item::DownloadItem;
use crate::source::{ItemSource, SourceError};

/// Download manager over one item source.
pub struct DownloadManager {
    engine: DownloadEngine,
    source: Box<dyn ItemSource>,
    items: RwLock<Vec<Arc<DownloadItem>>>,
    cancel: RwLock<CancelToken>,
}

impl DownloadManager {
    /// Creates a manager with a fresh engine and pause gate.
    #[must_use]
    pub fn new(source: Box<dyn ItemSource>) -> Self {
        Self::with_engine(DownloadEngine::new(PauseGate::new()), source)
    }

    /// Creates a manager around an existing engine.
    #[must_use]
    pub fn with_engine(engine: DownloadEngine, source: Box<dyn ItemSource>) -> Self {
        Self {
            engine,
            source,
            items: RwLock::new(Vec::new()),
            cancel: RwLock::new(CancelToken::new()),
        }
    }

    /// The engine driving this manager's transfers.
    #[must_use]
    pub fn engine(&self) -> &DownloadEngine {
        &self.engine
    }

    /// Refreshes the item list from the source.
    ///
    /// The previous list is discarded first, so a failed refresh leaves
    /// the manager empty rather than stale.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when discovery fails.
    #[instrument(skip(self), fields(source = self.source.name()))]
    pub async fn load(&self) -> Result<usize, SourceError> {
        write_lock(&self.items).clear();

        let discovered = self.source.discover().await?;
        let count = discovered.len();
        *write_lock(&self.items) = discovered.into_iter().map(Arc::new).collect();

        info!(count, "item list loaded");
        Ok(count)
    }

    /// Snapshot of the current item list.
    #[must_use]
    pub fn items(&self) -> Vec<Arc<DownloadItem>> {
        read_lock(&self.items).clone()
    }

    /// Runs one batch over the currently selected items.
    ///
    /// The selection is read once here; flipping an item's `selected`
    /// flag afterwards does not affect a batch already running. Each
    /// call arms a fresh cancel token, so a manager whose previous
    /// batch was cancelled can start again. The pause gate is left as
    /// the operator set it.
    pub async fn start(
        &self,
        dest_dir: &Path,
        sink: Arc<dyn ProgressSink>,
        max_parallel: usize,
    ) -> BatchStats {
        let token = CancelToken::new();
        *write_lock(&self.cancel) = token.clone();

        let selected: Vec<Arc<DownloadItem>> = self
            .items()
            .into_iter()
            .filter(|item| item.is_selected())
            .collect();

        run_batch(
            &self.engine,
            &selected,
            dest_dir,
            &sink,
            &token,
            max_parallel,
        )
        .await
    }

    /// Halts all running transfers at their next slice boundary.
    pub fn pause_all(&self) {
        self.engine.gate().pause();
        info!("downloads paused");
    }

    /// Lets paused transfers continue.
    pub fn resume_all(&self) {
        self.engine.gate().resume();
        info!("downloads resumed");
    }

    /// Whether the shared gate currently holds transfers.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.engine.gate().is_paused()
    }

    /// Cancels the current batch. Partial files stay on disk for resume.
    pub fn cancel_all(&self) {
        read_lock(&self.cancel).cancel();
        info!("cancellation requested");
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
