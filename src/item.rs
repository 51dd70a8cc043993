//! Download item descriptors shared between sources, the engine, and UIs.
//!
//! A descriptor's identity (names, URL) is fixed at construction. The
//! progress fields use atomics so observers (spinner, batch summary) can
//! read them while the single engine run owning the item writes them;
//! readers tolerate the staleness that relaxed ordering allows.

use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use url::Url;

/// A single downloadable resource and its live transfer state.
#[derive(Debug)]
pub struct DownloadItem {
    /// Human label shown in listings.
    display_name: String,
    /// Local file name the resource is saved under.
    file_name: String,
    /// Absolute HTTP(S) source.
    url: String,
    /// Whether the next batch should include this item.
    selected: AtomicBool,
    /// Expected size in bytes; 0 while unknown.
    total_bytes: AtomicU64,
    /// Bytes persisted to disk so far.
    downloaded_bytes: AtomicU64,
    /// Free-form state string (`connecting`, `paused`, throughput line, ...).
    status: RwLock<String>,
}

impl DownloadItem {
    /// Creates a descriptor in the `pending` state, selected for download.
    #[must_use]
    pub fn new(
        display_name: impl Into<String>,
        file_name: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            file_name: file_name.into(),
            url: url.into(),
            selected: AtomicBool::new(true),
            total_bytes: AtomicU64::new(0),
            downloaded_bytes: AtomicU64::new(0),
            status: RwLock::new("pending".to_string()),
        }
    }

    /// Human label shown in listings.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Local file name the resource is saved under.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Absolute HTTP(S) source.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether the next batch should include this item.
    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.selected.load(Ordering::Relaxed)
    }

    /// Marks the item for inclusion in (or exclusion from) the next batch.
    pub fn set_selected(&self, selected: bool) {
        self.selected.store(selected, Ordering::Relaxed);
    }

    /// Expected size in bytes; 0 while unknown.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes.load(Ordering::Relaxed)
    }

    /// Records the expected size reported by the server.
    pub fn set_total_bytes(&self, total: u64) {
        self.total_bytes.store(total, Ordering::Relaxed);
    }

    /// Bytes persisted to disk so far.
    #[must_use]
    pub fn downloaded_bytes(&self) -> u64 {
        self.downloaded_bytes.load(Ordering::Relaxed)
    }

    /// Overwrites the persisted-byte count (resume probe, restart).
    pub fn set_downloaded_bytes(&self, bytes: u64) {
        self.downloaded_bytes.store(bytes, Ordering::Relaxed);
    }

    /// Adds freshly written bytes and returns the new count.
    pub fn add_downloaded_bytes(&self, bytes: u64) -> u64 {
        self.downloaded_bytes.fetch_add(bytes, Ordering::Relaxed) + bytes
    }

    /// Completion percentage in `[0, 100]`; 0 while the total is unknown.
    #[must_use]
    pub fn progress_percent(&self) -> f64 {
        let total = self.total_bytes();
        if total == 0 {
            return 0.0;
        }
        let done = self.downloaded_bytes();
        (done as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
    }

    /// Current state string.
    #[must_use]
    pub fn status(&self) -> String {
        match self.status.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replaces the state string.
    pub fn set_status(&self, status: impl Into<String>) {
        let mut guard = match self.status.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = status.into();
    }
}

/// Derives a local file name from a URL's final path segment.
///
/// The segment is percent-decoded and sanitized. Returns `None` when the
/// URL has no usable segment (bare hosts, directory URLs, segments that
/// sanitize away to nothing).
#[must_use]
pub fn file_name_from_url(url: &Url) -> Option<String> {
    let last = url.path_segments()?.next_back()?;
    if last.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(last).map_or_else(|_| last.to_string(), |d| d.into_owned());
    let name = sanitize_file_name(&decoded);
    (!name.is_empty()).then_some(name)
}

/// Replaces characters that are invalid on common filesystems and
/// rejects path-traversal segments.
///
/// Returns an empty string for names that cannot be made safe (`.`,
/// `..`, names that are only separators or control characters).
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let mapped: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = mapped.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." || trimmed.chars().all(|c| c == '_')
    {
        return String::new();
    }
    trimmed.to_string()
}

/// Returns `true` when `name` is usable as a bare file name directly
/// under the destination directory.
#[must_use]
pub fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}
