//! Item discovery: turning an external listing into download descriptors.
//!
//! A source produces the list of [`DownloadItem`]s a batch run starts
//! from. Two implementations are provided: scraping anchors out of an
//! HTML listing page, and collecting URLs from free text (CLI
//! arguments, stdin, or a file).
//!
//! # Architecture
//!
//! - [`ItemSource`] - Async trait every source implements
//! - [`ListingSource`] - HTML listing page scrape with a file-name filter
//! - [`UrlListSource`] - Plain URLs pulled out of free text

mod lines;
mod listing;

pub use lines::UrlListSource;
pub use listing::{DEFAULT_FILE_PATTERN, ListingSource};

use async_trait::async_trait;
use thiserror::Error;

use crate::item::DownloadItem;

/// Errors from item discovery.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The listing fetch failed or returned a bad status.
    #[error("{}", http_message(.status, .message))]
    Http {
        /// HTTP status code, when a response was received.
        status: Option<u16>,
        /// Description of the failure.
        message: String,
    },

    /// The configured file-name pattern is not a valid regex.
    #[error("invalid file pattern {pattern:?}: {message}")]
    Pattern {
        /// The pattern as given.
        pattern: String,
        /// The regex engine's complaint.
        message: String,
    },
}

fn http_message(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("listing fetch failed with HTTP {code}: {message}"),
        None => format!("listing fetch failed: {message}"),
    }
}

impl SourceError {
    /// Creates an HTTP error with a known status code.
    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Creates an HTTP error from a transport-level failure.
    #[must_use]
    pub fn transport(error: &reqwest::Error) -> Self {
        Self::Http {
            status: error.status().map(|s| s.as_u16()),
            message: error.to_string(),
        }
    }

    /// Creates a pattern error from a regex compile failure.
    pub fn pattern(pattern: impl Into<String>, error: &regex::Error) -> Self {
        Self::Pattern {
            pattern: pattern.into(),
            message: error.to_string(),
        }
    }
}

/// Trait that all item sources implement.
///
/// # Object Safety
///
/// This trait uses `async_trait` to support dynamic dispatch via
/// `Box<dyn ItemSource>`. Rust 2024 native async traits are not
/// object-safe, so `async_trait` is required here.
#[async_trait]
pub trait ItemSource: Send + Sync {
    /// Returns the source's name (e.g., "listing", "url-list").
    fn name(&self) -> &str;

    /// Produces the current list of downloadable items.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the backing listing cannot be
    /// fetched. Individually malformed entries are skipped, not fatal.
    async fn discover(&self) -> Result<Vec<DownloadItem>, SourceError>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_display_with_status() {
        let err = SourceError::http_status(503, "Service Unavailable");
        assert_eq!(
            err.to_string(),
            "listing fetch failed with HTTP 503: Service Unavailable"
        );
    }

    #[test]
    fn test_http_error_display_without_status() {
        let err = SourceError::Http {
            status: None,
            message: "connection refused".to_string(),
        };
        assert_eq!(err.to_string(), "listing fetch failed: connection refused");
    }

    #[test]
    fn test_pattern_error_display() {
        let bad = regex::Regex::new("(").unwrap_err();
        let err = SourceError::pattern("(", &bad);
        let text = err.to_string();
        assert!(text.starts_with("invalid file pattern"), "got: {text}");
        assert!(text.contains("\"(\""), "got: {text}");
    }
}
