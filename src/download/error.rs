//! Error types for the download module.
//!
//! Every fault inside a single transfer is classified into one of four
//! kinds so the engine can fold it into an outcome, write a status line,
//! and leave sibling downloads untouched.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during a single file transfer.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The shared cancel token tripped while this transfer was active.
    ///
    /// Operator-requested, so callers usually report it separately from
    /// real failures.
    #[error("cancelled")]
    Cancelled,

    /// Error HTTP status, unusable response, or transport-level failure.
    ///
    /// `status` is `None` when the failure happened below HTTP (DNS,
    /// connection refused, TLS, a body stream that broke mid-transfer).
    #[error("{}", http_message(.status, .message))]
    Http {
        /// The HTTP status code, when the server got far enough to send one.
        status: Option<u16>,
        /// Human-readable description of the failure.
        message: String,
    },

    /// File system error touching the destination file.
    #[error("IO error at {}: {source}", .path.display())]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Anything that fits no other bucket (unusable descriptor, join error).
    #[error("{message}")]
    Unknown {
        /// Human-readable description of the failure.
        message: String,
    },
}

fn http_message(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("HTTP {code}: {message}"),
        None => format!("request failed: {message}"),
    }
}

impl DownloadError {
    /// Creates an HTTP error carrying an explicit status code.
    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Creates an HTTP error from a reqwest failure.
    ///
    /// The status code is carried over when the server produced one;
    /// connection-level failures leave it empty.
    pub fn transport(source: &reqwest::Error) -> Self {
        Self::Http {
            status: source.status().map(|s| s.as_u16()),
            message: source.to_string(),
        }
    }

    /// Creates an IO error tied to the destination path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an unclassified error.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }

    /// Returns `true` for the cancellation kind.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

// No From<reqwest::Error> / From<std::io::Error> impls: the variants need
// context (status code, destination path) that the source errors don't
// carry on their own. The helper constructors are the conversion points.
