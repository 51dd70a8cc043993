//! URL-list source: descriptors out of free text.
//!
//! Accepts whatever the operator pasted (CLI arguments, stdin, a
//! file), finds every http(s) URL in it, and produces one descriptor
//! per URL that yields a usable file name. Everything else is logged
//! and skipped; discovery itself never fails.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{ItemSource, SourceError};
use crate::item::{DownloadItem, file_name_from_url};

/// Matches http:// and https:// URLs embedded in text, capturing until
/// whitespace or common delimiters.
#[allow(clippy::expect_used)]
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s<>"'\]]+"#).expect("URL regex is valid") // Static pattern, safe to panic
});

/// Item source over a block of free text containing URLs.
pub struct UrlListSource {
    text: String,
}

impl UrlListSource {
    /// Creates a source over raw text.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Creates a source from individual URL arguments.
    #[must_use]
    pub fn from_args(urls: &[String]) -> Self {
        Self::new(urls.join("\n"))
    }
}

#[async_trait]
impl ItemSource for UrlListSource {
    fn name(&self) -> &str {
        "url-list"
    }

    #[instrument(skip(self), fields(input_len = self.text.len()))]
    async fn discover(&self) -> Result<Vec<DownloadItem>, SourceError> {
        let mut items = Vec::new();

        for url_match in URL_PATTERN.find_iter(&self.text) {
            let raw = url_match.as_str();
            let parsed = match Url::parse(raw) {
                Ok(parsed) if parsed.host().is_some() => parsed,
                Ok(_) => {
                    warn!(url = %raw, "skipping URL without a host");
                    continue;
                }
                Err(e) => {
                    warn!(url = %raw, error = %e, "skipping malformed URL");
                    continue;
                }
            };

            let Some(file_name) = file_name_from_url(&parsed) else {
                warn!(url = %parsed, "skipping URL without a usable file name");
                continue;
            };

            debug!(url = %parsed, file = %file_name, "accepted URL");
            items.push(DownloadItem::new(file_name.clone(), file_name, parsed));
        }

        Ok(items)
    }
}
