//! HTML listing page scrape.
//!
//! Fetches a configured listing page and extracts one descriptor per
//! anchor whose target looks like a downloadable file. Only absolute
//! http(s) links whose path matches the configured file-name pattern
//! are kept; everything else on the page is ignored.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use tracing::{debug, info, instrument, trace};
use url::Url;

use super::{ItemSource, SourceError};
use crate::item::{DownloadItem, file_name_from_url};

/// Default file-name filter: common patch archive extensions.
pub const DEFAULT_FILE_PATTERN: &str = r"(?i)\.(bin|exe|zip|7z|pak)$";

/// Matches `<a ... href="...">text</a>` including anchors whose text
/// spans lines or wraps other tags.
#[allow(clippy::expect_used)]
static ANCHOR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*?href\s*=\s*["']([^"']*)["'][^>]*>(.*?)</a>"#)
        .expect("anchor regex is valid") // Static pattern, safe to panic
});

/// Strips markup from anchor text when deriving a display name.
#[allow(clippy::expect_used)]
static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag regex is valid"));

/// Item source backed by an HTML listing page.
pub struct ListingSource {
    client: Client,
    listing_url: String,
    file_pattern: Regex,
}

impl ListingSource {
    /// Creates a source for `listing_url`, keeping only links whose URL
    /// path matches `file_pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Pattern`] if `file_pattern` is not a
    /// valid regex.
    pub fn new(
        client: Client,
        listing_url: impl Into<String>,
        file_pattern: &str,
    ) -> Result<Self, SourceError> {
        let compiled =
            Regex::new(file_pattern).map_err(|e| SourceError::pattern(file_pattern, &e))?;
        Ok(Self {
            client,
            listing_url: listing_url.into(),
            file_pattern: compiled,
        })
    }
}

#[async_trait]
impl ItemSource for ListingSource {
    fn name(&self) -> &str {
        "listing"
    }

    #[instrument(skip(self), fields(url = %self.listing_url))]
    async fn discover(&self) -> Result<Vec<DownloadItem>, SourceError> {
        debug!("fetching listing page");
        let response = self
            .client
            .get(&self.listing_url)
            .send()
            .await
            .map_err(|e| SourceError::transport(&e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::http_status(
                status.as_u16(),
                status.canonical_reason().unwrap_or("request failed"),
            ));
        }
        let body = response.text().await.map_err(|e| SourceError::transport(&e))?;

        let items = parse_listing(&body, &self.file_pattern);
        info!(count = items.len(), "listing parsed");
        Ok(items)
    }
}

/// Extracts descriptors from listing HTML in document order.
fn parse_listing(html: &str, file_pattern: &Regex) -> Vec<DownloadItem> {
    let mut items = Vec::new();

    for captures in ANCHOR_PATTERN.captures_iter(html) {
        let raw_href = captures[1].trim();
        if raw_href.is_empty() {
            continue;
        }
        // Listing pages occasionally carry Windows-style separators.
        let href = raw_href.replace('\\', "/");

        let Ok(url) = Url::parse(&href) else {
            trace!(href = %href, "skipping unparsable link");
            continue;
        };
        if !matches!(url.scheme(), "http" | "https") {
            continue;
        }
        if !file_pattern.is_match(url.path()) {
            continue;
        }

        let Some(file_name) = file_name_from_url(&url) else {
            debug!(url = %url, "skipping link without a usable file name");
            continue;
        };

        let text = anchor_display_text(&captures[2]);
        let display_name = if text.is_empty() {
            file_name.clone()
        } else {
            text
        };

        items.push(DownloadItem::new(display_name, file_name, url));
    }

    items
}

/// Plain-text display name out of anchor inner HTML.
fn anchor_display_text(inner: &str) -> String {
    let stripped = TAG_PATTERN.replace_all(inner, " ");
    decode_entities(&stripped)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decodes the entities that actually show up in listing anchors.
///
/// `&amp;` last, so that `&amp;lt;` decodes to the literal `&lt;`.
fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
