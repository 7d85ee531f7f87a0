//! Core types for attribution results.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::platform::Platform;

/// Machine-readable tag for the strategy that produced a candidate.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Platform-specific scrape of the hosting page.
    Platform,
    /// Generic metadata fallback scrape.
    Context,
    /// Google Lens reverse-image search.
    Lens,
    /// Yandex Images reverse-image search.
    Yandex,
    /// SauceNAO similarity-search API.
    SauceNao,
}

/// A social/profile link associated with a candidate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Social {
    /// Human-readable label, e.g. "Pixiv" or a bare hostname.
    pub label: String,
    /// Profile or source URL.
    pub url: String,
    /// Platform handle, e.g. "@alice", when one is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
}

impl Social {
    /// Create a social link without a handle.
    #[must_use]
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
            handle: None,
        }
    }

    /// Create a social link with a handle.
    #[must_use]
    pub fn with_handle(
        label: impl Into<String>,
        url: impl Into<String>,
        handle: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
            handle: Some(handle.into()),
        }
    }
}

/// One strategy's proposed identification of the image's creator.
///
/// At least one of `author`, `title`, `url` is always present; strategies
/// never emit an empty record (see [`CandidateRecord::has_identity`]).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    /// Display name of the probable creator.
    pub author: Option<String>,
    /// Platform handle distinct from the display name, e.g. "@alice".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_handle: Option<String>,
    /// Descriptive text, only populated when no author could be resolved.
    pub title: Option<String>,
    /// Source page where this candidate was found.
    pub url: Option<String>,
    /// Canonical profile URL; primary dedupe key.
    pub author_url: Option<String>,
    /// Strategy-assigned trust score, 0-100.
    pub confidence: u8,
    /// Associated profile links, discovery order, deduped by URL.
    pub socials: Vec<Social>,
    /// Human-readable name of the producing strategy or engine.
    pub source: String,
    /// Machine-readable strategy tag.
    pub method: Method,
}

impl CandidateRecord {
    /// True when the record carries at least one identifying field.
    ///
    /// Strategies check this before emitting; records failing it are dropped.
    #[must_use]
    pub fn has_identity(&self) -> bool {
        self.author.is_some() || self.title.is_some() || self.url.is_some()
    }
}

/// A static manual-search link offered alongside automated results.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchLink {
    /// Engine name shown to the user.
    pub label: String,
    /// Pre-built search URL for the image.
    pub url: String,
    /// Accent color used by consumers when rendering the link.
    pub color: String,
}

/// The final answer for one analysis request.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Platform recognised from the page URL, if any.
    pub platform: Option<Platform>,
    /// Ranked, deduplicated candidates (max 8, confidence descending).
    pub results: Vec<CandidateRecord>,
    /// Manual fallback links, always populated, independent of scraping success.
    pub search_links: Vec<SearchLink>,
    /// When the analysis completed.
    pub analyzed_at: DateTime<Utc>,
    /// Correlation id, also present in log lines for this request.
    pub request_id: Uuid,
}

/// Structured snapshot of the page hosting the image, taken once per request.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageData {
    /// `meta[name]` / `meta[property]` name → content.
    #[serde(default)]
    pub meta_tags: HashMap<String, String>,
    /// Parsed `application/ld+json` blocks, arrays flattened.
    #[serde(default)]
    pub json_ld: Vec<serde_json::Value>,
    /// Links near the image whose host looks like a creator platform.
    #[serde(default)]
    pub nearby_links: Vec<String>,
    /// Document title.
    #[serde(default)]
    pub page_title: String,
    /// `link[rel=canonical]` href, if present.
    pub canonical: Option<String>,
}

impl PageData {
    /// Look up a meta tag by key, falling through the given prefixes.
    ///
    /// `meta("title", &["og:", "twitter:"])` checks `title`, `og:title`,
    /// `twitter:title` in order and returns the first non-empty value.
    #[must_use]
    pub fn meta(&self, key: &str, prefixes: &[&str]) -> Option<&str> {
        std::iter::once(key.to_string())
            .chain(prefixes.iter().map(|p| format!("{p}{key}")))
            .find_map(|k| self.meta_tags.get(&k))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CandidateRecord {
        CandidateRecord {
            author: Some("Alice Doe".to_string()),
            display_handle: Some("@alice".to_string()),
            title: None,
            url: Some("https://x.com/alice/status/123".to_string()),
            author_url: Some("https://x.com/alice".to_string()),
            confidence: 97,
            socials: vec![Social::with_handle(
                "Twitter/X",
                "https://x.com/alice",
                "@alice",
            )],
            source: "Twitter/X".to_string(),
            method: Method::Platform,
        }
    }

    #[test]
    fn test_has_identity() {
        let mut r = record();
        assert!(r.has_identity());

        r.author = None;
        r.title = None;
        r.url = None;
        assert!(!r.has_identity());

        r.title = Some("Untitled".to_string());
        assert!(r.has_identity());
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["displayHandle"], "@alice");
        assert_eq!(json["authorUrl"], "https://x.com/alice");
        assert_eq!(json["method"], "platform");
    }

    #[test]
    fn test_meta_prefix_fallthrough() {
        let mut data = PageData::default();
        data.meta_tags
            .insert("og:title".to_string(), "Alice Doe on X".to_string());

        assert_eq!(
            data.meta("title", &["og:", "twitter:"]),
            Some("Alice Doe on X")
        );
        assert_eq!(data.meta("title", &[]), None);
    }

    #[test]
    fn test_meta_skips_empty_values() {
        let mut data = PageData::default();
        data.meta_tags.insert("author".to_string(), String::new());

        assert_eq!(data.meta("author", &[]), None);
    }
}
