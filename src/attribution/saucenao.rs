//! SauceNAO similarity-search client.
//!
//! Plain HTTP API, no browser automation. Response quirks that matter:
//! `similarity` arrives as a string, `creator` may be a string or an array,
//! and `member_id` may be a number or a string. Known indexes get their
//! profile URL synthesized (Pixiv member ids, Twitter handles).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::config::MIN_SIMILARITY;
use super::error::AttributionError;
use super::types::{CandidateRecord, Method, Social};

const API_URL: &str = "https://saucenao.com/search.php";
/// Results requested per query (pre-filter).
const NUM_RESULTS: u8 = 8;

/// Seam the pipeline uses for similarity search, so tests can inject a fake.
#[async_trait]
pub trait SimilaritySearcher: Send + Sync {
    /// Search by image URL; errors are the caller's to degrade.
    async fn search(&self, image_url: &str) -> Result<Vec<CandidateRecord>, AttributionError>;
}

/// HTTP client for the SauceNAO search API.
pub struct SauceNaoClient {
    client: Client,
    api_key: Option<String>,
}

impl SauceNaoClient {
    /// Create a client. A missing API key is valid; the unauthenticated
    /// quota applies.
    #[must_use]
    pub const fn new(client: Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }
}

#[async_trait]
impl SimilaritySearcher for SauceNaoClient {
    async fn search(&self, image_url: &str) -> Result<Vec<CandidateRecord>, AttributionError> {
        let mut query: Vec<(&str, String)> = vec![
            ("output_type", "2".to_string()),
            ("numres", NUM_RESULTS.to_string()),
            ("url", image_url.to_string()),
        ];
        if let Some(key) = &self.api_key {
            query.push(("api_key", key.clone()));
        }

        let response = self.client.get(API_URL).query(&query).send().await?;
        if !response.status().is_success() {
            return Err(AttributionError::ApiStatus {
                service: "SauceNAO",
                status: response.status().as_u16(),
            });
        }

        let body: SauceNaoResponse = response.json().await?;
        let records = records_from(body);
        debug!(count = records.len(), "SauceNAO search complete");
        Ok(records)
    }
}

#[derive(Debug, Deserialize)]
struct SauceNaoResponse {
    #[serde(default)]
    results: Vec<SauceNaoResult>,
}

#[derive(Debug, Deserialize)]
struct SauceNaoResult {
    header: SauceNaoHeader,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct SauceNaoHeader {
    /// Percentage, serialized as a string like "87.32".
    similarity: String,
    #[serde(default)]
    index_name: String,
}

fn records_from(body: SauceNaoResponse) -> Vec<CandidateRecord> {
    body.results.iter().filter_map(convert).collect()
}

fn convert(result: &SauceNaoResult) -> Option<CandidateRecord> {
    let similarity: f32 = result.header.similarity.trim().parse().ok()?;
    if similarity < MIN_SIMILARITY {
        return None;
    }

    let data = &result.data;
    let index = result.header.index_name.to_lowercase();
    let handle = string_field(data, "twitter_user_handle")
        .map(|h| h.trim_start_matches('@').to_string())
        .filter(|h| !h.is_empty());
    let author = first_string(data, &["member_name", "creator", "author_name", "author"])
        .or_else(|| handle.as_ref().map(|h| format!("@{h}")));

    let ext_urls: Vec<String> = data
        .get("ext_urls")
        .and_then(Value::as_array)
        .map(|urls| {
            urls.iter()
                .filter_map(|u| u.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let mut author_url = None;
    let mut socials = Vec::new();
    if index.contains("pixiv") {
        if let Some(id) = id_field(data, "member_id") {
            let url = format!("https://www.pixiv.net/en/users/{id}");
            socials.push(Social::new("Pixiv", url.clone()));
            author_url = Some(url);
        }
    }
    if let Some(h) = &handle {
        let url = format!("https://x.com/{h}");
        socials.push(Social::with_handle("Twitter/X", url.clone(), format!("@{h}")));
        if author_url.is_none() {
            author_url = Some(url);
        }
    }
    for ext in &ext_urls {
        if socials.iter().all(|s| s.url != *ext) {
            socials.push(Social::new(host_label(ext), ext));
        }
    }

    let url = ext_urls.first().cloned();
    let title = (author.is_none())
        .then(|| first_string(data, &["title", "eng_name"]))
        .flatten();

    let record = CandidateRecord {
        author,
        display_handle: handle.map(|h| format!("@{h}")),
        title,
        url: url.clone(),
        author_url: author_url.or(url),
        confidence: similarity.round().clamp(0.0, 100.0) as u8,
        socials,
        source: "SauceNAO".to_string(),
        method: Method::SauceNao,
    };
    record.has_identity().then_some(record)
}

/// First non-empty string among the given keys. Array values (SauceNAO's
/// `creator` for some indexes) contribute their first string element.
fn first_string(data: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| string_field(data, key))
}

fn string_field(data: &Value, key: &str) -> Option<String> {
    let value = data.get(key)?;
    let s = match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().find_map(|v| v.as_str())?.to_string(),
        _ => return None,
    };
    let s = s.trim().to_string();
    (!s.is_empty()).then_some(s)
}

/// Numeric or string id field, normalized to a string.
fn id_field(data: &Value, key: &str) -> Option<String> {
    match data.get(key)? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn host_label(href: &str) -> String {
    url::Url::parse(href)
        .ok()
        .and_then(|u| {
            u.host_str()
                .map(|h| h.trim_start_matches("www.").to_string())
        })
        .unwrap_or_else(|| "Source".to_string())
}
