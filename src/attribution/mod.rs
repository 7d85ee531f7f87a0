//! Image creator attribution system.
//!
//! Given an image URL and the page it appeared on, runs a sequence of
//! identification strategies from cheapest to most expensive:
//! - Platform-specific page scraping (Twitter/X, Pixiv, ArtStation, ...)
//! - Generic page-metadata scraping (JSON-LD, author meta tags)
//! - Google Lens reverse search (headless tab)
//! - Yandex Images reverse search (headless tab)
//! - SauceNAO similarity API
//!
//! Later strategies only run while the best confidence so far sits below
//! their threshold. The answer always includes manual search links, even
//! when every strategy comes back empty.

pub mod config;
pub mod context;
pub mod engines;
pub mod error;
pub mod normalize;
pub mod pagedata;
pub mod pipeline;
pub mod platform;
pub mod runner;
pub mod saucenao;
pub mod settle;
pub mod types;

pub use config::AttributionConfig;
pub use error::AttributionError;
pub use pipeline::{AnalysisRequest, Pipeline};
pub use platform::Platform;
pub use types::{AnalysisResult, CandidateRecord, PageData, SearchLink, Social};

use std::sync::Arc;

use runner::HeadlessRunner;
use saucenao::SauceNaoClient;

/// Main attribution service wiring the production strategy backends into
/// the pipeline.
pub struct AttributionService {
    config: AttributionConfig,
    pipeline: Pipeline,
}

impl AttributionService {
    /// Create a service with the given configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: AttributionConfig) -> Result<Self, AttributionError> {
        let client = Self::build_client(&config)?;
        let tabs = Arc::new(HeadlessRunner::new(config.clone()));
        let similarity = Arc::new(SauceNaoClient::new(client, config.saucenao_key.clone()));
        let pipeline = Pipeline::new(config.clone(), tabs, similarity);

        Ok(Self { config, pipeline })
    }

    /// Create a service with default configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_defaults() -> Result<Self, AttributionError> {
        Self::new(AttributionConfig::default())
    }

    /// Build an HTTP client with appropriate headers and settings.
    fn build_client(config: &AttributionConfig) -> Result<reqwest::Client, AttributionError> {
        use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};

        let mut headers = HeaderMap::new();

        // Rotate user agents to avoid detection
        let ua = config.random_user_agent();
        if let Ok(ua_value) = HeaderValue::from_str(&ua) {
            headers.insert(USER_AGENT, ua_value);
        }

        if let Ok(accept) = HeaderValue::from_str(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ) {
            headers.insert(ACCEPT, accept);
        }

        if let Ok(lang) = HeaderValue::from_str("en-US,en;q=0.5") {
            headers.insert(ACCEPT_LANGUAGE, lang);
        }

        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| AttributionError::HttpClient(e.to_string()))
    }

    /// Attribute one image. Never fails; the worst case is an empty result
    /// list alongside the manual search links.
    pub async fn analyze(&self, request: &AnalysisRequest) -> AnalysisResult {
        self.pipeline.analyze(request).await
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &AttributionConfig {
        &self.config
    }
}
