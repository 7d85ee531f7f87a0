//! The analysis orchestrator.
//!
//! Strategies run strictly in sequence, cheapest first, each gated on the
//! best confidence seen so far: platform scrape, context scrape, Google
//! Lens, Yandex, SauceNAO. A strategy that cannot improve on what is
//! already known is never run. The pipeline itself never fails; every
//! strategy error degrades to "no candidates from that strategy" and the
//! response always carries the manual search links.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::config::{AttributionConfig, CONTEXT_CONFIDENCE, MAX_RESULTS, PLATFORM_CONFIDENCE};
use super::context::context_scrape;
use super::engines::{search_links, ReverseEngine};
use super::normalize::rank;
use super::platform::{detect_platform, platform_scrape, ScrapedIdentity};
use super::runner::TabSearcher;
use super::saucenao::SimilaritySearcher;
use super::types::{AnalysisResult, CandidateRecord, Method, PageData};

/// One image to attribute, plus the page context it was found in.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    /// URL of the image itself. `data:` URLs are accepted but skip every
    /// remote strategy.
    pub image_url: String,
    /// URL of the page hosting the image.
    pub page_url: String,
    /// Snapshot of the hosting page, when the caller captured one.
    #[serde(default)]
    pub page_data: Option<PageData>,
}

/// The strategy sequencer. Browser automation and the similarity API sit
/// behind trait seams so the gating logic tests without either.
pub struct Pipeline {
    config: AttributionConfig,
    tabs: Arc<dyn TabSearcher>,
    similarity: Arc<dyn SimilaritySearcher>,
}

impl Pipeline {
    /// Assemble a pipeline over the given strategy backends.
    pub fn new(
        config: AttributionConfig,
        tabs: Arc<dyn TabSearcher>,
        similarity: Arc<dyn SimilaritySearcher>,
    ) -> Self {
        Self {
            config,
            tabs,
            similarity,
        }
    }

    /// Run the full strategy sequence for one image. Never fails.
    pub async fn analyze(&self, request: &AnalysisRequest) -> AnalysisResult {
        let request_id = Uuid::new_v4();
        let data = request.page_data.clone().unwrap_or_default();
        let platform = detect_platform(&request.page_url);
        let mut candidates: Vec<CandidateRecord> = Vec::new();

        if let Some(p) = platform {
            if let Some(identity) = platform_scrape(&data, p, &request.page_url) {
                info!(%request_id, platform = ?p, author = %identity.author,
                    "Platform scrape succeeded");
                candidates.push(record_from(identity, PLATFORM_CONFIDENCE, Method::Platform));
            }
        }
        if candidates.is_empty() {
            if let Some(identity) = context_scrape(&data, &request.page_url) {
                info!(%request_id, author = %identity.author, "Context scrape succeeded");
                candidates.push(record_from(identity, CONTEXT_CONFIDENCE, Method::Context));
            }
        }

        if request.image_url.starts_with("data:") {
            debug!(%request_id, "Inline image data, skipping remote strategies");
        } else {
            if best_confidence(&candidates) < self.config.lens_threshold {
                candidates.extend(
                    self.tabs
                        .search(ReverseEngine::Lens, &request.image_url)
                        .await,
                );
            }
            if best_confidence(&candidates) < self.config.yandex_threshold {
                candidates.extend(
                    self.tabs
                        .search(ReverseEngine::Yandex, &request.image_url)
                        .await,
                );
            }
            if best_confidence(&candidates) < self.config.saucenao_threshold {
                match self.similarity.search(&request.image_url).await {
                    Ok(records) => candidates.extend(records),
                    Err(e) => warn!(%request_id, "SauceNAO search failed: {e}"),
                }
            }
        }

        let results = rank(candidates, MAX_RESULTS);
        info!(%request_id, count = results.len(), "Analysis complete");
        AnalysisResult {
            platform,
            results,
            search_links: search_links(&request.image_url),
            analyzed_at: Utc::now(),
            request_id,
        }
    }
}

fn best_confidence(candidates: &[CandidateRecord]) -> u8 {
    candidates.iter().map(|r| r.confidence).max().unwrap_or(0)
}

/// Lift a scraped identity into a candidate; the pipeline owns confidence
/// and method, scrapers never assign them.
fn record_from(identity: ScrapedIdentity, confidence: u8, method: Method) -> CandidateRecord {
    let author_url = identity.socials.first().map(|s| s.url.clone());
    CandidateRecord {
        author: Some(identity.author),
        display_handle: identity.display_handle,
        title: None,
        url: Some(identity.url),
        author_url,
        confidence,
        socials: identity.socials,
        source: identity.source.to_string(),
        method,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribution::error::AttributionError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn candidate(author: &str, confidence: u8, method: Method) -> CandidateRecord {
        CandidateRecord {
            author: Some(author.to_string()),
            display_handle: None,
            title: None,
            url: Some(format!("https://results.example/{author}")),
            author_url: None,
            confidence,
            socials: Vec::new(),
            source: "test".to_string(),
            method,
        }
    }

    #[derive(Default)]
    struct FakeTabs {
        lens: Vec<CandidateRecord>,
        yandex: Vec<CandidateRecord>,
        calls: Mutex<Vec<ReverseEngine>>,
    }

    #[async_trait]
    impl TabSearcher for FakeTabs {
        async fn search(&self, engine: ReverseEngine, _image_url: &str) -> Vec<CandidateRecord> {
            self.calls.lock().unwrap().push(engine);
            match engine {
                ReverseEngine::Lens => self.lens.clone(),
                ReverseEngine::Yandex => self.yandex.clone(),
            }
        }
    }

    #[derive(Default)]
    struct FakeSimilarity {
        records: Vec<CandidateRecord>,
        fail: bool,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl SimilaritySearcher for FakeSimilarity {
        async fn search(&self, _image_url: &str) -> Result<Vec<CandidateRecord>, AttributionError> {
            *self.calls.lock().unwrap() += 1;
            if self.fail {
                Err(AttributionError::HttpClient("connection reset".to_string()))
            } else {
                Ok(self.records.clone())
            }
        }
    }

    fn pipeline(tabs: FakeTabs, similarity: FakeSimilarity) -> (Pipeline, Arc<FakeTabs>, Arc<FakeSimilarity>) {
        let tabs = Arc::new(tabs);
        let similarity = Arc::new(similarity);
        let p = Pipeline::new(
            AttributionConfig::default(),
            tabs.clone(),
            similarity.clone(),
        );
        (p, tabs, similarity)
    }

    fn request(image_url: &str, page_url: &str, page_data: Option<PageData>) -> AnalysisRequest {
        AnalysisRequest {
            image_url: image_url.to_string(),
            page_url: page_url.to_string(),
            page_data,
        }
    }

    #[tokio::test]
    async fn test_platform_hit_skips_all_remote_strategies() {
        let mut data = PageData::default();
        data.page_title = "Alice Doe on X".to_string();
        let (p, tabs, similarity) = pipeline(FakeTabs::default(), FakeSimilarity::default());

        let result = p
            .analyze(&request(
                "https://pbs.example/img.jpg",
                "https://x.com/alice/status/123",
                Some(data),
            ))
            .await;

        assert_eq!(result.results[0].author.as_deref(), Some("Alice Doe"));
        assert_eq!(result.results[0].confidence, PLATFORM_CONFIDENCE);
        assert_eq!(result.results[0].method, Method::Platform);
        assert!(tabs.calls.lock().unwrap().is_empty());
        assert_eq!(*similarity.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_strong_lens_hit_stops_escalation() {
        let tabs = FakeTabs {
            lens: vec![candidate("Painter A", 82, Method::Lens)],
            ..FakeTabs::default()
        };
        let (p, tabs, similarity) = pipeline(tabs, FakeSimilarity::default());

        let result = p
            .analyze(&request(
                "https://cdn.example/img.jpg",
                "https://blog.example.com/post",
                None,
            ))
            .await;

        assert_eq!(result.results[0].confidence, 82);
        // 82 clears the Yandex (70) and SauceNAO (60) gates.
        assert_eq!(*tabs.calls.lock().unwrap(), vec![ReverseEngine::Lens]);
        assert_eq!(*similarity.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_weak_results_escalate_to_saucenao() {
        let tabs = FakeTabs {
            yandex: vec![candidate("Somewhere", 52, Method::Yandex)],
            ..FakeTabs::default()
        };
        let similarity = FakeSimilarity {
            records: vec![candidate("aki", 87, Method::SauceNao)],
            ..FakeSimilarity::default()
        };
        let (p, tabs, similarity) = pipeline(tabs, similarity);

        let result = p
            .analyze(&request(
                "https://cdn.example/img.jpg",
                "https://blog.example.com/post",
                None,
            ))
            .await;

        assert_eq!(
            *tabs.calls.lock().unwrap(),
            vec![ReverseEngine::Lens, ReverseEngine::Yandex]
        );
        assert_eq!(*similarity.calls.lock().unwrap(), 1);
        assert_eq!(result.results[0].author.as_deref(), Some("aki"));
    }

    #[tokio::test]
    async fn test_context_fallback_gates_yandex_but_not_lens() {
        let mut data = PageData::default();
        data.meta_tags
            .insert("author".to_string(), "Sam Painter".to_string());
        let (p, tabs, similarity) = pipeline(FakeTabs::default(), FakeSimilarity::default());

        let result = p
            .analyze(&request(
                "https://cdn.example/img.jpg",
                "https://blog.example.com/post",
                Some(data),
            ))
            .await;

        assert_eq!(result.results[0].confidence, CONTEXT_CONFIDENCE);
        assert_eq!(result.results[0].method, Method::Context);
        // 72 is below the Lens gate (85) but clears Yandex (70).
        assert_eq!(*tabs.calls.lock().unwrap(), vec![ReverseEngine::Lens]);
        assert_eq!(*similarity.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_data_url_skips_remote_strategies() {
        let (p, tabs, similarity) = pipeline(FakeTabs::default(), FakeSimilarity::default());

        let result = p
            .analyze(&request(
                "data:image/png;base64,iVBORw0KGgo=",
                "https://blog.example.com/post",
                None,
            ))
            .await;

        assert!(result.results.is_empty());
        assert_eq!(result.search_links.len(), 5);
        assert!(tabs.calls.lock().unwrap().is_empty());
        assert_eq!(*similarity.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_saucenao_failure_degrades_gracefully() {
        let similarity = FakeSimilarity {
            fail: true,
            ..FakeSimilarity::default()
        };
        let (p, _, similarity) = pipeline(FakeTabs::default(), similarity);

        let result = p
            .analyze(&request(
                "https://cdn.example/img.jpg",
                "https://blog.example.com/post",
                None,
            ))
            .await;

        assert_eq!(*similarity.calls.lock().unwrap(), 1);
        assert!(result.results.is_empty());
        assert_eq!(result.search_links.len(), 5);
    }

    #[tokio::test]
    async fn test_results_ranked_deduped_and_capped() {
        let tabs = FakeTabs {
            lens: (0..7)
                .map(|i| candidate(&format!("artist-{i}"), 50 + i, Method::Lens))
                .collect(),
            yandex: vec![
                candidate("ARTIST-0", 68, Method::Yandex),
                candidate("extra-a", 52, Method::Yandex),
                candidate("extra-b", 52, Method::Yandex),
            ],
            ..FakeTabs::default()
        };
        let similarity = FakeSimilarity {
            records: vec![candidate("sauce", 61, Method::SauceNao)],
            ..FakeSimilarity::default()
        };
        let (p, _, _) = pipeline(tabs, similarity);

        let result = p
            .analyze(&request(
                "https://cdn.example/img.jpg",
                "https://blog.example.com/post",
                None,
            ))
            .await;

        assert_eq!(result.results.len(), MAX_RESULTS);
        assert!(result
            .results
            .windows(2)
            .all(|w| w[0].confidence >= w[1].confidence));
        // "ARTIST-0" (68) beats "artist-0" (50); only one survives.
        let zeros = result
            .results
            .iter()
            .filter(|r| r.author.as_deref().is_some_and(|a| a.eq_ignore_ascii_case("artist-0")))
            .collect::<Vec<_>>();
        assert_eq!(zeros.len(), 1);
        assert_eq!(zeros[0].confidence, 68);
    }

    #[tokio::test]
    async fn test_platform_detected_even_when_scrape_finds_nothing() {
        let (p, tabs, _) = pipeline(FakeTabs::default(), FakeSimilarity::default());

        let result = p
            .analyze(&request(
                "https://cdn.example/img.jpg",
                "https://www.instagram.com/p/abc/",
                None,
            ))
            .await;

        assert_eq!(result.platform, Some(crate::attribution::platform::Platform::Instagram));
        // Nothing scraped, so the full remote ladder ran.
        assert_eq!(tabs.calls.lock().unwrap().len(), 2);
    }
}
