//! Configuration for the attribution pipeline.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Confidence assigned to a successful platform scrape.
pub const PLATFORM_CONFIDENCE: u8 = 97;
/// Confidence assigned to a successful context (generic metadata) scrape.
pub const CONTEXT_CONFIDENCE: u8 = 72;
/// Maximum number of candidates returned from one analysis.
pub const MAX_RESULTS: usize = 8;
/// Minimum SauceNAO similarity (percent) for a hit to be kept.
pub const MIN_SIMILARITY: f32 = 50.0;

/// Configuration for the attribution service.
///
/// The confidence thresholds are empirically tuned; their relative ordering
/// (Lens > Yandex > SauceNAO) is what the gating logic relies on.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttributionConfig {
    /// Run Google Lens only when the best confidence so far is below this.
    pub lens_threshold: u8,
    /// Run Yandex only when the best confidence so far is below this.
    pub yandex_threshold: u8,
    /// Run SauceNAO only when the best confidence so far is below this.
    pub saucenao_threshold: u8,
    /// Quiescence window after a "complete" before a Lens page is trusted.
    #[serde(with = "duration_serde")]
    pub lens_settle: Duration,
    /// Hard ceiling for one Lens automation run.
    #[serde(with = "duration_serde")]
    pub lens_total: Duration,
    /// Quiescence window for Yandex.
    #[serde(with = "duration_serde")]
    pub yandex_settle: Duration,
    /// Hard ceiling for one Yandex automation run.
    #[serde(with = "duration_serde")]
    pub yandex_total: Duration,
    /// Budget for polling the rendered DOM until results appear.
    #[serde(with = "duration_serde")]
    pub poll_budget: Duration,
    /// HTTP request timeout (SauceNAO).
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,
    /// HTTP connection timeout.
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,
    /// User agents to rotate.
    pub user_agents: Vec<String>,
    /// SauceNAO API key; absence is valid (unauthenticated quota applies).
    pub saucenao_key: Option<String>,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            lens_threshold: 85,
            yandex_threshold: 70,
            saucenao_threshold: 60,
            lens_settle: Duration::from_millis(2500),
            lens_total: Duration::from_secs(25),
            yandex_settle: Duration::from_secs(2),
            yandex_total: Duration::from_secs(20),
            poll_budget: Duration::from_secs(8),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agents: default_user_agents(),
            saucenao_key: None,
        }
    }
}

impl AttributionConfig {
    /// Create a new config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the SauceNAO API key.
    #[must_use]
    pub fn with_saucenao_key(mut self, key: impl Into<String>) -> Self {
        self.saucenao_key = Some(key.into());
        self
    }

    /// Set the hard ceilings for both automation engines at once.
    ///
    /// Mostly useful in tests, where the defaults are far too generous.
    #[must_use]
    pub const fn with_automation_ceiling(mut self, total: Duration) -> Self {
        self.lens_total = total;
        self.yandex_total = total;
        self
    }

    /// Get a random user agent from the rotation list.
    #[must_use]
    pub fn random_user_agent(&self) -> String {
        if self.user_agents.is_empty() {
            return default_user_agents()[0].clone();
        }
        let mut rng = rand::thread_rng();
        let idx = rng.gen_range(0..self.user_agents.len());
        self.user_agents[idx].clone()
    }
}

/// Default user agents for rotation.
fn default_user_agents() -> Vec<String> {
    vec![
        // Chrome on Windows
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
        // Chrome on macOS
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
        // Firefox on Windows
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0".to_string(),
        // Chrome on Linux
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
        // Safari on macOS
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15".to_string(),
    ]
}

/// Serde module for Duration serialization.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds_ordered() {
        let config = AttributionConfig::default();
        assert!(config.lens_threshold > config.yandex_threshold);
        assert!(config.yandex_threshold > config.saucenao_threshold);
        assert!(PLATFORM_CONFIDENCE > config.lens_threshold);
    }

    #[test]
    fn test_config_builder() {
        let config = AttributionConfig::new()
            .with_saucenao_key("test-key")
            .with_automation_ceiling(Duration::from_secs(2));

        assert_eq!(config.saucenao_key, Some("test-key".to_string()));
        assert_eq!(config.lens_total, Duration::from_secs(2));
        assert_eq!(config.yandex_total, Duration::from_secs(2));
    }

    #[test]
    fn test_random_user_agent() {
        let config = AttributionConfig::default();
        let ua = config.random_user_agent();
        assert!(ua.contains("Mozilla"));
    }
}
