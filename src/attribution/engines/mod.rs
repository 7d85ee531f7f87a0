//! Reverse-image-search engine registry.
//!
//! Each engine contributes a target URL builder, a readiness probe over the
//! rendered HTML and a result parser. The same URL table doubles as the
//! user-facing manual search links.

pub mod lens;
pub mod yandex;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::config::AttributionConfig;
use super::types::{CandidateRecord, SearchLink};

/// Engines the headless runner can drive.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ReverseEngine {
    /// Google Lens, widest coverage (paintings, photos, new artists).
    Lens,
    /// Yandex Images, strong for art and European/Asian artists.
    Yandex,
}

impl ReverseEngine {
    /// Display name of the engine.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Lens => "Google Lens",
            Self::Yandex => "Yandex Images",
        }
    }

    /// Search URL for a given image.
    #[must_use]
    pub fn target_url(&self, image_url: &str) -> String {
        let encoded = urlencoding::encode(image_url);
        match self {
            Self::Lens => format!("https://lens.google.com/uploadbyurl?url={encoded}"),
            Self::Yandex => {
                format!("https://yandex.com/images/search?url={encoded}&rpt=imageview")
            }
        }
    }

    /// Quiescence window for this engine's results page.
    #[must_use]
    pub const fn settle(&self, config: &AttributionConfig) -> Duration {
        match self {
            Self::Lens => config.lens_settle,
            Self::Yandex => config.yandex_settle,
        }
    }

    /// Hard ceiling for one automation run against this engine.
    #[must_use]
    pub const fn total(&self, config: &AttributionConfig) -> Duration {
        match self {
            Self::Lens => config.lens_total,
            Self::Yandex => config.yandex_total,
        }
    }

    /// Extra wait after readiness, for lazy-loaded result tiles.
    #[must_use]
    pub const fn lazy_buffer(&self) -> Duration {
        match self {
            Self::Lens => Duration::from_millis(1500),
            Self::Yandex => Duration::from_millis(800),
        }
    }

    /// True once the rendered document shows populated results.
    #[must_use]
    pub fn ready(&self, html: &str) -> bool {
        match self {
            Self::Lens => lens::ready(html),
            Self::Yandex => yandex::ready(html),
        }
    }

    /// Parse candidates out of the rendered results page.
    #[must_use]
    pub fn parse(&self, html: &str) -> Vec<CandidateRecord> {
        match self {
            Self::Lens => lens::parse(html),
            Self::Yandex => yandex::parse(html),
        }
    }
}

/// Manual-search fallback links for an image: always 5, independent of
/// whether any automated strategy succeeded.
#[must_use]
pub fn search_links(image_url: &str) -> Vec<SearchLink> {
    let e = urlencoding::encode(image_url).into_owned();
    let links = [
        (
            "Google Lens",
            format!("https://lens.google.com/uploadbyurl?url={e}"),
            "#4285f4",
        ),
        ("TinEye", format!("https://tineye.com/search?url={e}"), "#a855f7"),
        (
            "Yandex",
            format!("https://yandex.com/images/search?url={e}&rpt=imageview"),
            "#ef4444",
        ),
        (
            "SauceNAO",
            format!("https://saucenao.com/search.php?url={e}"),
            "#f59e0b",
        ),
        ("IQDB", format!("https://iqdb.org/?url={e}"), "#22c55e"),
    ];
    links
        .into_iter()
        .map(|(label, url, color)| SearchLink {
            label: label.to_string(),
            url,
            color: color.to_string(),
        })
        .collect()
}
