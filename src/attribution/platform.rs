//! Platform detection and platform-specific page scraping.
//!
//! Each supported host gets a bespoke extraction rule working over the
//! structured [`PageData`] snapshot. Rules never guess: when no
//! author-identifying signal is present they return `None` and the pipeline
//! falls back to the generic context scrape.

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::types::{PageData, Social};

/// A hosting platform recognised from the page URL.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// twitter.com / x.com
    Twitter,
    /// instagram.com
    Instagram,
    /// pixiv.net
    Pixiv,
    /// artstation.com
    ArtStation,
    /// deviantart.com
    DeviantArt,
    /// behance.net
    Behance,
    /// bsky.app
    Bluesky,
    /// cara.app
    Cara,
    /// *.tumblr.com
    Tumblr,
    /// reddit.com
    Reddit,
    /// pinterest.*
    Pinterest,
}

/// Ordered URL-pattern table; first match wins.
const PLATFORM_PATTERNS: &[(&str, Platform)] = &[
    (r"twitter\.com|x\.com", Platform::Twitter),
    (r"instagram\.com", Platform::Instagram),
    (r"pixiv\.net", Platform::Pixiv),
    (r"artstation\.com", Platform::ArtStation),
    (r"deviantart\.com", Platform::DeviantArt),
    (r"behance\.net", Platform::Behance),
    (r"bsky\.app", Platform::Bluesky),
    (r"cara\.app", Platform::Cara),
    (r"tumblr\.com", Platform::Tumblr),
    (r"reddit\.com", Platform::Reddit),
    (r"pinterest\.", Platform::Pinterest),
];

/// Detect the hosting platform from a page URL.
#[must_use]
pub fn detect_platform(page_url: &str) -> Option<Platform> {
    for (pattern, platform) in PLATFORM_PATTERNS {
        if Regex::new(pattern).ok()?.is_match(page_url) {
            return Some(*platform);
        }
    }
    None
}

/// An author identity extracted from page structure.
///
/// Confidence and method are assigned by the pipeline, not the scraper.
#[derive(Clone, Debug)]
pub struct ScrapedIdentity {
    /// Resolved display name or handle.
    pub author: String,
    /// Platform handle when distinct from the name.
    pub display_handle: Option<String>,
    /// Profile links discovered alongside the author.
    pub socials: Vec<Social>,
    /// Human-readable origin of the extraction.
    pub source: &'static str,
    /// The page the identity was scraped from.
    pub url: String,
}

/// Run the platform-specific extraction rule for `platform`.
///
/// Returns `None` when the rule finds no author-identifying signal.
#[must_use]
pub fn platform_scrape(
    data: &PageData,
    platform: Platform,
    page_url: &str,
) -> Option<ScrapedIdentity> {
    let url = data.canonical.clone().unwrap_or_else(|| page_url.to_string());
    match platform {
        Platform::Twitter => scrape_twitter(data, &url),
        Platform::Instagram => scrape_instagram(data, &url),
        Platform::Pixiv => scrape_art_host(
            data,
            &url,
            r"pixiv\.net/(?:en/)?users/(\d+)",
            |uid| format!("https://www.pixiv.net/en/users/{uid}"),
            "Pixiv",
        ),
        Platform::ArtStation => scrape_art_host(
            data,
            &url,
            r"artstation\.com/([^/?#]+)",
            |h| format!("https://www.artstation.com/{h}"),
            "ArtStation",
        ),
        Platform::DeviantArt => scrape_art_host(
            data,
            &url,
            r"deviantart\.com/([^/?#]+)",
            |h| format!("https://www.deviantart.com/{h}"),
            "DeviantArt",
        ),
        Platform::Behance => scrape_slug_host(
            data,
            &url,
            r"behance\.net/([^/?#]+)",
            |h| format!("https://behance.net/{h}"),
            "Behance",
        ),
        Platform::Bluesky => scrape_bluesky(data, &url),
        Platform::Cara => scrape_slug_host(
            data,
            &url,
            r"cara\.app/([^/?#]+)",
            |h| format!("https://cara.app/{h}"),
            "Cara",
        ),
        Platform::Tumblr => scrape_slug_host(
            data,
            &url,
            r"([^./]+)\.tumblr\.com",
            |h| format!("https://{h}.tumblr.com"),
            "Tumblr",
        ),
        Platform::Reddit => scrape_reddit(data, &url),
        Platform::Pinterest => scrape_pinterest(data, &url),
    }
}

/// Meta prefixes consulted by platform rules: bare name, then og:, twitter:.
const META_PREFIXES: &[&str] = &["og:", "twitter:"];

fn page_title<'a>(data: &'a PageData) -> &'a str {
    data.meta("title", META_PREFIXES)
        .unwrap_or(&data.page_title)
}

/// First JSON-LD block carrying an `author.name`, as a plain string.
fn json_ld_author(data: &PageData) -> Option<String> {
    data.json_ld
        .iter()
        .find_map(|block| block.get("author")?.get("name")?.as_str())
        .map(ToString::to_string)
}

fn scrape_twitter(data: &PageData, url: &str) -> Option<ScrapedIdentity> {
    let title = page_title(data);
    let name = Regex::new(r"(?i)^(.+?)\s+on\s+(?:X|Twitter)")
        .ok()?
        .captures(title)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string());
    let handle = Regex::new(r"(?:twitter|x)\.com/([^/?#]+)/status")
        .ok()?
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    if name.is_none() && handle.is_none() {
        return None;
    }

    let display_handle = handle.as_ref().map(|h| format!("@{h}"));
    let socials = handle
        .as_ref()
        .map(|h| {
            vec![Social::with_handle(
                "Twitter/X",
                format!("https://x.com/{h}"),
                format!("@{h}"),
            )]
        })
        .unwrap_or_default();

    Some(ScrapedIdentity {
        author: name.or_else(|| display_handle.clone())?,
        display_handle,
        socials,
        source: "Twitter/X",
        url: url.to_string(),
    })
}

fn scrape_instagram(data: &PageData, url: &str) -> Option<ScrapedIdentity> {
    let title = page_title(data);
    let handle = Regex::new(r"@([\w.]+)")
        .ok()?
        .captures(title)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    let name = Regex::new(r"^([^•(@\n]+)")
        .ok()?
        .captures(title)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|n| !n.is_empty());

    if handle.is_none() && name.is_none() {
        return None;
    }

    let display_handle = handle.as_ref().map(|h| format!("@{h}"));
    let socials = handle
        .as_ref()
        .map(|h| vec![Social::new("Instagram", format!("https://instagram.com/{h}"))])
        .unwrap_or_default();

    Some(ScrapedIdentity {
        author: name.or_else(|| display_handle.clone())?,
        display_handle,
        socials,
        source: "Instagram",
        url: url.to_string(),
    })
}

/// Art hosts where the author comes from JSON-LD or author meta and the
/// profile URL is rebuilt from an id/slug in the canonical URL.
fn scrape_art_host(
    data: &PageData,
    url: &str,
    id_pattern: &str,
    profile_url: impl Fn(&str) -> String,
    source: &'static str,
) -> Option<ScrapedIdentity> {
    let author = json_ld_author(data).or_else(|| {
        data.meta("author", META_PREFIXES)
            .map(ToString::to_string)
    })?;

    let socials = Regex::new(id_pattern)
        .ok()?
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|id| *id != "artwork" && *id != "tag")
        .map(|id| vec![Social::new(source, profile_url(id))])
        .unwrap_or_default();

    Some(ScrapedIdentity {
        author,
        display_handle: None,
        socials,
        source,
        url: url.to_string(),
    })
}

/// Hosts where the URL slug itself is an acceptable author fallback.
fn scrape_slug_host(
    data: &PageData,
    url: &str,
    slug_pattern: &str,
    profile_url: impl Fn(&str) -> String,
    source: &'static str,
) -> Option<ScrapedIdentity> {
    let slug = Regex::new(slug_pattern)
        .ok()?
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    let author = data
        .meta("author", META_PREFIXES)
        .map(ToString::to_string)
        .or_else(|| slug.clone())?;

    let socials = slug
        .map(|s| vec![Social::new(source, profile_url(&s))])
        .unwrap_or_default();

    Some(ScrapedIdentity {
        author,
        display_handle: None,
        socials,
        source,
        url: url.to_string(),
    })
}

fn scrape_bluesky(data: &PageData, url: &str) -> Option<ScrapedIdentity> {
    let handle = Regex::new(r"bsky\.app/profile/([^/?#]+)")
        .ok()?
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    let author = Regex::new(r"^([^|:–—\n]+)")
        .ok()?
        .captures(page_title(data))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|n| !n.is_empty())
        .or_else(|| handle.clone())?;

    let socials = handle
        .map(|h| vec![Social::new("Bluesky", format!("https://bsky.app/profile/{h}"))])
        .unwrap_or_default();

    Some(ScrapedIdentity {
        author,
        display_handle: None,
        socials,
        source: "Bluesky",
        url: url.to_string(),
    })
}

fn scrape_reddit(data: &PageData, url: &str) -> Option<ScrapedIdentity> {
    // Reddit strips credits; the post title is the only reliable signal.
    let title = page_title(data);
    let user = Regex::new(r"(?i)(?:by|art by|artist:|drawn by|OC by|photo by)\s*u?/?([\w-]+)")
        .ok()?
        .captures(title)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())?;

    Some(ScrapedIdentity {
        author: format!("u/{user}"),
        display_handle: None,
        socials: vec![Social::new("Reddit", format!("https://reddit.com/user/{user}"))],
        source: "Reddit title",
        url: url.to_string(),
    })
}

fn scrape_pinterest(data: &PageData, url: &str) -> Option<ScrapedIdentity> {
    let desc = data.meta("description", META_PREFIXES).unwrap_or("");
    let author = Regex::new(r"(?i)(?:by|from|via|artist)\s+([A-Za-z0-9_\-.@ ]{2,40})")
        .ok()?
        .captures(desc)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())?;

    Some(ScrapedIdentity {
        author,
        display_handle: None,
        socials: Vec::new(),
        source: "Pinterest",
        url: url.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_with_title(title: &str) -> PageData {
        PageData {
            page_title: title.to_string(),
            ..PageData::default()
        }
    }

    #[test]
    fn test_detect_platform() {
        assert_eq!(
            detect_platform("https://x.com/alice/status/123"),
            Some(Platform::Twitter)
        );
        assert_eq!(
            detect_platform("https://www.pixiv.net/en/artworks/456"),
            Some(Platform::Pixiv)
        );
        assert_eq!(
            detect_platform("https://alice.tumblr.com/post/1"),
            Some(Platform::Tumblr)
        );
        assert_eq!(detect_platform("https://example.com/image.png"), None);
    }

    #[test]
    fn test_twitter_scrape_name_and_handle() {
        let data = data_with_title("Alice Doe on X");
        let id = platform_scrape(&data, Platform::Twitter, "https://x.com/alice/status/123")
            .unwrap();

        assert_eq!(id.author, "Alice Doe");
        assert_eq!(id.display_handle.as_deref(), Some("@alice"));
        assert_eq!(id.socials[0].url, "https://x.com/alice");
        assert_eq!(id.socials[0].handle.as_deref(), Some("@alice"));
    }

    #[test]
    fn test_twitter_scrape_handle_only() {
        let data = data_with_title("Photos and videos");
        let id = platform_scrape(&data, Platform::Twitter, "https://twitter.com/bob/status/9")
            .unwrap();

        assert_eq!(id.author, "@bob");
    }

    #[test]
    fn test_twitter_scrape_no_signal() {
        let data = data_with_title("Home");
        assert!(platform_scrape(&data, Platform::Twitter, "https://x.com/home").is_none());
    }

    #[test]
    fn test_pixiv_json_ld_author() {
        let mut data = PageData::default();
        data.json_ld
            .push(serde_json::json!({ "author": { "name": "さくら" } }));
        data.canonical = Some("https://www.pixiv.net/en/users/42/artworks".to_string());

        let id = platform_scrape(&data, Platform::Pixiv, "https://www.pixiv.net/en/artworks/7")
            .unwrap();
        assert_eq!(id.author, "さくら");
        assert_eq!(id.socials[0].url, "https://www.pixiv.net/en/users/42");
    }

    #[test]
    fn test_artstation_skips_artwork_path_for_profile() {
        let mut data = PageData::default();
        data.meta_tags
            .insert("author".to_string(), "Carla B".to_string());

        let id = platform_scrape(
            &data,
            Platform::ArtStation,
            "https://www.artstation.com/artwork/abc",
        )
        .unwrap();
        assert_eq!(id.author, "Carla B");
        assert!(id.socials.is_empty());
    }

    #[test]
    fn test_reddit_title_credit() {
        let data = data_with_title("[OC] Sunrise over the bay, art by some_artist");
        let id = platform_scrape(
            &data,
            Platform::Reddit,
            "https://reddit.com/r/Art/comments/1",
        )
        .unwrap();

        assert_eq!(id.author, "u/some_artist");
        assert_eq!(id.socials[0].url, "https://reddit.com/user/some_artist");
    }

    #[test]
    fn test_tumblr_subdomain_fallback() {
        let data = PageData::default();
        let id = platform_scrape(&data, Platform::Tumblr, "https://alice.tumblr.com/post/1")
            .unwrap();

        assert_eq!(id.author, "alice");
        assert_eq!(id.socials[0].url, "https://alice.tumblr.com");
    }

    #[test]
    fn test_canonical_preferred_over_page_url() {
        let mut data = data_with_title("Alice Doe on X");
        data.canonical = Some("https://x.com/alice/status/123".to_string());

        let id = platform_scrape(&data, Platform::Twitter, "https://t.co/short").unwrap();
        assert_eq!(id.url, "https://x.com/alice/status/123");
    }
}
