//! Generic metadata fallback scraper.
//!
//! Platform-agnostic extraction used when no platform rule applies or the
//! platform rule found nothing: JSON-LD author fields first, then generic
//! author meta tags. Nearby links are only promoted to socials when their
//! host matches a curated creator-platform list, so unrelated links on the
//! page can't produce a false attribution.

use url::Url;

use super::normalize::dedupe_socials;
use super::platform::ScrapedIdentity;
use super::types::{PageData, Social};

/// Hosts that indicate a creator profile rather than an arbitrary link.
const ARTIST_HOSTS: &[&str] = &[
    "twitter.com",
    "x.com",
    "instagram.com",
    "artstation.com",
    "deviantart.com",
    "pixiv.net",
    "behance.net",
    "tumblr.com",
    "cara.app",
    "bsky.app",
];

/// Meta prefixes consulted for the author lookup.
const META_PREFIXES: &[&str] = &["og:", "article:"];

/// Extract an author from platform-agnostic page metadata.
///
/// Returns `None` when neither JSON-LD nor author meta tags identify anyone.
#[must_use]
pub fn context_scrape(data: &PageData, page_url: &str) -> Option<ScrapedIdentity> {
    // JSON-LD author may be an object with a name, or a bare string.
    let ld_block = data.json_ld.iter().find(|block| {
        let author = block.get("author");
        author
            .map(|a| a.get("name").and_then(|n| n.as_str()).is_some() || a.is_string())
            .unwrap_or(false)
    });
    let ld_author = ld_block.and_then(|block| {
        let author = block.get("author")?;
        author
            .get("name")
            .and_then(|n| n.as_str())
            .or_else(|| author.as_str())
            .map(ToString::to_string)
    });

    let author = ld_author.or_else(|| {
        data.meta("author", META_PREFIXES)
            .map(ToString::to_string)
    })?;

    let mut socials = Vec::new();
    if let Some(author_url) = ld_block
        .and_then(|block| block.get("author")?.get("url")?.as_str())
    {
        if let Some(host) = host_of(author_url) {
            socials.push(Social::new(host, author_url));
        }
    }
    for href in &data.nearby_links {
        if let Some(host) = host_of(href) {
            if ARTIST_HOSTS.iter().any(|d| host.contains(d)) {
                socials.push(Social::new(host, href));
            }
        }
    }

    Some(ScrapedIdentity {
        author,
        display_handle: None,
        socials: dedupe_socials(socials),
        source: "Page metadata",
        url: page_url.to_string(),
    })
}

/// Hostname with any leading "www." stripped; `None` for unparseable URLs.
fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .host_str()
        .map(|h| h.trim_start_matches("www.").to_string())
}
