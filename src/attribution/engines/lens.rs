//! Google Lens results parser.
//!
//! Works over the rendered HTML of a `lens.google.com/uploadbyurl` results
//! page. Self-contained: no access to pipeline state, testable against
//! static fixtures.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::attribution::types::{CandidateRecord, Method, Social};

/// Results are considered populated once this many off-Google anchors exist.
const READY_MIN_OFFSITE_ANCHORS: usize = 4;
/// Maximum candidates returned from one Lens page.
const MAX_RESULTS: usize = 6;

/// Confidence: known artist-hosting platform with a resolved author.
const CONF_ARTIST_HOST: u8 = 82;
/// Confidence: encyclopedic host with a resolved author.
const CONF_ENCYCLOPEDIC: u8 = 78;
/// Confidence: any other host with a resolved author.
const CONF_GENERIC_AUTHOR: u8 = 65;
/// Confidence: encyclopedic host, no author resolved.
const CONF_ENCYCLOPEDIC_NO_AUTHOR: u8 = 60;
/// Confidence: floor for anything else.
const CONF_FLOOR: u8 = 50;

const ARTIST_HOSTS: &[&str] = &[
    "x.com",
    "twitter.com",
    "instagram.com",
    "pixiv.net",
    "artstation.com",
    "deviantart.com",
    "behance.net",
    "flickr.com",
];

const ENCYCLOPEDIC_HOSTS: &[&str] = &[
    "wikipedia.org",
    "britannica.com",
    "wikiart.org",
    "metmuseum.org",
    "louvre.fr",
    "moma.org",
    "tate.org.uk",
    "uffizi.it",
    "nationalgallery.org.uk",
    "rijksmuseum.nl",
    "nga.gov",
];

/// True once the page shows enough off-Google anchors to be worth parsing.
#[must_use]
pub fn ready(html: &str) -> bool {
    let document = Html::parse_document(html);
    let Ok(anchors) = Selector::parse("a[href]") else {
        return false;
    };
    document
        .select(&anchors)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| !is_chrome_href(href))
        .count()
        >= READY_MIN_OFFSITE_ANCHORS
}

/// Parse candidates out of a rendered Lens results page.
#[must_use]
pub fn parse(html: &str) -> Vec<CandidateRecord> {
    let document = Html::parse_document(html);
    let Ok(anchors) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen_hrefs = std::collections::HashSet::new();
    let mut raw = Vec::new();

    for anchor in document.select(&anchors) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if is_chrome_href(href) || !seen_hrefs.insert(href.to_string()) {
            continue;
        }

        let title = best_title(anchor);
        let host = host_of(href);
        let Extracted {
            author,
            author_url,
            display_handle,
        } = extract_author(&title, href);

        let artist_host = matches_any(&host, ARTIST_HOSTS);
        let encyclopedic = matches_any(&host, ENCYCLOPEDIC_HOSTS);
        let confidence = if author.is_some() {
            if artist_host {
                CONF_ARTIST_HOST
            } else if encyclopedic {
                CONF_ENCYCLOPEDIC
            } else {
                CONF_GENERIC_AUTHOR
            }
        } else if encyclopedic {
            CONF_ENCYCLOPEDIC_NO_AUTHOR
        } else {
            CONF_FLOOR
        };

        let social_url = author_url.clone().unwrap_or_else(|| href.to_string());
        let title_field = if author.is_some() {
            None
        } else {
            let t: String = title.chars().take(80).collect();
            (!t.is_empty()).then_some(t)
        };

        raw.push(CandidateRecord {
            author,
            display_handle: display_handle.clone(),
            title: title_field,
            url: Some(href.to_string()),
            author_url,
            confidence,
            socials: vec![Social {
                label: host_label(&host),
                url: social_url,
                handle: display_handle,
            }],
            source: "Google Lens".to_string(),
            method: Method::Lens,
        });
    }

    // Authored results first, then confidence within each group.
    raw.sort_by_key(|r| (r.author.is_none(), std::cmp::Reverse(r.confidence)));

    let mut seen_urls = std::collections::HashSet::new();
    raw.retain(|r| {
        let key = r.author_url.clone().or_else(|| r.url.clone()).unwrap_or_default();
        seen_urls.insert(key)
    });
    raw.truncate(MAX_RESULTS);
    raw
}

/// Google's own navigation/asset links, plus degenerate hosts.
fn is_chrome_href(href: &str) -> bool {
    match Url::parse(href) {
        Ok(url) => match url.host_str() {
            Some(host) => host.contains("google") || host.contains("gstatic") || host.len() < 5,
            None => true,
        },
        Err(_) => true,
    }
}

/// Best available title for an anchor: nested heading, then a heading on a
/// result-container ancestor, then accessible label, then title attribute,
/// then the visible text when short enough to be a title.
fn best_title(anchor: ElementRef<'_>) -> String {
    let h3 = Selector::parse("h3").ok();
    if let Some(ref h3) = h3 {
        if let Some(heading) = anchor.select(h3).next() {
            return collect_text(heading);
        }
        for node in anchor.ancestors().take(4) {
            let Some(element) = ElementRef::wrap(node) else {
                continue;
            };
            let is_container = ["data-action-url", "jsaction", "data-ved"]
                .iter()
                .any(|attr| element.value().attr(attr).is_some());
            if is_container {
                if let Some(heading) = element.select(h3).next() {
                    return collect_text(heading);
                }
            }
        }
    }
    if let Some(label) = anchor.value().attr("aria-label") {
        return label.trim().to_string();
    }
    if let Some(title) = anchor.value().attr("title") {
        return title.trim().to_string();
    }
    let text = collect_text(anchor);
    if text.len() < 200 {
        text
    } else {
        String::new()
    }
}

fn collect_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

struct Extracted {
    author: Option<String>,
    author_url: Option<String>,
    display_handle: Option<String>,
}

/// Per-host identity extraction from a title string and destination URL.
fn extract_author(title: &str, href: &str) -> Extracted {
    let mut out = Extracted {
        author: None,
        author_url: Some(href.to_string()),
        display_handle: None,
    };
    let Ok(url) = Url::parse(href) else {
        return out;
    };
    let host = url
        .host_str()
        .unwrap_or_default()
        .trim_start_matches("www.")
        .to_string();
    let segments: Vec<&str> = url
        .path()
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    if host == "x.com" || host == "twitter.com" {
        if let Some(handle) = segments.first().filter(|h| {
            !["i", "search", "home", "explore", "hashtag"].contains(*h)
        }) {
            let name = capture(r"(?i)^Post by (.+?) on (?:X|Twitter)", title)
                .or_else(|| capture(r"(?i)^(.+?)\s+on (?:X|Twitter)", title));
            out.author = Some(name.unwrap_or_else(|| format!("@{handle}")));
            out.display_handle = Some(format!("@{handle}"));
            out.author_url = Some(format!("https://x.com/{handle}"));
        }
    } else if host == "instagram.com" {
        if let Some(slug) = segments.first().filter(|s| {
            !["p", "reel", "stories", "explore", "accounts"].contains(*s)
        }) {
            out.display_handle = Some(format!("@{slug}"));
            out.author_url = Some(format!("https://instagram.com/{slug}"));
            out.author = capture(r"^([^•(@|\n]{2,40})", title)
                .or_else(|| out.display_handle.clone());
        }
    } else if host == "pixiv.net" {
        if let Some(uid) = capture(r"users/(\d+)", url.path()) {
            out.author_url = Some(format!("https://www.pixiv.net/en/users/{uid}"));
        }
        out.author = capture(r"^(.+?)\s*[-–|·]", title);
    } else if host == "artstation.com" {
        if let Some(slug) = segments.first().filter(|s| **s != "artwork") {
            out.author_url = Some(format!("https://www.artstation.com/{slug}"));
            out.author =
                capture(r"^(.+?)\s*[-–|·]", title).or_else(|| Some((*slug).to_string()));
            out.display_handle = Some((*slug).to_string());
        }
    } else if host == "deviantart.com" {
        if let Some(slug) = segments.first().filter(|s| **s != "tag") {
            out.author = Some((*slug).to_string());
            out.display_handle = Some((*slug).to_string());
            out.author_url = Some(format!("https://deviantart.com/{slug}"));
        }
    } else if matches_any(&host, &["wikipedia.org", "britannica.com", "wikiart.org"]) {
        // "Caravaggio - Wikipedia" → "Caravaggio"; skip list/category pages
        // and over-long subjects that are artwork titles, not names.
        if let Some(subject) = split_subject(title) {
            if subject.len() > 1
                && subject.len() < 60
                && capture(r"(?i)^(list|category|talk|file|help)", &subject).is_none()
            {
                out.author = Some(subject);
            }
        }
    }

    // Generic "by Name" pattern.
    if out.author.is_none() {
        out.author = capture(
            r"\bby\s+([A-Z][a-zA-ZÀ-ÖØ-öø-ÿ\s\-'.]{1,35})(?:\s*[,|–—·]|\s*$)",
            title,
        );
    }
    out
}

/// First dash-separated segment of an encyclopedia-style title.
fn split_subject(title: &str) -> Option<String> {
    Regex::new(r"\s[-–—|]\s")
        .ok()?
        .split(title)
        .next()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn capture(pattern: &str, text: &str) -> Option<String> {
    Regex::new(pattern)
        .ok()?
        .captures(text)?
        .get(1)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn host_of(href: &str) -> String {
    Url::parse(href)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_default()
}

/// Exact-or-subdomain host match.
fn matches_any(host: &str, domains: &[&str]) -> bool {
    domains
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")))
}

/// Friendly label for a known host, bare hostname otherwise.
fn host_label(host: &str) -> String {
    const LABELS: &[(&str, &str)] = &[
        ("x.com", "Twitter/X"),
        ("twitter.com", "Twitter/X"),
        ("instagram.com", "Instagram"),
        ("pixiv.net", "Pixiv"),
        ("artstation.com", "ArtStation"),
        ("deviantart.com", "DeviantArt"),
        ("pinterest.com", "Pinterest"),
        ("reddit.com", "Reddit"),
        ("tumblr.com", "Tumblr"),
        ("behance.net", "Behance"),
        ("flickr.com", "Flickr"),
        ("500px.com", "500px"),
        ("wikipedia.org", "Wikipedia"),
        ("britannica.com", "Britannica"),
        ("wikiart.org", "WikiArt"),
        ("metmuseum.org", "The Met"),
        ("louvre.fr", "Louvre"),
        ("uffizi.it", "Uffizi"),
        ("nationalgallery.org.uk", "National Gallery"),
        ("rijksmuseum.nl", "Rijksmuseum"),
        ("moma.org", "MoMA"),
        ("tate.org.uk", "Tate"),
        ("nga.gov", "NGA"),
    ];
    LABELS
        .iter()
        .find(|(d, _)| matches_any(host, &[d]))
        .map_or_else(|| host.to_string(), |(_, label)| (*label).to_string())
}
