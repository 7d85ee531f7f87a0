//! Yandex Images results parser.
//!
//! Works over the rendered HTML of a `yandex.com/images/search?rpt=imageview`
//! page. Two signals: the vision-detected entity block (a subject name) and
//! the "sites with this image" list.

use regex::Regex;
use scraper::{Html, Selector};

use crate::attribution::types::{CandidateRecord, Method, Social};

/// Selector whose presence means results have populated.
const READY_SELECTOR: &str = ".CbirSites-Item, .cbir-section, [class*='cbir'], .CbirObject";
/// Vision entity title.
const ENTITY_SELECTOR: &str =
    ".CbirObject-Title, [class*='CbirObject'] [class*='Title'], .CbirObjectResponse-Title";
/// "Sites with this image" blocks.
const SITES_SELECTOR: &str = ".CbirSites-Item, [class*='SiteItem'], .cbir-section__sites .site";
/// Title element inside one site block.
const SITE_TITLE_SELECTOR: &str = "[class*='Title'], [class*='title'], h3";

/// Confidence for a vision-detected entity.
const CONF_ENTITY: u8 = 70;
/// Confidence for a site hit with a resolved author.
const CONF_SITE_AUTHOR: u8 = 68;
/// Confidence for a site hit without one.
const CONF_SITE: u8 = 52;

/// Maximum candidates returned from one Yandex page.
const MAX_RESULTS: usize = 5;
/// Length of the local dedupe key.
const DEDUPE_KEY_LEN: usize = 60;

/// True once the results containers exist in the document.
#[must_use]
pub fn ready(html: &str) -> bool {
    let document = Html::parse_document(html);
    Selector::parse(READY_SELECTOR)
        .map(|sel| document.select(&sel).next().is_some())
        .unwrap_or(false)
}

/// Parse candidates out of a rendered Yandex results page.
#[must_use]
pub fn parse(html: &str) -> Vec<CandidateRecord> {
    let document = Html::parse_document(html);
    let mut results = Vec::new();

    if let Ok(entity_sel) = Selector::parse(ENTITY_SELECTOR) {
        if let Some(entity) = document.select(&entity_sel).next() {
            let name = entity.text().collect::<String>().trim().to_string();
            if !name.is_empty() {
                results.push(CandidateRecord {
                    author: Some(name),
                    display_handle: None,
                    title: None,
                    url: None,
                    author_url: None,
                    confidence: CONF_ENTITY,
                    socials: Vec::new(),
                    source: "Yandex Vision".to_string(),
                    method: Method::Yandex,
                });
            }
        }
    }

    let (Ok(sites_sel), Ok(title_sel), Ok(anchor_sel)) = (
        Selector::parse(SITES_SELECTOR),
        Selector::parse(SITE_TITLE_SELECTOR),
        Selector::parse("a[href]"),
    ) else {
        return results;
    };

    for item in document.select(&sites_sel) {
        let Some(anchor) = item.select(&anchor_sel).next() else {
            continue;
        };
        let href = anchor.value().attr("href").unwrap_or_default();
        if !href.starts_with("http") {
            continue;
        }

        let title = item
            .select(&title_sel)
            .next()
            .map(|t| t.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| anchor.text().collect::<String>().trim().to_string());
        let host = host_of(href);

        let by_author = capture(
            r"\bby\s+([A-Z][a-zA-ZÀ-ÖØ-öø-ÿ\s\-'.]{1,35})(?:[,.|–—]|$)",
            &title,
        );
        // Wikipedia-style: "Caravaggio - Wikipedia" → "Caravaggio".
        let title_author = encyclopedic(&host)
            .then(|| subject_of(&title))
            .flatten()
            .filter(|s| s.len() < 60);

        let author = by_author.or(title_author);
        let confidence = if author.is_some() {
            CONF_SITE_AUTHOR
        } else {
            CONF_SITE
        };
        let title_field = if author.is_some() {
            None
        } else {
            let t: String = title.chars().take(80).collect();
            (!t.is_empty()).then_some(t)
        };

        results.push(CandidateRecord {
            author,
            display_handle: None,
            title: title_field,
            url: Some(href.to_string()),
            author_url: Some(href.to_string()),
            confidence,
            socials: vec![Social::new(host_label(&host), href)],
            source: "Yandex Images".to_string(),
            method: Method::Yandex,
        });
    }

    results.sort_by(|a, b| b.confidence.cmp(&a.confidence));

    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for record in results {
        let key: String = record
            .author
            .as_deref()
            .or(record.title.as_deref())
            .unwrap_or_default()
            .to_lowercase()
            .chars()
            .take(DEDUPE_KEY_LEN)
            .collect();
        if !key.is_empty() && seen.insert(key) {
            out.push(record);
        }
    }
    out.truncate(MAX_RESULTS);
    out
}

fn encyclopedic(host: &str) -> bool {
    ["wikipedia.org", "wikiart.org", "britannica.com"]
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")))
}

/// First dash-separated segment of a title.
fn subject_of(title: &str) -> Option<String> {
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
    url::Url::parse(href)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_default()
}

fn host_label(host: &str) -> String {
    const LABELS: &[(&str, &str)] = &[
        ("x.com", "Twitter/X"),
        ("twitter.com", "Twitter/X"),
        ("instagram.com", "Instagram"),
        ("pixiv.net", "Pixiv"),
        ("artstation.com", "ArtStation"),
        ("deviantart.com", "DeviantArt"),
        ("wikipedia.org", "Wikipedia"),
        ("wikiart.org", "WikiArt"),
        ("britannica.com", "Britannica"),
    ];
    LABELS
        .iter()
        .find(|(d, _)| host == *d || host.ends_with(&format!(".{d}")))
        .map_or_else(|| host.to_string(), |(_, label)| (*label).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS_PAGE: &str = r#"
        <html><body>
          <div class="CbirObject">
            <div class="CbirObject-Title">Vincent van Gogh</div>
          </div>
          <ul>
            <li class="CbirSites-Item">
              <a href="https://en.wikipedia.org/wiki/The_Starry_Night">
                <div class="CbirSites-ItemTitle">The Starry Night - Wikipedia</div>
              </a>
            </li>
            <li class="CbirSites-Item">
              <a href="https://gallery.example.com/print">
                <h3>Lakeside study by Nina Petrov, watercolor</h3>
              </a>
            </li>
            <li class="CbirSites-Item">
              <a href="/relative/ignored"><h3>relative link</h3></a>
            </li>
          </ul>
        </body></html>
    "#;

    #[test]
    fn test_ready_needs_results_container() {
        assert!(ready(RESULTS_PAGE));
        assert!(!ready("<html><body><p>Checking your browser</p></body></html>"));
    }

    #[test]
    fn test_parse_vision_entity_first() {
        let records = parse(RESULTS_PAGE);
        assert_eq!(records[0].author.as_deref(), Some("Vincent van Gogh"));
        assert_eq!(records[0].confidence, CONF_ENTITY);
        assert_eq!(records[0].source, "Yandex Vision");
        assert!(records[0].socials.is_empty());
    }

    #[test]
    fn test_parse_wikipedia_title_subject() {
        let records = parse(RESULTS_PAGE);
        let wiki = records
            .iter()
            .find(|r| r.author.as_deref() == Some("The Starry Night"))
            .unwrap();
        assert_eq!(wiki.confidence, CONF_SITE_AUTHOR);
        assert_eq!(wiki.socials[0].label, "Wikipedia");
    }

    #[test]
    fn test_parse_by_pattern() {
        let records = parse(RESULTS_PAGE);
        let site = records
            .iter()
            .find(|r| r.author.as_deref() == Some("Nina Petrov"))
            .unwrap();
        assert_eq!(site.confidence, CONF_SITE_AUTHOR);
        assert_eq!(
            site.url.as_deref(),
            Some("https://gallery.example.com/print")
        );
    }

    #[test]
    fn test_parse_skips_relative_links() {
        let records = parse(RESULTS_PAGE);
        assert!(records
            .iter()
            .all(|r| r.url.as_deref().map_or(true, |u| u.starts_with("http"))));
    }

    #[test]
    fn test_parse_dedupes_on_text_key() {
        let html = r#"
          <div class="CbirSites-Item"><a href="https://a.example/1"><h3>Same title</h3></a></div>
          <div class="CbirSites-Item"><a href="https://b.example/2"><h3>same TITLE</h3></a></div>
        "#;
        assert_eq!(parse(html).len(), 1);
    }

    #[test]
    fn test_parse_caps_results() {
        let mut html = String::new();
        for i in 0..8 {
            html.push_str(&format!(
                r#"<div class="CbirSites-Item"><a href="https://s{i}.example/p"><h3>Unique artwork {i}</h3></a></div>"#
            ));
        }
        assert_eq!(parse(&html).len(), MAX_RESULTS);
    }
}
