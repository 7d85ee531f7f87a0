//! [`PageData`] extraction from raw HTML.
//!
//! Callers that already hold a structured snapshot pass it straight to the
//! pipeline; callers that only have the page markup (e.g. the HTTP surface
//! receiving `pageHtml`) use this to build one.

use regex::Regex;
use scraper::{Html, Selector};

use super::error::AttributionError;
use super::types::PageData;

/// Maximum nearby links kept in a snapshot.
const MAX_NEARBY_LINKS: usize = 20;

/// Hosts worth keeping as "nearby links" for the context scraper.
const NEARBY_LINK_PATTERN: &str =
    r"pixiv|artstation|deviantart|twitter|x\.com|instagram|tumblr|cara\.app|bsky\.app|behance|flickr|500px";

/// Build a [`PageData`] snapshot from a raw HTML document.
///
/// # Errors
/// Returns an error only when an internal selector fails to parse; malformed
/// input HTML never fails (the parser is lenient).
pub fn from_html(html: &str) -> Result<PageData, AttributionError> {
    let document = Html::parse_document(html);
    let mut data = PageData::default();

    let meta_selector = selector("meta[name], meta[property]")?;
    for element in document.select(&meta_selector) {
        let key = element
            .value()
            .attr("name")
            .or_else(|| element.value().attr("property"));
        if let Some(key) = key {
            let content = element.value().attr("content").unwrap_or_default();
            data.meta_tags.insert(key.to_string(), content.to_string());
        }
    }

    let ld_selector = selector(r#"script[type="application/ld+json"]"#)?;
    for element in document.select(&ld_selector) {
        let text: String = element.text().collect();
        match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(serde_json::Value::Array(items)) => data.json_ld.extend(items),
            Ok(value) => data.json_ld.push(value),
            // Broken ld+json blocks are common in the wild; skip them.
            Err(e) => tracing::debug!("Skipping unparseable ld+json block: {e}"),
        }
    }

    let nearby_re = Regex::new(NEARBY_LINK_PATTERN)?;
    let anchor_selector = selector("a[href]")?;
    data.nearby_links = document
        .select(&anchor_selector)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| nearby_re.is_match(href))
        .map(ToString::to_string)
        .take(MAX_NEARBY_LINKS)
        .collect();

    let title_selector = selector("title")?;
    data.page_title = document
        .select(&title_selector)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let canonical_selector = selector(r#"link[rel="canonical"]"#)?;
    data.canonical = document
        .select(&canonical_selector)
        .next()
        .and_then(|l| l.value().attr("href"))
        .map(ToString::to_string);

    Ok(data)
}

fn selector(css: &str) -> Result<Selector, AttributionError> {
    Selector::parse(css).map_err(|e| AttributionError::HtmlParse(format!("Invalid selector: {e:?}")))
}
