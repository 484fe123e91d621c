//! HTML parsing for link and title extraction
//!
//! Candidate links are collected raw, exactly as they appear in the markup;
//! promotion to absolute URLs and all policy decisions happen later in the
//! admission filter.

use scraper::{Html, Selector};

/// Extracts the `<title>` text from an HTML document
///
/// Used both for logging and for recognizing Cloudflare challenge pages by
/// their title.
pub fn page_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").ok()?;

    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty())
}

/// Collects candidate link targets from an HTML document
///
/// Candidates come from every `<a href>` and `<img src>` attribute,
/// unfiltered. Out-of-scope and malformed values are rejected downstream by
/// the admission filter.
pub fn candidate_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut candidates = Vec::new();

    if let Ok(selector) = Selector::parse("a[href]") {
        for element in document.select(&selector) {
            if let Some(href) = element.value().attr("href") {
                candidates.push(href.to_string());
            }
        }
    }

    if let Ok(selector) = Selector::parse("img[src]") {
        for element in document.select(&selector) {
            if let Some(src) = element.value().attr("src") {
                candidates.push(src.to_string());
            }
        }
    }

    candidates
}
