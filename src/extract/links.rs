//! Anchor extraction for the link processor

use crate::extract::{element_text, parent_text, selector};
use crate::url::is_http_scheme;
use scraper::Html;
use std::collections::HashSet;
use url::Url;

/// A followable anchor found on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// Absolute URL (fragment kept; normalization happens later)
    pub url: String,

    /// Visible anchor text, used as the description of downloaded documents
    pub text: String,

    /// Text of the anchor's parent element
    pub context: String,
}

/// Collects every followable `<a href>` on the page
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` anywhere in the document, including `download` links
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` links and data URIs
/// - Fragment-only links (same-page anchors)
/// - Anything that is not HTTP(S) after resolution
///
/// Exact repeats of the same resolved URL are reported once, at their first
/// position.
pub fn collect_anchors(document: &Html, base_url: &Url) -> Vec<Anchor> {
    let Some(a_selector) = selector("a[href]") else {
        return Vec::new();
    };

    let mut emitted = HashSet::new();
    let mut anchors = Vec::new();

    for element in document.select(&a_selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };

        let Some(url) = resolve_link(href, base_url) else {
            continue;
        };

        if !emitted.insert(url.clone()) {
            continue;
        }

        anchors.push(Anchor {
            url,
            text: element_text(element),
            context: parent_text(element, 1),
        });
    }

    anchors
}

/// Resolves an href to an absolute URL, or None if it should be skipped
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    base_url
        .join(href)
        .ok()
        .filter(is_http_scheme)
        .map(|url| url.to_string())
}
