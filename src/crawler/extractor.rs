//! Link extraction from HTML pages

use scraper::{Html, Selector};
use url::Url;

/// Extracts anchor links from `html`, resolved against `page_url` and kept only
/// when they fall under the scan `root` prefix
pub fn find_links(root: &str, page_url: &str, html: &str) -> Vec<String> {
    let base = match Url::parse(page_url) {
        Ok(u) => u,
        Err(_) => return Vec::new(),
    };

    let document = Html::parse_document(html);
    let selector = match Selector::parse("a[href]") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| resolve_link(&base, href))
        .filter(|link| link.starts_with(root))
        .collect()
}

/// Resolves a `Location` header value the same way an anchor would be
pub fn resolve_location(root: &str, page_url: &str, location: &str) -> Option<String> {
    let base = Url::parse(page_url).ok()?;
    resolve_link(&base, location).filter(|link| link.starts_with(root))
}

/// Resolves a potentially relative link against the page it was found on
fn resolve_link(base: &Url, raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let lower = trimmed.to_ascii_lowercase();

    if trimmed.is_empty() || lower.starts_with("mailto:") || lower.starts_with("javascript:") {
        return None;
    }

    let mut resolved = base.join(trimmed).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    resolved.set_fragment(None);

    Some(resolved.to_string())
}
