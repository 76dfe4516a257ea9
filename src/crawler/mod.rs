//! Web crawler for URL discovery
//!
//! Breadth-first traversal bounded by depth. Each URL is fetched at most once;
//! fetch failures are logged and the URL stays visited so it is never retried.

pub mod extractor;

use crate::http::Transport;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, info};

/// A queued URL together with the depth it was discovered at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlItem {
    pub url: String,
    pub depth: u32,
}

/// Sequential BFS crawler restricted to URLs under the scan root
pub struct Crawler<'a> {
    transport: &'a dyn Transport,
    root: String,
    max_depth: u32,
}

impl<'a> Crawler<'a> {
    pub fn new(transport: &'a dyn Transport, root: impl Into<String>, max_depth: u32) -> Self {
        Self {
            transport,
            root: root.into(),
            max_depth,
        }
    }

    /// Crawls from `start_url` and returns every processed URL in discovery order
    pub async fn crawl(&self, start_url: &str) -> Vec<String> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut found = Vec::new();
        let mut queue = VecDeque::from([CrawlItem {
            url: start_url.to_string(),
            depth: 0,
        }]);

        while let Some(item) = queue.pop_front() {
            if item.depth > self.max_depth {
                continue;
            }
            if !visited.insert(normalize_url(&item.url)) {
                continue;
            }
            found.push(item.url.clone());

            let response = match self.transport.get(&item.url).await {
                Ok(r) => r,
                Err(e) => {
                    debug!("[CRAWL] Error fetching {}: {e}", item.url);
                    continue;
                }
            };

            let mut links = extractor::find_links(&self.root, &item.url, &response.body);
            if response.is_redirect() {
                if let Some(location) = response.header("location") {
                    links.extend(extractor::resolve_location(&self.root, &item.url, location));
                }
            }

            let child_depth = item.depth + 1;
            if child_depth > self.max_depth {
                continue;
            }
            for link in links {
                if !visited.contains(&normalize_url(&link)) {
                    queue.push_back(CrawlItem {
                        url: link,
                        depth: child_depth,
                    });
                }
            }
        }

        info!("Crawler finished: {} URLs discovered", found.len());
        found
    }
}

/// Normalizes a URL for deduplication (strips fragment and trailing slash)
pub fn normalize_url(url: &str) -> String {
    if let Ok(mut parsed) = url::Url::parse(url) {
        parsed.set_fragment(None);
        let mut result = parsed.to_string();
        if result.ends_with('/') && result.len() > 1 {
            result.pop();
        }
        result
    } else {
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url("https://example.com/path/"),
            "https://example.com/path"
        );
        assert_eq!(
            normalize_url("https://example.com/path#section"),
            "https://example.com/path"
        );
        assert_eq!(
            normalize_url("https://example.com/path?a=1"),
            "https://example.com/path?a=1"
        );
    }
}
