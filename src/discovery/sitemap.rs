//! Sitemap and robots.txt discovery source.
//!
//! Parses sitemap.xml files and robots.txt to discover site paths.

use std::collections::HashSet;

use tracing::{debug, warn};

use super::{internal_path, DiscoveredRoute};

/// Standard sitemap locations to check.
const SITEMAP_PATHS: &[&str] = &[
    "/sitemap.xml",
    "/sitemap_index.xml",
    "/sitemap/sitemap.xml",
    "/sitemaps/sitemap.xml",
];

/// Discovery source that parses sitemaps and robots.txt.
pub struct SitemapSource {
    client: reqwest::Client,
}

impl SitemapSource {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("Mozilla/5.0 (compatible; SiteMirror/1.0)")
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Discover site paths from every sitemap the site advertises.
    pub async fn discover(&self, base_url: &str, internal_hosts: &[String]) -> Vec<DiscoveredRoute> {
        let mut all_urls = Vec::new();

        // robots.txt Sitemap: directives first
        for sitemap_url in self.parse_robots_txt(base_url).await {
            all_urls.extend(self.parse_sitemap(&sitemap_url).await);
        }

        // Then standard locations, stopping at the first that answers
        if all_urls.is_empty() {
            for path in SITEMAP_PATHS {
                let urls = self.parse_sitemap(&format!("{base_url}{path}")).await;
                if !urls.is_empty() {
                    all_urls.extend(urls);
                    break;
                }
            }
        }

        all_urls.sort();
        all_urls.dedup();

        all_urls
            .into_iter()
            .filter_map(|url| {
                internal_path(&url, internal_hosts).map(|path| DiscoveredRoute {
                    path,
                    source_url: url,
                })
            })
            .collect()
    }

    /// Parse robots.txt to find sitemap URLs.
    async fn parse_robots_txt(&self, base_url: &str) -> Vec<String> {
        let robots_url = format!("{}/robots.txt", base_url.trim_end_matches('/'));
        debug!("Checking robots.txt at {}", robots_url);

        let response = match self.client.get(&robots_url).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                debug!("robots.txt returned {}", r.status());
                return vec![];
            }
            Err(e) => {
                debug!("Failed to fetch robots.txt: {}", e);
                return vec![];
            }
        };

        let text = match response.text().await {
            Ok(t) => t,
            Err(_) => return vec![],
        };

        text.lines()
            .filter_map(|line| {
                let line = line.trim();
                if line.to_lowercase().starts_with("sitemap:") {
                    Some(line[8..].trim().to_string())
                } else {
                    None
                }
            })
            .collect()
    }

    /// Fetch and parse a sitemap XML file (non-recursive).
    ///
    /// Uses a work queue to handle sitemap indexes without recursion.
    async fn parse_sitemap(&self, url: &str) -> Vec<String> {
        let mut all_urls = Vec::new();
        let mut pending_sitemaps = vec![url.to_string()];
        let mut processed = HashSet::new();
        const MAX_SITEMAPS: usize = 100; // Prevent infinite loops

        while let Some(sitemap_url) = pending_sitemaps.pop() {
            if processed.contains(&sitemap_url) || processed.len() >= MAX_SITEMAPS {
                continue;
            }
            processed.insert(sitemap_url.clone());

            debug!("Fetching sitemap: {}", sitemap_url);

            let response = match self.client.get(&sitemap_url).send().await {
                Ok(r) if r.status().is_success() => r,
                Ok(r) => {
                    debug!("Sitemap {} returned {}", sitemap_url, r.status());
                    continue;
                }
                Err(e) => {
                    warn!("Failed to fetch sitemap {}: {}", sitemap_url, e);
                    continue;
                }
            };

            let text = match response.text().await {
                Ok(t) => t,
                Err(e) => {
                    warn!("Failed to read sitemap {}: {}", sitemap_url, e);
                    continue;
                }
            };

            if text.contains("<sitemapindex") {
                for loc in extract_locs(&text) {
                    if !processed.contains(&loc) {
                        pending_sitemaps.push(loc);
                    }
                }
            } else {
                all_urls.extend(extract_locs(&text));
            }
        }

        all_urls
    }
}

impl Default for SitemapSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract `<loc>` values from sitemap XML.
///
/// Sitemaps use XML namespaces which HTML-oriented parsers handle poorly,
/// so this uses simple line-wise extraction with entity unescaping.
fn extract_locs(xml: &str) -> Vec<String> {
    let mut locs = Vec::new();
    for line in xml.lines() {
        let line = line.trim();
        if let Some(start) = line.find("<loc>") {
            if let Some(end) = line.find("</loc>") {
                let url = &line[start + 5..end];
                let url = url
                    .replace("&amp;", "&")
                    .replace("&lt;", "<")
                    .replace("&gt;", ">")
                    .replace("&quot;", "\"")
                    .replace("&apos;", "'");
                locs.push(url);
            }
        }
    }
    locs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_locs_from_simple_sitemap() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url>
    <loc>https://example.com/about</loc>
  </url>
  <url>
    <loc>https://example.com/kosher-posts/tags/bakery</loc>
  </url>
</urlset>"#;

        let urls = extract_locs(xml);
        assert_eq!(urls.len(), 2);
        assert!(urls.contains(&"https://example.com/about".to_string()));
    }

    #[test]
    fn extract_locs_unescapes_entities() {
        let xml = r#"<urlset>
  <url><loc>https://example.com/search?q=test&amp;page=1</loc></url>
</urlset>"#;

        let urls = extract_locs(xml);
        assert_eq!(urls, vec!["https://example.com/search?q=test&page=1"]);
    }
}
