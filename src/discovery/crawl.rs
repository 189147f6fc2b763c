//! Same-host crawl prober.
//!
//! A bounded, sequential BFS from the site root. Every visited path's
//! HTTP status is recorded; OK HTML pages contribute their same-host
//! links to the frontier. Network failures degrade to a skipped path,
//! never a fatal error.

use std::collections::{HashMap, HashSet, VecDeque};

use scraper::{Html, Selector};
use tracing::{debug, warn};
use url::Url;

use super::{internal_path, DiscoveredRoute};
use crate::paths;

/// Default cap on crawled pages when the caller passes 0.
const DEFAULT_MAX_PAGES: usize = 2000;

/// Result of one crawl run.
#[derive(Debug, Default)]
pub struct CrawlResult {
    pub reachable: Vec<DiscoveredRoute>,
    pub non_ok: Vec<DiscoveredRoute>,
    pub statuses: HashMap<String, u16>,
}

/// Sequential same-host crawler.
pub struct Crawler {
    client: reqwest::Client,
    base: Url,
    internal_hosts: Vec<String>,
    max_pages: usize,
}

impl Crawler {
    pub fn new(base_url: &str, internal_hosts: &[String], max_pages: usize) -> anyhow::Result<Self> {
        let base = Url::parse(base_url)?;
        Ok(Self {
            client: reqwest::Client::builder()
                .user_agent("Mozilla/5.0 (compatible; SiteMirror/1.0)")
                .timeout(std::time::Duration::from_secs(30))
                .build()?,
            base,
            internal_hosts: internal_hosts.to_vec(),
            max_pages: if max_pages == 0 {
                DEFAULT_MAX_PAGES
            } else {
                max_pages
            },
        })
    }

    /// Crawl from the root, recording statuses for every visited path.
    pub async fn run(&self) -> CrawlResult {
        let mut result = CrawlResult::default();
        let mut visited: HashSet<String> = HashSet::new();
        let mut frontier: VecDeque<String> = VecDeque::new();
        frontier.push_back("/".to_string());

        while let Some(path) = frontier.pop_front() {
            if visited.len() >= self.max_pages {
                debug!("Crawl page cap reached at {} pages", visited.len());
                break;
            }
            let path = paths::normalize(&path);
            if !visited.insert(path.clone()) {
                continue;
            }

            let url = match self.base.join(&path) {
                Ok(u) => u,
                Err(e) => {
                    warn!("Skipping unjoinable path {}: {}", path, e);
                    continue;
                }
            };

            let response = match self.client.get(url.clone()).send().await {
                Ok(r) => r,
                Err(e) => {
                    warn!("Fetch failed for {}: {}", url, e);
                    continue;
                }
            };

            let status = response.status().as_u16();
            result.statuses.insert(path.clone(), status);

            let route = DiscoveredRoute {
                path: path.clone(),
                source_url: url.to_string(),
            };

            if !(200..400).contains(&status) {
                result.non_ok.push(route);
                continue;
            }
            result.reachable.push(route);

            let is_html = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.contains("text/html"))
                .unwrap_or(false);
            if !is_html {
                continue;
            }

            let body = match response.text().await {
                Ok(b) => b,
                Err(e) => {
                    warn!("Body read failed for {}: {}", path, e);
                    continue;
                }
            };

            for link in extract_links(&body, &url, &self.internal_hosts) {
                if !visited.contains(&link) {
                    frontier.push_back(link);
                }
            }
        }

        result
    }
}

/// Same-host link paths found in an HTML page.
fn extract_links(html: &str, base: &Url, internal_hosts: &[String]) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").unwrap();

    let mut links = Vec::new();
    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            continue;
        }
        let Ok(absolute) = base.join(href) else {
            continue;
        };
        if let Some(path) = internal_path(absolute.as_str(), internal_hosts) {
            links.push(path);
        }
    }
    crate::utils::dedup_preserve_order(links)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_links_resolves_and_filters() {
        let base = Url::parse("https://legacy.example.org/about").unwrap();
        let hosts = vec!["legacy.example.org".to_string()];
        let html = r##"
            <a href="/news/">News</a>
            <a href="team">Team</a>
            <a href="https://legacy.example.org/contact">Contact</a>
            <a href="https://elsewhere.example.com/x">External</a>
            <a href="#section">Anchor</a>
            <a href="mailto:info@example.org">Mail</a>
        "##;
        let links = extract_links(html, &base, &hosts);
        assert_eq!(links, vec!["/news", "/team", "/contact"]);
    }
}
