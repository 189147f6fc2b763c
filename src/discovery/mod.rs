//! Route discovery: the inputs the route contract is built from.
//!
//! Three overlapping sources feed the contract: the site's sitemap, a
//! bounded same-host crawl, and the status probes recorded during that
//! crawl. Discovery output is persisted so the contract can be rebuilt
//! offline.

mod crawl;
mod sitemap;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::config::Settings;

pub use crawl::Crawler;
pub use sitemap::SitemapSource;

/// A discovered path with the URL it was observed at.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredRoute {
    pub path: String,
    pub source_url: String,
}

/// Everything the route contract builder consumes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryInputs {
    /// Paths listed by the sitemap.
    pub sitemap: Vec<DiscoveredRoute>,
    /// Paths reachable by crawl.
    pub reachable: Vec<DiscoveredRoute>,
    /// Paths that answered with a non-OK status.
    pub non_ok: Vec<DiscoveredRoute>,
    /// Observed status codes by normalized path.
    pub statuses: HashMap<String, u16>,
}

/// Convert an absolute URL into a mirror path if it belongs to the site.
pub fn internal_path(url: &str, internal_hosts: &[String]) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    let host = parsed.host_str()?;
    if !internal_hosts.iter().any(|h| h == host) {
        return None;
    }
    let mut path = parsed.path().to_string();
    if let Some(query) = parsed.query() {
        path.push('?');
        path.push_str(query);
    }
    Some(crate::paths::normalize(&path))
}

/// Run all discovery sources against the configured site.
pub async fn discover(settings: &Settings, max_pages: usize) -> anyhow::Result<DiscoveryInputs> {
    let hosts = settings.site.internal_hosts();
    let base_url = settings.site.base_url.trim_end_matches('/').to_string();

    let sitemap_source = SitemapSource::new();
    let sitemap = sitemap_source.discover(&base_url, &hosts).await;
    info!("Sitemap discovery found {} paths", sitemap.len());

    let crawler = Crawler::new(&base_url, &hosts, max_pages)?;
    let crawl = crawler.run().await;
    info!(
        "Crawl found {} reachable paths, {} non-OK",
        crawl.reachable.len(),
        crawl.non_ok.len()
    );

    Ok(DiscoveryInputs {
        sitemap,
        reachable: crawl.reachable,
        non_ok: crawl.non_ok,
        statuses: crawl.statuses,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_path_filters_hosts_and_normalizes() {
        let hosts = vec!["legacy.example.org".to_string()];
        assert_eq!(
            internal_path("https://legacy.example.org/about/", &hosts),
            Some("/about".to_string())
        );
        assert_eq!(
            internal_path("https://legacy.example.org/search?q=1", &hosts),
            Some("/search?q=1".to_string())
        );
        assert_eq!(internal_path("https://other.example.org/x", &hosts), None);
        assert_eq!(internal_path("mailto:someone@example.org", &hosts), None);
        assert_eq!(internal_path("not a url", &hosts), None);
    }
}
