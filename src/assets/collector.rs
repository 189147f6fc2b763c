//! Asset candidate collection.
//!
//! Merges two asset universes into one candidate list: the pre-hashed
//! legacy archive inventory on disk, and URLs observed in snapshots
//! (restricted to known media hosts and file-like extensions) plus any
//! route the contract flags as a binary file.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

use crate::config::{AssetConfig, SiteConfig, FILE_EXTENSIONS};
use crate::models::{AssetCandidate, AssetSource, RouteContract, RouteKind, Snapshot};
use crate::paths;

/// One row of the archive inventory file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArchiveEntry {
    local_path: String,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    size_bytes: Option<u64>,
    #[serde(default)]
    sha1: Option<String>,
}

/// Collect deduplicated asset candidates from every source.
pub fn collect_candidates(
    inventory_path: Option<&Path>,
    snapshots: &[Snapshot],
    contract: &RouteContract,
    site: &SiteConfig,
    assets: &AssetConfig,
) -> Vec<AssetCandidate> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut candidates = Vec::new();

    if let Some(path) = inventory_path {
        for candidate in read_inventory(path) {
            if seen.insert(candidate.source_id().to_string()) {
                candidates.push(candidate);
            }
        }
    }

    for url in observed_urls(snapshots, site, assets) {
        if seen.insert(url.clone()) {
            candidates.push(crawl_candidate(url));
        }
    }

    let base = site.base_url.trim_end_matches('/');
    for route in contract.ok_routes().filter(|r| r.kind == RouteKind::File) {
        let url = format!("{base}{}", route.path);
        if seen.insert(url.clone()) {
            candidates.push(crawl_candidate(url));
        }
    }

    info!("Collected {} asset candidates", candidates.len());
    candidates
}

fn read_inventory(path: &Path) -> Vec<AssetCandidate> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Cannot read archive inventory {}: {}", path.display(), e);
            return Vec::new();
        }
    };
    let entries: Vec<ArchiveEntry> = match serde_json::from_str(&raw) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Malformed archive inventory {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .map(|entry| {
            let filename = entry.filename.unwrap_or_else(|| {
                entry
                    .local_path
                    .rsplit('/')
                    .next()
                    .unwrap_or("file")
                    .to_string()
            });
            let extension = paths::file_extension(&filename);
            AssetCandidate {
                source: AssetSource::ArchiveFile {
                    local_path: entry.local_path,
                },
                filename,
                extension,
                size_bytes: entry.size_bytes,
                sha1: entry.sha1,
            }
        })
        .collect()
}

/// Snapshot-observed URLs that look like binary assets.
fn observed_urls(snapshots: &[Snapshot], site: &SiteConfig, assets: &AssetConfig) -> Vec<String> {
    let internal_hosts = site.internal_hosts();
    let mut out = Vec::new();

    for snapshot in snapshots {
        for raw in snapshot.assets.iter().chain(snapshot.links.iter()) {
            // Links are stored as mirror paths; assets as absolute URLs
            let absolute = if raw.starts_with('/') {
                format!("{}{}", site.base_url.trim_end_matches('/'), raw)
            } else {
                raw.clone()
            };
            let Ok(parsed) = Url::parse(&absolute) else {
                continue;
            };
            let Some(host) = parsed.host_str() else {
                continue;
            };
            let file_like = paths::file_extension(parsed.path())
                .map(|ext| FILE_EXTENSIONS.contains(&ext.as_str()))
                .unwrap_or(false);
            if !file_like {
                continue;
            }
            let known_host = assets.media_hosts.iter().any(|h| h == host)
                || internal_hosts.iter().any(|h| h == host);
            if known_host {
                out.push(absolute);
            }
        }
    }
    out
}

fn crawl_candidate(url: String) -> AssetCandidate {
    let filename = Url::parse(&url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "file".to_string());
    let extension = paths::file_extension(&filename);
    AssetCandidate {
        source: AssetSource::CrawlUrl { source_url: url },
        filename,
        extension,
        size_bytes: None,
        sha1: None,
    }
}
