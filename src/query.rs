//! Read-side query interface for serve-time consumers.
//!
//! The page router and asset route are external collaborators; this is
//! the read-only surface they consume. Route contract, content index and
//! blob map load lazily into populate-once caches: population is
//! deterministic and idempotent, so concurrent first readers may race to
//! compute the same value without locks and the result is immutable for
//! the rest of the process lifetime.

use std::sync::OnceLock;

use tracing::warn;

use crate::artifacts::ArtifactStore;
use crate::assets::{self, BlobMap};
use crate::config::Settings;
use crate::content::{self, ContentIndex};
use crate::models::{PageDocument, RouteContract};
use crate::paths;
use crate::routes;
use crate::sanitize;

/// How a request path should be answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Serve the document at this (resolved) path.
    Serve { path: String },
    /// Redirect to the canonical spelling.
    Redirect { to: String },
    /// Serve this non-200 status.
    Status { code: u16 },
    /// Unknown path.
    NotFound,
}

/// Memoized read access over the built artifacts.
pub struct MirrorQuery {
    artifacts: ArtifactStore,
    settings: Settings,
    contract: OnceLock<RouteContract>,
    index: OnceLock<ContentIndex>,
    blobs: OnceLock<BlobMap>,
}

impl MirrorQuery {
    pub fn new(artifacts: ArtifactStore, settings: Settings) -> Self {
        Self {
            artifacts,
            settings,
            contract: OnceLock::new(),
            index: OnceLock::new(),
            blobs: OnceLock::new(),
        }
    }

    /// The route contract, loaded at most once per process.
    pub fn contract(&self) -> &RouteContract {
        self.contract.get_or_init(|| {
            routes::load_contract(&self.artifacts).unwrap_or_else(|e| {
                warn!("Route contract unavailable: {}", e);
                RouteContract::default()
            })
        })
    }

    fn index(&self) -> &ContentIndex {
        self.index.get_or_init(|| {
            content::load_index(&self.artifacts).unwrap_or_else(|e| {
                warn!("Content index unavailable: {}", e);
                ContentIndex::default()
            })
        })
    }

    fn blobs(&self) -> &BlobMap {
        self.blobs.get_or_init(|| {
            assets::load_blob_map(&self.artifacts).unwrap_or_else(|e| {
                warn!("Blob map unavailable: {}", e);
                BlobMap::default()
            })
        })
    }

    /// Decide how to answer a request path.
    pub fn resolve(&self, path: &str) -> RouteDecision {
        let contract = self.contract();
        let resolution = contract.resolve_request_path(path);
        if resolution.redirected {
            return RouteDecision::Redirect {
                to: resolution.resolved,
            };
        }
        if let Some(code) = contract.status_for(&resolution.input) {
            return RouteDecision::Status { code };
        }
        for variant in paths::variants(&resolution.input) {
            if contract.is_ok_route(&variant) {
                return RouteDecision::Serve { path: variant };
            }
        }
        RouteDecision::NotFound
    }

    /// Document lookup, trying both the resolved alias target and the
    /// input, canonical spelling first so every variant of a path serves
    /// one document.
    pub fn document(&self, path: &str) -> Option<PageDocument> {
        let resolution = self.contract().resolve_request_path(path);
        for candidate in [&resolution.resolved, &resolution.input] {
            match content::load_document(&self.artifacts, self.index(), candidate) {
                Ok(Some(doc)) => return Some(doc),
                Ok(None) => continue,
                Err(e) => {
                    warn!("Document load failed for {}: {}", candidate, e);
                    continue;
                }
            }
        }
        None
    }

    /// Sanitized, transformed HTML ready for the rendering layer.
    pub fn render(&self, path: &str) -> Option<String> {
        let doc = self.document(path)?;
        Some(sanitize::sanitize_and_transform(
            &doc.render_html,
            &doc.path,
            &self.settings.site,
            &self.settings.transform,
        ))
    }

    /// Resolved blob URL for a binary asset path.
    pub fn blob_url(&self, path: &str) -> Option<String> {
        self.blobs().by_path(path).map(|r| r.blob_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{DiscoveredRoute, DiscoveryInputs};
    use crate::models::Snapshot;

    fn seeded_query(dir: &std::path::Path) -> MirrorQuery {
        let artifacts = ArtifactStore::new(dir);
        artifacts.ensure_layout().unwrap();

        let inputs = DiscoveryInputs {
            sitemap: vec![
                DiscoveredRoute {
                    path: "/about".to_string(),
                    source_url: "https://legacy.example.org/about".to_string(),
                },
                DiscoveredRoute {
                    path: "/About".to_string(),
                    source_url: "https://legacy.example.org/About".to_string(),
                },
            ],
            reachable: vec![],
            non_ok: vec![DiscoveredRoute {
                path: "/gone".to_string(),
                source_url: "https://legacy.example.org/gone".to_string(),
            }],
            statuses: [("/gone".to_string(), 404u16)].into_iter().collect(),
        };
        let contract = routes::build_contract(&inputs);
        routes::store_contract(&artifacts, &contract).unwrap();

        let snapshot = Snapshot {
            url: "https://legacy.example.org/about".to_string(),
            path: "/about".to_string(),
            status: 200,
            html: "<html><head></head><body><p>About <script>x()</script>page</p></body></html>"
                .to_string(),
            title: "About".to_string(),
            description: String::new(),
            canonical_url: None,
            og_image: None,
            headings: vec![],
            links: vec![],
            assets: vec![],
            text: String::new(),
            text_hash: None,
            captured_at: chrono::Utc::now(),
        };
        crate::content::build_all(&artifacts, &[snapshot]).unwrap();

        MirrorQuery::new(artifacts, Settings::default())
    }

    #[test]
    fn resolve_covers_all_decisions() {
        let dir = tempfile::tempdir().unwrap();
        let query = seeded_query(dir.path());

        assert_eq!(
            query.resolve("/about"),
            RouteDecision::Serve {
                path: "/about".to_string()
            }
        );
        assert_eq!(
            query.resolve("/About"),
            RouteDecision::Redirect {
                to: "/about".to_string()
            }
        );
        assert_eq!(query.resolve("/gone"), RouteDecision::Status { code: 404 });
        assert_eq!(query.resolve("/nowhere"), RouteDecision::NotFound);
    }

    #[test]
    fn document_lookup_follows_aliases() {
        let dir = tempfile::tempdir().unwrap();
        let query = seeded_query(dir.path());

        let direct = query.document("/about").unwrap();
        let via_alias = query.document("/About").unwrap();
        assert_eq!(direct.id, via_alias.id);
    }

    #[test]
    fn render_output_is_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let query = seeded_query(dir.path());

        let html = query.render("/about").unwrap();
        assert!(html.contains("About"));
        assert!(!html.contains("<script"));
    }

    #[test]
    fn missing_artifacts_degrade_to_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ArtifactStore::new(dir.path());
        let query = MirrorQuery::new(artifacts, Settings::default());
        assert_eq!(query.resolve("/anything"), RouteDecision::NotFound);
        assert!(query.document("/anything").is_none());
        assert!(query.blob_url("/anything.png").is_none());
    }
}
