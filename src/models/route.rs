//! Route contract models.
//!
//! The route contract is the authoritative table of which paths are
//! servable, with what status, and under what alias rules. All paths are
//! stored in normalized form.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Whether a route serves an HTML page or a binary file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    #[default]
    Html,
    File,
}

/// A servable 200 route.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteEntry {
    pub path: String,
    pub source_url: String,
    #[serde(default)]
    pub kind: RouteKind,
}

/// A path that must be served with a non-200 status regardless of content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusOverride {
    pub path: String,
    pub status: u16,
    pub source_url: String,
}

/// A path that redirects to a canonical spelling of itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasEntry {
    pub from: String,
    pub to: String,
    pub reason: String,
}

/// Result of request-time path resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub input: String,
    pub resolved: String,
    pub redirected: bool,
}

/// The four route tables, merged from every discovery source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteContract {
    /// Authoritative sitemap-derived 200 set.
    pub canonical: Vec<RouteEntry>,
    /// Additional crawl-reachable paths absent from the sitemap.
    pub reachable_extra: Vec<RouteEntry>,
    /// Paths served with a non-200 status.
    pub status_overrides: Vec<StatusOverride>,
    /// Case/encoding variants pointing at their canonical spelling.
    pub aliases: Vec<AliasEntry>,
}

impl RouteContract {
    /// Iterate over every 200 route (canonical plus reachable extras).
    pub fn ok_routes(&self) -> impl Iterator<Item = &RouteEntry> {
        self.canonical.iter().chain(self.reachable_extra.iter())
    }

    /// Whether a normalized path belongs to the 200 set.
    pub fn is_ok_route(&self, path: &str) -> bool {
        self.ok_routes().any(|r| r.path == path)
    }

    /// Status override for a normalized path, if any.
    pub fn status_for(&self, path: &str) -> Option<u16> {
        self.status_overrides
            .iter()
            .find(|o| o.path == path)
            .map(|o| o.status)
    }

    /// Alias lookup table keyed by source path.
    pub fn alias_map(&self) -> HashMap<&str, &str> {
        self.aliases
            .iter()
            .map(|a| (a.from.as_str(), a.to.as_str()))
            .collect()
    }

    /// Resolve a request path through the alias table.
    ///
    /// The caller is expected to normalize first; downstream document
    /// lookup must try both `input` and `resolved`.
    pub fn resolve_request_path(&self, path: &str) -> Resolution {
        let input = crate::paths::normalize(path);
        match self.aliases.iter().find(|a| a.from == input) {
            Some(alias) => Resolution {
                input,
                resolved: alias.to.clone(),
                redirected: true,
            },
            None => Resolution {
                resolved: input.clone(),
                input,
                redirected: false,
            },
        }
    }
}
