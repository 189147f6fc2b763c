//! On-disk artifact layout.
//!
//! All artifacts are flat JSON files under the data directory; they are the
//! contract between this core and its read-only consumers:
//!
//! ```text
//! routes/canonical-200.json         routes/reachable-extra-200.json
//! routes/status-overrides.json      routes/aliases.json
//! routes/discovery.json
//! content/index.json                content/documents/<type>/<slug>.json
//! search/index.json
//! assets/blob-map.json              assets/asset-candidates.json
//! snapshots/<slug>.json             blobs/<namespace>/<key>
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Handle to the artifact directory tree.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory skeleton (idempotent).
    pub fn ensure_layout(&self) -> anyhow::Result<()> {
        for dir in [
            self.routes_dir(),
            self.content_dir().join("documents"),
            self.search_dir(),
            self.assets_dir(),
            self.snapshots_dir(),
            self.blobs_dir(),
        ] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("creating artifact dir {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn routes_dir(&self) -> PathBuf {
        self.root.join("routes")
    }

    pub fn canonical_routes_path(&self) -> PathBuf {
        self.routes_dir().join("canonical-200.json")
    }

    pub fn reachable_extra_path(&self) -> PathBuf {
        self.routes_dir().join("reachable-extra-200.json")
    }

    pub fn status_overrides_path(&self) -> PathBuf {
        self.routes_dir().join("status-overrides.json")
    }

    pub fn aliases_path(&self) -> PathBuf {
        self.routes_dir().join("aliases.json")
    }

    pub fn discovery_path(&self) -> PathBuf {
        self.routes_dir().join("discovery.json")
    }

    pub fn content_dir(&self) -> PathBuf {
        self.root.join("content")
    }

    pub fn content_index_path(&self) -> PathBuf {
        self.content_dir().join("index.json")
    }

    /// Absolute path for a document file referenced from the content index.
    pub fn document_path(&self, relative: &str) -> PathBuf {
        self.content_dir().join(relative)
    }

    pub fn search_dir(&self) -> PathBuf {
        self.root.join("search")
    }

    pub fn search_index_path(&self) -> PathBuf {
        self.search_dir().join("index.json")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    pub fn blob_map_path(&self) -> PathBuf {
        self.assets_dir().join("blob-map.json")
    }

    pub fn asset_candidates_path(&self) -> PathBuf {
        self.assets_dir().join("asset-candidates.json")
    }

    pub fn snapshots_dir(&self) -> PathBuf {
        self.root.join("snapshots")
    }

    pub fn blobs_dir(&self) -> PathBuf {
        self.root.join("blobs")
    }

    /// Read a JSON artifact into a typed value.
    pub fn read_json<T: DeserializeOwned>(&self, path: &Path) -> anyhow::Result<T> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading artifact {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing artifact {}", path.display()))
    }

    /// Write a typed value as a pretty-printed JSON artifact.
    pub fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(value)?;
        fs::write(path, raw).with_context(|| format!("writing artifact {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.ensure_layout().unwrap();
        store.ensure_layout().unwrap();
        assert!(store.routes_dir().is_dir());
        assert!(store.content_dir().join("documents").is_dir());
    }

    #[test]
    fn json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.ensure_layout().unwrap();

        let value = vec!["a".to_string(), "b".to_string()];
        let path = store.routes_dir().join("probe.json");
        store.write_json(&path, &value).unwrap();
        let back: Vec<String> = store.read_json(&path).unwrap();
        assert_eq!(back, value);
    }
}
