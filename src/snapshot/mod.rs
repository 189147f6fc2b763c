//! Snapshot capture, persistence and ingest.
//!
//! A snapshot is the raw, as-captured representation of one page. The
//! capture stage writes one JSON file per path; ingest reads them back
//! through serde validation so later stages never see a malformed record.

#[cfg(feature = "browser")]
pub mod browser;
pub mod extract;

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::artifacts::ArtifactStore;
use crate::models::{BatchOutcome, Snapshot};
use crate::paths;
use crate::utils::sha1_hex;

/// File name for a snapshot: slug plus a short path-hash disambiguator.
pub fn snapshot_file_name(path: &str) -> String {
    let normalized = paths::normalize(path);
    format!(
        "{}-{}.json",
        paths::slug(&normalized),
        &sha1_hex(normalized.as_bytes())[..8]
    )
}

/// Persist one snapshot under `snapshots/`.
pub fn write_snapshot(store: &ArtifactStore, snapshot: &Snapshot) -> anyhow::Result<PathBuf> {
    let path = store.snapshots_dir().join(snapshot_file_name(&snapshot.path));
    store.write_json(&path, snapshot)?;
    Ok(path)
}

/// Load every snapshot from disk, rejecting malformed records per item.
pub fn load_snapshots(store: &ArtifactStore) -> anyhow::Result<BatchOutcome<Snapshot>> {
    let mut outcome = BatchOutcome::new();
    let dir = store.snapshots_dir();
    if !dir.is_dir() {
        return Ok(outcome);
    }

    let mut entries: Vec<PathBuf> = fs::read_dir(&dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().map(|e| e == "json").unwrap_or(false))
        .collect();
    entries.sort();

    for file in entries {
        match store.read_json::<Snapshot>(&file) {
            Ok(snapshot) => outcome.push_ok(snapshot),
            Err(e) => {
                warn!("Rejecting malformed snapshot {}: {}", file.display(), e);
                outcome.push_failure(file.display().to_string(), e.to_string());
            }
        }
    }

    info!("Loaded snapshots: {}", outcome.summary());
    Ok(outcome)
}

/// Assemble a snapshot from captured HTML plus its discovery status.
pub fn build_snapshot(
    url: &str,
    path: &str,
    html: String,
    statuses: &HashMap<String, u16>,
    internal_hosts: &[String],
    media_hosts: &[String],
) -> Snapshot {
    let normalized = paths::normalize(path);
    let status = statuses.get(&normalized).copied().unwrap_or(200);

    let base = url::Url::parse(url).ok();
    let fields = match &base {
        Some(base) => extract::extract_fields(&html, base, internal_hosts, media_hosts),
        None => Default::default(),
    };

    let text = fields.text;
    Snapshot {
        url: url.to_string(),
        path: normalized,
        status,
        html,
        title: fields.title,
        description: fields.description,
        canonical_url: fields.canonical_url,
        og_image: fields.og_image,
        headings: fields.headings,
        links: fields.links,
        assets: fields.assets,
        text_hash: Some(sha1_hex(text.as_bytes())),
        text,
        captured_at: chrono::Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot(path: &str) -> Snapshot {
        build_snapshot(
            &format!("https://legacy.example.org{path}"),
            path,
            "<html><head><title>T</title></head><body><p>body text</p></body></html>".to_string(),
            &HashMap::new(),
            &["legacy.example.org".to_string()],
            &[],
        )
    }

    #[test]
    fn build_snapshot_fills_derived_fields() {
        let snapshot = sample_snapshot("/about/");
        assert_eq!(snapshot.path, "/about");
        assert_eq!(snapshot.status, 200);
        assert_eq!(snapshot.title, "T");
        assert_eq!(snapshot.text, "body text");
        assert!(snapshot.text_hash.is_some());
    }

    #[test]
    fn snapshots_round_trip_through_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.ensure_layout().unwrap();

        write_snapshot(&store, &sample_snapshot("/a")).unwrap();
        write_snapshot(&store, &sample_snapshot("/b")).unwrap();
        // Same path overwrites, no duplicate
        write_snapshot(&store, &sample_snapshot("/a")).unwrap();

        let outcome = load_snapshots(&store).unwrap();
        assert_eq!(outcome.succeeded.len(), 2);
        assert!(outcome.failed.is_empty());
    }

    #[test]
    fn malformed_snapshot_is_rejected_per_item() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.ensure_layout().unwrap();

        write_snapshot(&store, &sample_snapshot("/ok")).unwrap();
        fs::write(store.snapshots_dir().join("broken.json"), "{\"nope\": 1}").unwrap();

        let outcome = load_snapshots(&store).unwrap();
        assert_eq!(outcome.succeeded.len(), 1);
        assert_eq!(outcome.failed.len(), 1);
    }

    #[test]
    fn snapshot_file_names_are_deterministic() {
        assert_eq!(snapshot_file_name("/a/b/"), snapshot_file_name("/a/b"));
        assert_ne!(snapshot_file_name("/a-b"), snapshot_file_name("/a/b"));
    }
}
