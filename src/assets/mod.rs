//! Asset candidate collection and content-addressed blob sync.

pub mod collector;
pub mod store;
pub mod sync;

pub use collector::collect_candidates;
pub use store::{BlobStore, BlobStoreError, FsBlobStore, PutOutcome, StoredBlob};
pub use sync::{BlobMap, BlobSync};

use crate::artifacts::ArtifactStore;
use crate::models::{AssetCandidate, BlobRecord};

/// Persist the collected candidate list.
pub fn store_candidates(
    artifacts: &ArtifactStore,
    candidates: &[AssetCandidate],
) -> anyhow::Result<()> {
    artifacts.write_json(&artifacts.asset_candidates_path(), &candidates)
}

/// Load the collected candidate list.
pub fn load_candidates(artifacts: &ArtifactStore) -> anyhow::Result<Vec<AssetCandidate>> {
    artifacts.read_json(&artifacts.asset_candidates_path())
}

/// Persist the synced blob records.
pub fn store_blob_map(artifacts: &ArtifactStore, records: &[BlobRecord]) -> anyhow::Result<()> {
    artifacts.write_json(&artifacts.blob_map_path(), &records)
}

/// Load the blob map with its lookup indexes.
pub fn load_blob_map(artifacts: &ArtifactStore) -> anyhow::Result<BlobMap> {
    let records: Vec<BlobRecord> = artifacts.read_json(&artifacts.blob_map_path())?;
    Ok(BlobMap::new(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssetSource;

    #[test]
    fn candidates_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ArtifactStore::new(dir.path());
        artifacts.ensure_layout().unwrap();

        let candidates = vec![AssetCandidate {
            source: AssetSource::CrawlUrl {
                source_url: "https://media.example.net/a.png".to_string(),
            },
            filename: "a.png".to_string(),
            extension: Some("png".to_string()),
            size_bytes: Some(10),
            sha1: None,
        }];
        store_candidates(&artifacts, &candidates).unwrap();
        let back = load_candidates(&artifacts).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].filename, "a.png");
        assert_eq!(back[0].source, candidates[0].source);
    }
}
