//! Content-addressed blob sync.
//!
//! Uploads each distinct content hash at most once: an in-process map
//! from sha1 to the already-uploaded record is consulted before every
//! upload attempt, so re-encountering a hash is O(1) and skips network
//! I/O entirely. Per-candidate failures are recorded and the run
//! continues; asset sync is best-effort relative to page content.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};
use url::Url;

use super::store::{BlobStore, PutOutcome};
use crate::models::{AssetCandidate, AssetSource, BatchOutcome, BlobRecord};
use crate::paths;
use crate::utils::sha1_hex;

/// Uploads candidates into a blob store.
pub struct BlobSync<'a> {
    store: &'a dyn BlobStore,
    client: reqwest::Client,
    namespace: String,
    /// Base directory archive-relative paths resolve against.
    archive_root: PathBuf,
    fetch_timeout: Duration,
}

impl<'a> BlobSync<'a> {
    pub fn new(
        store: &'a dyn BlobStore,
        namespace: &str,
        archive_root: impl Into<PathBuf>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            store,
            client: reqwest::Client::builder()
                .user_agent("Mozilla/5.0 (compatible; SiteMirror/1.0)")
                .build()
                .expect("Failed to create HTTP client"),
            namespace: namespace.to_string(),
            archive_root: archive_root.into(),
            fetch_timeout,
        }
    }

    /// Sync all candidates, deduplicating uploads by content hash.
    pub async fn run(
        &self,
        candidates: &[AssetCandidate],
    ) -> (Vec<BlobRecord>, BatchOutcome<String>) {
        let mut by_hash: HashMap<String, BlobRecord> = HashMap::new();
        let mut records = Vec::new();
        let mut outcome = BatchOutcome::new();

        let progress = ProgressBar::new(candidates.len() as u64);
        progress.set_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
                .expect("static progress template"),
        );

        for candidate in candidates {
            let source_id = candidate.source_id().to_string();
            progress.set_message(candidate.filename.clone());
            progress.inc(1);

            // Pre-hashed candidates whose hash was already uploaded need
            // no bytes at all
            if let Some(known) = candidate.sha1.as_ref().and_then(|h| by_hash.get(h)) {
                let record = self.alias_record(candidate, known);
                records.push(record);
                outcome.push_ok(source_id);
                continue;
            }

            let bytes = match self.fetch_bytes(candidate).await {
                Ok(bytes) => bytes,
                Err(reason) => {
                    warn!("Asset fetch failed for {}: {}", source_id, reason);
                    outcome.push_failure(source_id, reason);
                    continue;
                }
            };

            let sha1 = candidate
                .sha1
                .clone()
                .unwrap_or_else(|| sha1_hex(&bytes));

            if let Some(known) = by_hash.get(&sha1) {
                debug!("Duplicate content {} for {}", sha1, source_id);
                let record = self.alias_record(candidate, known);
                records.push(record);
                outcome.push_ok(source_id);
                continue;
            }

            let blob_key = format!(
                "{}/{}-{}",
                self.namespace,
                sha1,
                paths::sanitize_filename(&candidate.filename)
            );

            match self.upload(&blob_key, &bytes).await {
                Ok(()) => {}
                Err(reason) => {
                    warn!("Upload failed for {}: {}", source_id, reason);
                    outcome.push_failure(source_id, reason);
                    continue;
                }
            }

            let record = BlobRecord {
                source_url: source_id.clone(),
                path: mirror_path(candidate),
                blob_url: self.store.url_for(&blob_key),
                blob_key,
                content_type: detect_content_type(&bytes, &candidate.filename),
                sha1: sha1.clone(),
                size: bytes.len() as u64,
            };
            by_hash.insert(sha1, record.clone());
            records.push(record);
            outcome.push_ok(source_id);
        }
        progress.finish_and_clear();

        info!("Blob sync: {}", outcome.summary());
        (records, outcome)
    }

    /// Record for a candidate whose content is already uploaded.
    fn alias_record(&self, candidate: &AssetCandidate, known: &BlobRecord) -> BlobRecord {
        BlobRecord {
            source_url: candidate.source_id().to_string(),
            path: mirror_path(candidate),
            blob_key: known.blob_key.clone(),
            blob_url: known.blob_url.clone(),
            content_type: known.content_type.clone(),
            sha1: known.sha1.clone(),
            size: known.size,
        }
    }

    async fn fetch_bytes(&self, candidate: &AssetCandidate) -> Result<Vec<u8>, String> {
        match &candidate.source {
            AssetSource::ArchiveFile { local_path } => {
                tokio::fs::read(self.archive_root.join(local_path))
                    .await
                    .map_err(|e| format!("read {local_path}: {e}"))
            }
            AssetSource::CrawlUrl { source_url } => {
                let response = self
                    .client
                    .get(source_url)
                    .timeout(self.fetch_timeout)
                    .send()
                    .await
                    .map_err(|e| format!("fetch: {e}"))?;
                if !response.status().is_success() {
                    return Err(format!("fetch: HTTP {}", response.status()));
                }
                response
                    .bytes()
                    .await
                    .map(|b| b.to_vec())
                    .map_err(|e| format!("read body: {e}"))
            }
        }
    }

    async fn upload(&self, key: &str, bytes: &[u8]) -> Result<(), String> {
        match self.store.put(key, bytes).await {
            Ok(PutOutcome::Created) => Ok(()),
            Ok(PutOutcome::AlreadyExists) => {
                // Leftover from a prior partial run; confirm it is readable
                match self.store.head(key).await {
                    Ok(Some(_)) => Ok(()),
                    Ok(None) => Err(format!("object {key} reported existing but unreadable")),
                    Err(e) => Err(e.to_string()),
                }
            }
            Err(e) => Err(e.to_string()),
        }
    }
}

/// Normalized mirror path an asset is served under.
fn mirror_path(candidate: &AssetCandidate) -> String {
    match &candidate.source {
        AssetSource::ArchiveFile { local_path } => {
            paths::normalize(&format!("/{}", local_path.trim_start_matches('/')))
        }
        AssetSource::CrawlUrl { source_url } => match Url::parse(source_url) {
            Ok(parsed) => {
                let mut path = parsed.path().to_string();
                if let Some(query) = parsed.query() {
                    path.push('?');
                    path.push_str(query);
                }
                paths::normalize(&path)
            }
            Err(_) => paths::normalize(source_url),
        },
    }
}

fn detect_content_type(bytes: &[u8], filename: &str) -> String {
    if let Some(kind) = infer::get(bytes) {
        return kind.mime_type().to_string();
    }
    mime_guess::from_path(filename)
        .first_raw()
        .unwrap_or("application/octet-stream")
        .to_string()
}

/// Lookup view over the synced blob records.
#[derive(Debug, Clone, Default)]
pub struct BlobMap {
    records: Vec<BlobRecord>,
    by_source: HashMap<String, usize>,
    by_path: HashMap<String, usize>,
}

impl BlobMap {
    pub fn new(records: Vec<BlobRecord>) -> Self {
        let mut by_source = HashMap::new();
        let mut by_path = HashMap::new();
        for (i, record) in records.iter().enumerate() {
            by_source.entry(record.source_url.clone()).or_insert(i);
            // Indexed with and without query so `/asset?v=2` resolves
            // either the exact entry or the bare-path one
            by_path.entry(record.path.clone()).or_insert(i);
            let (bare, _) = paths::split_query(&record.path);
            by_path.entry(bare.to_string()).or_insert(i);
        }
        Self {
            records,
            by_source,
            by_path,
        }
    }

    pub fn records(&self) -> &[BlobRecord] {
        &self.records
    }

    pub fn by_source_url(&self, url: &str) -> Option<&BlobRecord> {
        self.by_source.get(url).map(|&i| &self.records[i])
    }

    /// Resolve a request path: exact query-qualified entry first, then
    /// the bare path.
    pub fn by_path(&self, path: &str) -> Option<&BlobRecord> {
        let normalized = paths::normalize(path);
        if let Some(&i) = self.by_path.get(&normalized) {
            return Some(&self.records[i]);
        }
        let (bare, _) = paths::split_query(&normalized);
        self.by_path.get(bare).map(|&i| &self.records[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::super::store::{BlobStoreError, StoredBlob};

    /// In-memory store that counts uploads.
    #[derive(Default)]
    struct CountingStore {
        objects: Mutex<HashMap<String, Vec<u8>>>,
        puts: AtomicUsize,
    }

    #[async_trait]
    impl BlobStore for CountingStore {
        async fn put(&self, key: &str, bytes: &[u8]) -> Result<PutOutcome, BlobStoreError> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            let mut objects = self.objects.lock().unwrap();
            if objects.contains_key(key) {
                return Ok(PutOutcome::AlreadyExists);
            }
            objects.insert(key.to_string(), bytes.to_vec());
            Ok(PutOutcome::Created)
        }

        async fn head(&self, key: &str) -> Result<Option<StoredBlob>, BlobStoreError> {
            Ok(self.objects.lock().unwrap().get(key).map(|bytes| StoredBlob {
                key: key.to_string(),
                url: self.url_for(key),
                size: bytes.len() as u64,
            }))
        }

        fn url_for(&self, key: &str) -> String {
            format!("mem://{key}")
        }
    }

    fn archive_candidate(local_path: &str, filename: &str) -> AssetCandidate {
        AssetCandidate {
            source: AssetSource::ArchiveFile {
                local_path: local_path.to_string(),
            },
            filename: filename.to_string(),
            extension: paths::file_extension(filename),
            size_bytes: None,
            sha1: None,
        }
    }

    #[tokio::test]
    async fn identical_content_uploads_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"same bytes").unwrap();
        std::fs::write(dir.path().join("b.png"), b"same bytes").unwrap();

        let store = CountingStore::default();
        let sync = BlobSync::new(&store, "mirror", dir.path(), Duration::from_secs(5));
        let (records, outcome) = sync
            .run(&[
                archive_candidate("a.png", "a.png"),
                archive_candidate("b.png", "b.png"),
            ])
            .await;

        assert_eq!(outcome.succeeded.len(), 2);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].blob_key, records[1].blob_key);
        assert_eq!(records[0].blob_url, records[1].blob_url);
        assert_eq!(store.puts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn existing_object_falls_back_to_head() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"payload").unwrap();

        let store = CountingStore::default();
        let sha1 = sha1_hex(b"payload");
        // Simulate a prior partial run having uploaded the object
        store
            .objects
            .lock()
            .unwrap()
            .insert(format!("mirror/{sha1}-a.png"), b"payload".to_vec());

        let sync = BlobSync::new(&store, "mirror", dir.path(), Duration::from_secs(5));
        let (records, outcome) = sync.run(&[archive_candidate("a.png", "a.png")]).await;

        assert!(outcome.failed.is_empty());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sha1, sha1);
    }

    #[tokio::test]
    async fn failures_are_recorded_and_run_continues() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ok.png"), b"fine").unwrap();

        let store = CountingStore::default();
        let sync = BlobSync::new(&store, "mirror", dir.path(), Duration::from_secs(5));
        let (records, outcome) = sync
            .run(&[
                archive_candidate("missing.png", "missing.png"),
                archive_candidate("ok.png", "ok.png"),
            ])
            .await;

        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].item, "missing.png");
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn pre_hashed_duplicates_skip_reading_bytes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"content").unwrap();
        // Second candidate's file does not even exist; its known hash
        // must be enough
        let sha1 = sha1_hex(b"content");

        let mut first = archive_candidate("a.png", "a.png");
        first.sha1 = Some(sha1.clone());
        let mut second = archive_candidate("ghost.png", "ghost.png");
        second.sha1 = Some(sha1);

        let store = CountingStore::default();
        let sync = BlobSync::new(&store, "mirror", dir.path(), Duration::from_secs(5));
        let (records, outcome) = sync.run(&[first, second]).await;

        assert_eq!(outcome.succeeded.len(), 2);
        assert_eq!(store.puts.load(Ordering::SeqCst), 1);
        assert_eq!(records[1].source_url, "ghost.png");
        assert_eq!(records[1].blob_key, records[0].blob_key);
    }

    #[test]
    fn blob_map_resolves_query_qualified_paths() {
        let record = |path: &str, key: &str| BlobRecord {
            source_url: format!("https://media.example.net{path}"),
            path: path.to_string(),
            blob_key: key.to_string(),
            blob_url: format!("mem://{key}"),
            content_type: "image/png".to_string(),
            sha1: "abc".to_string(),
            size: 1,
        };
        let map = BlobMap::new(vec![
            record("/pic.png", "k1"),
            record("/doc.pdf?v=2", "k2"),
        ]);

        assert_eq!(map.by_path("/pic.png").unwrap().blob_key, "k1");
        assert_eq!(map.by_path("/pic.png?cache=1").unwrap().blob_key, "k1");
        assert_eq!(map.by_path("/doc.pdf?v=2").unwrap().blob_key, "k2");
        assert_eq!(map.by_path("/doc.pdf").unwrap().blob_key, "k2");
        assert!(map.by_path("/missing.png").is_none());
    }
}
