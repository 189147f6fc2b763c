//! Binary asset models: pre-upload candidates and post-upload blob records.

use serde::{Deserialize, Serialize};

/// Where an asset candidate was discovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "sourceType", rename_all = "camelCase")]
pub enum AssetSource {
    /// A file from the bulk legacy archive on disk.
    #[serde(rename_all = "camelCase")]
    ArchiveFile { local_path: String },
    /// A URL observed during crawl/snapshot capture.
    #[serde(rename_all = "camelCase")]
    CrawlUrl { source_url: String },
}

/// A binary reference before upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetCandidate {
    #[serde(flatten)]
    pub source: AssetSource,
    pub filename: String,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
    /// Known content hash; absent candidates are hashed lazily at upload.
    #[serde(default)]
    pub sha1: Option<String>,
}

impl AssetCandidate {
    /// Identifier used in failure reports and candidate dedup.
    pub fn source_id(&self) -> &str {
        match &self.source {
            AssetSource::ArchiveFile { local_path } => local_path,
            AssetSource::CrawlUrl { source_url } => source_url,
        }
    }
}

/// One uploaded, content-addressed blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobRecord {
    /// Original source identifier (archive path or remote URL).
    pub source_url: String,
    /// Normalized mirror path the asset is served under.
    pub path: String,
    /// Deterministic object key: `<namespace>/<sha1>-<sanitized filename>`.
    pub blob_key: String,
    pub blob_url: String,
    pub content_type: String,
    pub sha1: String,
    pub size: u64,
}
