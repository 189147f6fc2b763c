//! Blob storage seam.
//!
//! Upload is content-addressed and idempotent: a key already present in
//! the destination is reported as `AlreadyExists`, and callers fall back
//! to a `head` read instead of treating it as an error. The filesystem
//! implementation mirrors the production object layout locally; remote
//! stores plug in behind the same trait.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from a blob store backend.
#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid blob key: {0}")]
    InvalidKey(String),
}

/// What a `put` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Created,
    AlreadyExists,
}

/// Metadata of a stored blob.
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub key: String,
    pub url: String,
    pub size: u64,
}

/// Destination for deduplicated asset bytes.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under a key; reports when the object already existed.
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<PutOutcome, BlobStoreError>;

    /// Read back the metadata of an existing object.
    async fn head(&self, key: &str) -> Result<Option<StoredBlob>, BlobStoreError>;

    /// Public URL an object is served from.
    fn url_for(&self, key: &str) -> String;
}

/// Filesystem-backed blob store.
pub struct FsBlobStore {
    root: PathBuf,
    base_url: String,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>, base_url: &str) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, BlobStoreError> {
        // Keys are `<namespace>/<sha1>-<filename>`; refuse traversal
        if key.is_empty() || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
            return Err(BlobStoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<PutOutcome, BlobStoreError> {
        let path = self.object_path(key)?;
        if path.exists() {
            return Ok(PutOutcome::AlreadyExists);
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(PutOutcome::Created)
    }

    async fn head(&self, key: &str) -> Result<Option<StoredBlob>, BlobStoreError> {
        let path = self.object_path(key)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(Some(StoredBlob {
                key: key.to_string(),
                url: self.url_for(key),
                size: meta.len(),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_is_idempotent_by_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path(), "https://blobs.example.com");

        let first = store.put("mirror/abc-file.png", b"bytes").await.unwrap();
        assert_eq!(first, PutOutcome::Created);
        let second = store.put("mirror/abc-file.png", b"bytes").await.unwrap();
        assert_eq!(second, PutOutcome::AlreadyExists);

        let head = store.head("mirror/abc-file.png").await.unwrap().unwrap();
        assert_eq!(head.size, 5);
        assert_eq!(head.url, "https://blobs.example.com/mirror/abc-file.png");
    }

    #[tokio::test]
    async fn head_of_missing_object_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path(), "https://blobs.example.com");
        assert!(store.head("mirror/none").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path(), "https://blobs.example.com");
        assert!(store.put("../escape", b"x").await.is_err());
        assert!(store.put("a//b", b"x").await.is_err());
    }
}
