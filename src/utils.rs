//! Small shared helpers.

use sha1::{Digest, Sha1};

/// Hex-encoded SHA-1 of arbitrary bytes.
///
/// SHA-1 is the content address used throughout the artifact contract
/// (document ids, text hashes, blob keys); it is an identifier here,
/// not a security primitive.
pub fn sha1_hex(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Deduplicate while preserving first-seen order.
pub fn dedup_preserve_order(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Collapse all runs of whitespace into single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
