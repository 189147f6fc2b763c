//! Document classification and the content store.
//!
//! Turns raw snapshots into typed, content-addressed documents: one JSON
//! file per path under `content/documents/<type>/`, plus a flat
//! `content/index.json` for O(1) path lookup without loading documents.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::artifacts::ArtifactStore;
use crate::models::{BatchOutcome, DocumentType, PageDocument, Snapshot};
use crate::paths;
use crate::sanitize::dom::{self, Node};
use crate::snapshot::extract::flatten_text;
use crate::utils::{dedup_preserve_order, sha1_hex};

/// One row of `content/index.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    /// Document file, relative to the content directory.
    pub file: String,
}

/// The path → file index over all stored documents.
#[derive(Debug, Clone, Default)]
pub struct ContentIndex {
    entries: Vec<IndexEntry>,
    by_path: HashMap<String, usize>,
}

impl ContentIndex {
    pub fn new(entries: Vec<IndexEntry>) -> Self {
        let by_path = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.path.clone(), i))
            .collect();
        Self { entries, by_path }
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Look up a path, trying every encoding variant in order.
    pub fn lookup(&self, path: &str) -> Option<&IndexEntry> {
        for variant in paths::variants(path) {
            if let Some(&i) = self.by_path.get(&variant) {
                return Some(&self.entries[i]);
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Snapshot-to-document failures.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Captured status {0} outside [200, 400)")]
    StatusOutOfRange(u16),
}

/// Build one classified document from a snapshot.
///
/// The noise pass here strips scripts and tracking iframes from the body
/// markup; it is distinct from the security sanitizer, which runs at
/// serve time on the stored markup.
pub fn build_document(snapshot: &Snapshot) -> Result<PageDocument, BuildError> {
    if !(200..400).contains(&snapshot.status) {
        return Err(BuildError::StatusOutOfRange(snapshot.status));
    }

    let path = paths::normalize(&snapshot.path);
    let doc_type = DocumentType::classify(&path);

    let body_html = strip_noise(&body_markup(&snapshot.html));
    let render_html = format!("{}{}", head_styles(&snapshot.html), body_html);

    let text = if snapshot.text.trim().is_empty() {
        flatten_text(&body_html)
    } else {
        crate::utils::collapse_whitespace(&snapshot.text)
    };
    let text_hash = snapshot
        .text_hash
        .clone()
        .unwrap_or_else(|| sha1_hex(text.as_bytes()));

    Ok(PageDocument {
        id: sha1_hex(path.as_bytes()),
        doc_type,
        url: snapshot.url.clone(),
        title: snapshot.title.clone(),
        description: snapshot.description.clone(),
        canonical_url: snapshot.canonical_url.clone(),
        og_image: snapshot.og_image.clone(),
        headings: dedup_preserve_order(snapshot.headings.clone()),
        text,
        text_hash,
        links: dedup_preserve_order(snapshot.links.clone()),
        assets: dedup_preserve_order(snapshot.assets.clone()),
        body_html,
        render_html,
        captured_at: snapshot.captured_at,
        path,
    })
}

/// Relative file name a document is stored under.
pub fn document_file(doc: &PageDocument) -> String {
    format!(
        "documents/{}/{}-{}.json",
        doc.doc_type.as_str(),
        paths::slug(&doc.path),
        &doc.id[..8]
    )
}

/// Build and persist documents for every snapshot; rewrite the index.
pub fn build_all(
    store: &ArtifactStore,
    snapshots: &[Snapshot],
) -> anyhow::Result<BatchOutcome<IndexEntry>> {
    let mut outcome = BatchOutcome::new();

    for snapshot in snapshots {
        let doc = match build_document(snapshot) {
            Ok(doc) => doc,
            Err(e) => {
                outcome.push_failure(snapshot.path.clone(), e.to_string());
                continue;
            }
        };
        let file = document_file(&doc);
        match store.write_json(&store.document_path(&file), &doc) {
            Ok(()) => outcome.push_ok(IndexEntry {
                path: doc.path.clone(),
                doc_type: doc.doc_type,
                file,
            }),
            Err(e) => outcome.push_failure(snapshot.path.clone(), e.to_string()),
        }
    }

    store.write_json(&store.content_index_path(), &outcome.succeeded)?;
    info!("Content build: {}", outcome.summary());
    Ok(outcome)
}

/// Load the content index from disk.
pub fn load_index(store: &ArtifactStore) -> anyhow::Result<ContentIndex> {
    let entries: Vec<IndexEntry> = store.read_json(&store.content_index_path())?;
    Ok(ContentIndex::new(entries))
}

/// Load one document through the index.
pub fn load_document(
    store: &ArtifactStore,
    index: &ContentIndex,
    path: &str,
) -> anyhow::Result<Option<PageDocument>> {
    let Some(entry) = index.lookup(path) else {
        return Ok(None);
    };
    let doc = store.read_json(&store.document_path(&entry.file))?;
    Ok(Some(doc))
}

/// Inner markup of the `<body>` element, or the input when absent.
fn body_markup(html: &str) -> String {
    let document = scraper::Html::parse_document(html);
    let selector = scraper::Selector::parse("body").unwrap();
    document
        .select(&selector)
        .next()
        .map(|el| el.inner_html())
        .unwrap_or_else(|| html.to_string())
}

/// Head `<style>` and stylesheet `<link>` markup, concatenated.
fn head_styles(html: &str) -> String {
    let document = scraper::Html::parse_document(html);
    let selector = scraper::Selector::parse("head style, head link[rel=\"stylesheet\"]").unwrap();
    document
        .select(&selector)
        .map(|el| el.html())
        .collect::<String>()
}

fn tracking_iframe_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(googletagmanager\.com|google-analytics\.com|doubleclick\.net|facebook\.(com|net)|hotjar\.com)",
        )
        .expect("static regex")
    })
}

/// Remove scripts and tracking iframes from body markup.
fn strip_noise(body_html: &str) -> String {
    let nodes = dom::parse_fragment(body_html);
    dom::serialize(&strip_noise_nodes(nodes))
}

fn strip_noise_nodes(nodes: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::new();
    for node in nodes {
        match node {
            Node::Text(text) => out.push(Node::Text(text)),
            Node::Element(mut el) => {
                match el.name.as_str() {
                    "script" | "noscript" => continue,
                    "iframe" => {
                        if el
                            .attr("src")
                            .map(|src| tracking_iframe_re().is_match(src))
                            .unwrap_or(false)
                        {
                            continue;
                        }
                    }
                    _ => {}
                }
                el.children = strip_noise_nodes(std::mem::take(&mut el.children));
                out.push(Node::Element(el));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snapshot(path: &str, status: u16, html: &str) -> Snapshot {
        Snapshot {
            url: format!("https://legacy.example.org{path}"),
            path: path.to_string(),
            status,
            html: html.to_string(),
            title: "Title".to_string(),
            description: String::new(),
            canonical_url: None,
            og_image: None,
            headings: vec!["H".to_string(), "H".to_string()],
            links: vec!["/a".to_string(), "/a".to_string()],
            assets: vec![],
            text: String::new(),
            text_hash: None,
            captured_at: Utc::now(),
        }
    }

    const HTML: &str = "<html><head><style>p{margin:0}</style>\
        <link rel=\"stylesheet\" href=\"/site.css\">\
        <script src=\"/head.js\"></script></head>\
        <body><p>hello</p><script>track()</script>\
        <iframe src=\"https://www.googletagmanager.com/x\"></iframe>\
        <iframe src=\"https://www.youtube.com/embed/v\"></iframe></body></html>";

    #[test]
    fn rejects_out_of_range_status() {
        assert!(build_document(&snapshot("/a", 404, HTML)).is_err());
        assert!(build_document(&snapshot("/a", 500, HTML)).is_err());
        assert!(build_document(&snapshot("/a", 200, HTML)).is_ok());
        assert!(build_document(&snapshot("/a", 301, HTML)).is_ok());
    }

    #[test]
    fn noise_is_stripped_but_content_iframes_stay() {
        let doc = build_document(&snapshot("/a", 200, HTML)).unwrap();
        assert!(!doc.body_html.contains("<script"));
        assert!(!doc.body_html.contains("googletagmanager"));
        assert!(doc.body_html.contains("youtube.com/embed"));
        assert!(doc.body_html.contains("<p>hello</p>"));
    }

    #[test]
    fn render_html_carries_head_styles() {
        let doc = build_document(&snapshot("/a", 200, HTML)).unwrap();
        assert!(doc.render_html.starts_with("<style>"));
        assert!(doc.render_html.contains("site.css"));
        assert!(!doc.render_html.contains("head.js"));
    }

    #[test]
    fn derived_fields_are_deduplicated_and_hashed() {
        let doc = build_document(&snapshot("/a", 200, HTML)).unwrap();
        assert_eq!(doc.headings, vec!["H"]);
        assert_eq!(doc.links, vec!["/a"]);
        assert_eq!(doc.id, sha1_hex(b"/a"));
        assert_eq!(doc.text, "hello");
        assert_eq!(doc.text_hash, sha1_hex(b"hello"));
    }

    #[test]
    fn capture_supplied_text_hash_wins() {
        let mut snap = snapshot("/a", 200, HTML);
        snap.text_hash = Some("precomputed".to_string());
        let doc = build_document(&snap).unwrap();
        assert_eq!(doc.text_hash, "precomputed");
    }

    #[test]
    fn store_and_index_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.ensure_layout().unwrap();

        let snapshots = vec![
            snapshot("/post/alpha", 200, HTML),
            snapshot("/about", 200, HTML),
            snapshot("/broken", 500, HTML),
        ];
        let outcome = build_all(&store, &snapshots).unwrap();
        assert_eq!(outcome.succeeded.len(), 2);
        assert_eq!(outcome.failed.len(), 1);

        let index = load_index(&store).unwrap();
        assert_eq!(index.len(), 2);
        let entry = index.lookup("/post/alpha").unwrap();
        assert_eq!(entry.doc_type, DocumentType::Post);

        let doc = load_document(&store, &index, "/post/alpha/").unwrap().unwrap();
        assert_eq!(doc.path, "/post/alpha");
        assert!(load_document(&store, &index, "/missing").unwrap().is_none());
    }
}
