//! Search index builder.
//!
//! Tokenizes classified documents into a lightweight record set suitable
//! for inverted lookup. Derived and read-only: the index is rebuilt
//! wholesale from the document set on every run.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::artifacts::ArtifactStore;
use crate::config::SearchConfig;
use crate::models::PageDocument;

/// Target excerpt length in characters.
const EXCERPT_LEN: usize = 280;
/// How far back a sentence boundary may be and still win over a hard cut.
const BOUNDARY_SLACK: usize = 130;
/// Minimum token length kept in the index.
const MIN_TERM_LEN: usize = 2;

/// One searchable record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRecord {
    pub path: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub title: String,
    pub description: String,
    pub excerpt: String,
    pub terms: Vec<String>,
}

/// Build search records for every included document type.
pub fn build_index(documents: &[PageDocument], config: &SearchConfig) -> Vec<SearchRecord> {
    let records: Vec<SearchRecord> = documents
        .iter()
        .filter(|doc| {
            config
                .included_types
                .iter()
                .any(|t| t == doc.doc_type.as_str())
        })
        .map(|doc| {
            let excerpt = excerpt(&doc.text);
            let terms = tokenize(
                &format!("{} {} {}", doc.title, doc.description, excerpt),
                config.max_terms,
            );
            SearchRecord {
                path: doc.path.clone(),
                doc_type: doc.doc_type.as_str().to_string(),
                title: doc.title.clone(),
                description: doc.description.clone(),
                excerpt,
                terms,
            }
        })
        .collect();
    info!("Search index: {} records", records.len());
    records
}

/// Persist the index artifact.
pub fn store_index(artifacts: &ArtifactStore, records: &[SearchRecord]) -> anyhow::Result<()> {
    artifacts.write_json(&artifacts.search_index_path(), &records)
}

/// Load the index artifact.
pub fn load_index(artifacts: &ArtifactStore) -> anyhow::Result<Vec<SearchRecord>> {
    artifacts.read_json(&artifacts.search_index_path())
}

/// Deduplicated lowercase tokens, bounded in count.
pub fn tokenize(text: &str, max_terms: usize) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    let mut seen = std::collections::HashSet::new();
    let mut terms = Vec::new();
    for token in cleaned.split_whitespace() {
        if token.chars().count() < MIN_TERM_LEN {
            continue;
        }
        if seen.insert(token.to_string()) {
            terms.push(token.to_string());
            if terms.len() >= max_terms {
                break;
            }
        }
    }
    terms
}

/// First ~280 characters of flattened text, sentence-boundary aware.
///
/// Extends back to the nearest `". "` boundary when one falls reasonably
/// close; otherwise hard-truncates with an ellipsis.
pub fn excerpt(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= EXCERPT_LEN {
        return text.trim().to_string();
    }

    let head: String = chars[..EXCERPT_LEN].iter().collect();
    if let Some(boundary) = head.rfind(". ") {
        if EXCERPT_LEN - boundary <= BOUNDARY_SLACK {
            return head[..boundary + 1].trim().to_string();
        }
    }
    format!("{}…", head.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Snapshot;

    fn doc(path: &str, title: &str, text: &str) -> PageDocument {
        let snapshot = Snapshot {
            url: format!("https://legacy.example.org{path}"),
            path: path.to_string(),
            status: 200,
            html: format!("<html><body><p>{text}</p></body></html>"),
            title: title.to_string(),
            description: "desc words".to_string(),
            canonical_url: None,
            og_image: None,
            headings: vec![],
            links: vec![],
            assets: vec![],
            text: text.to_string(),
            text_hash: None,
            captured_at: chrono::Utc::now(),
        };
        crate::content::build_document(&snapshot).unwrap()
    }

    #[test]
    fn tokenize_lowercases_dedups_and_filters() {
        let terms = tokenize("The THE the Bakery-Shop opens at 7 am!", 80);
        assert!(terms.contains(&"the".to_string()));
        assert_eq!(terms.iter().filter(|t| *t == "the").count(), 1);
        assert!(terms.contains(&"bakery".to_string()));
        assert!(terms.contains(&"shop".to_string()));
        assert!(terms.contains(&"am".to_string()));
        // Single characters are dropped
        assert!(!terms.contains(&"7".to_string()));
    }

    #[test]
    fn tokenize_caps_term_count() {
        let text: String = (0..200).map(|i| format!("term{i} ")).collect();
        assert_eq!(tokenize(&text, 80).len(), 80);
    }

    #[test]
    fn excerpt_short_text_passes_through() {
        assert_eq!(excerpt("short text"), "short text");
    }

    #[test]
    fn excerpt_prefers_close_sentence_boundary() {
        let sentence = "A sentence that ends here. ";
        let text = format!("{}{}", sentence.repeat(12), "x".repeat(300));
        let out = excerpt(&text);
        assert!(out.ends_with('.'));
        assert!(out.len() <= EXCERPT_LEN);
    }

    #[test]
    fn excerpt_hard_truncates_when_no_boundary_is_close() {
        let text = "x".repeat(600);
        let out = excerpt(&text);
        assert!(out.ends_with('…'));
        assert_eq!(out.chars().count(), EXCERPT_LEN + 1);
    }

    #[test]
    fn index_respects_included_types() {
        let docs = vec![
            doc("/about", "About", "hello world"),
            doc("/kosher-posts/tags/bakery", "Bakery tag", "tagged"),
        ];
        let config = SearchConfig::default();
        let records = build_index(&docs, &config);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].path, "/about");
        assert_eq!(records[0].doc_type, "page");

        let mut all_types = config.clone();
        all_types.included_types.push("tag".to_string());
        assert_eq!(build_index(&docs, &all_types).len(), 2);
    }

    #[test]
    fn record_terms_cover_title_and_description() {
        let docs = vec![doc("/about", "Unique Title", "body content here")];
        let records = build_index(&docs, &SearchConfig::default());
        let terms = &records[0].terms;
        assert!(terms.contains(&"unique".to_string()));
        assert!(terms.contains(&"desc".to_string()));
        assert!(terms.contains(&"content".to_string()));
    }
}
