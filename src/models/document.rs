//! Classified page documents.
//!
//! A document is the deduplicated, queryable representation of a snapshot.
//! Documents are immutable once written; a rebuild replaces the whole set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Document type, derived purely from path shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Page,
    Post,
    News,
    Event,
    Category,
    Tag,
    Profile,
}

impl DocumentType {
    /// Classify a path by ordered prefix match.
    ///
    /// Total function: anything unrecognized is a plain page.
    pub fn classify(path: &str) -> Self {
        let path = crate::paths::normalize(path);
        if path == "/" {
            return Self::Page;
        }
        if path.starts_with("/post/") {
            Self::Post
        } else if path.starts_with("/news/") {
            Self::News
        } else if path.starts_with("/events-1/") {
            Self::Event
        } else if path.starts_with("/kosher-posts/categories/") {
            Self::Category
        } else if path.starts_with("/kosher-posts/tags/") {
            Self::Tag
        } else if path.starts_with("/profile/") {
            Self::Profile
        } else {
            Self::Page
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Post => "post",
            Self::News => "news",
            Self::Event => "event",
            Self::Category => "category",
            Self::Tag => "tag",
            Self::Profile => "profile",
        }
    }
}

/// One classified, content-addressed page document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDocument {
    /// Stable id: SHA-1 of the normalized path.
    pub id: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub path: String,
    /// Canonical URL for the page.
    pub url: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub canonical_url: Option<String>,
    #[serde(default)]
    pub og_image: Option<String>,
    pub headings: Vec<String>,
    /// Flattened, whitespace-collapsed text.
    pub text: String,
    pub text_hash: String,
    pub links: Vec<String>,
    /// Referenced binary asset URLs.
    pub assets: Vec<String>,
    /// Noise-stripped body markup.
    pub body_html: String,
    /// Head styles plus body markup, ready for sanitize-and-serve.
    pub render_html: String,
    pub captured_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_prefixes() {
        assert_eq!(DocumentType::classify("/"), DocumentType::Page);
        assert_eq!(DocumentType::classify("/post/foo"), DocumentType::Post);
        assert_eq!(DocumentType::classify("/news/2024"), DocumentType::News);
        assert_eq!(DocumentType::classify("/events-1/purim"), DocumentType::Event);
        assert_eq!(
            DocumentType::classify("/kosher-posts/categories/meat"),
            DocumentType::Category
        );
        assert_eq!(
            DocumentType::classify("/kosher-posts/tags/bakery"),
            DocumentType::Tag
        );
        assert_eq!(DocumentType::classify("/profile/abc"), DocumentType::Profile);
    }

    #[test]
    fn classify_defaults_to_page() {
        assert_eq!(DocumentType::classify("/random/page"), DocumentType::Page);
        assert_eq!(DocumentType::classify("/kosher-posts"), DocumentType::Page);
        // Prefix match requires the trailing segment separator
        assert_eq!(DocumentType::classify("/postscript"), DocumentType::Page);
    }

    #[test]
    fn classify_normalizes_first() {
        assert_eq!(DocumentType::classify("post/foo/"), DocumentType::Post);
    }
}
