//! Raw page snapshots as produced by the capture stage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One as-captured page, prior to classification.
///
/// Snapshots are the ingestion boundary for scraped data: loading them
/// validates shape through serde, so nothing downstream has to trust a
/// duck-typed payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Fully qualified URL this page was captured from.
    pub url: String,
    /// Normalized mirror path.
    pub path: String,
    /// HTTP status observed for the route.
    pub status: u16,
    /// Raw captured HTML.
    pub html: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub canonical_url: Option<String>,
    #[serde(default)]
    pub og_image: Option<String>,
    #[serde(default)]
    pub headings: Vec<String>,
    /// Same-host links observed in the page, as normalized paths.
    #[serde(default)]
    pub links: Vec<String>,
    /// Binary asset URLs referenced by the page.
    #[serde(default)]
    pub assets: Vec<String>,
    /// Flattened, whitespace-collapsed page text.
    #[serde(default)]
    pub text: String,
    /// Text hash supplied by the capture step, if any.
    #[serde(default)]
    pub text_hash: Option<String>,
    pub captured_at: DateTime<Utc>,
}
