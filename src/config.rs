//! Configuration management for SiteMirror.
//!
//! Settings load from `sitemirror.toml` in the data directory, with
//! defaults for everything so a bare `smir init` produces a working setup.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Settings file name inside the data directory.
pub const SETTINGS_FILE: &str = "sitemirror.toml";

/// Binary extensions treated as file routes / asset candidates.
pub const FILE_EXTENSIONS: &[&str] = &[
    "pdf", "jpg", "jpeg", "png", "gif", "webp", "svg", "ico", "mp3", "mp4", "mov", "avi", "webm",
    "wav", "zip", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "csv", "txt",
];

/// Top-level settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub assets: AssetConfig,
    #[serde(default)]
    pub transform: TransformConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

/// The mirrored site and its route baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Base URL of the legacy site being mirrored.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Additional hostnames that count as the site itself (www/apex twins,
    /// CDN hosts serving the same pages).
    #[serde(default)]
    pub hosts: Vec<String>,
    /// Regression guard: expected size of the 200-route set, if known.
    #[serde(default)]
    pub expected_route_count: Option<usize>,
}

impl SiteConfig {
    /// Every hostname considered internal, including the base URL's own.
    pub fn internal_hosts(&self) -> Vec<String> {
        let mut hosts = self.hosts.clone();
        if let Ok(url) = url::Url::parse(&self.base_url) {
            if let Some(host) = url.host_str() {
                if !hosts.iter().any(|h| h == host) {
                    hosts.push(host.to_string());
                }
            }
        }
        hosts
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            hosts: Vec::new(),
            expected_route_count: None,
        }
    }
}

/// Browser capture stage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Page load timeout in seconds.
    #[serde(default = "default_capture_timeout")]
    pub timeout_secs: u64,
    /// Post-load settle delay for late-rendering content, in milliseconds.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Cap on pages captured per run (0 = unlimited).
    #[serde(default)]
    pub max_pages: usize,
    /// Run the browser headless.
    #[serde(default = "default_headless")]
    pub headless: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_capture_timeout(),
            settle_ms: default_settle_ms(),
            max_pages: 0,
            headless: default_headless(),
        }
    }
}

/// Asset collection and blob sync settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Hosts whose URLs are considered media assets when observed in pages.
    #[serde(default)]
    pub media_hosts: Vec<String>,
    /// Namespace prefix for blob keys.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Public base URL blobs are served from.
    #[serde(default = "default_blob_base_url")]
    pub blob_base_url: String,
    /// Per-candidate remote fetch timeout in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            media_hosts: Vec::new(),
            namespace: default_namespace(),
            blob_base_url: default_blob_base_url(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

/// Path-aware HTML transformer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Internal link rewrites: a legacy path served under a new one.
    #[serde(default)]
    pub link_aliases: HashMap<String, String>,
    /// Hosts of the legacy third-party map widget to defer.
    #[serde(default = "default_map_embed_hosts")]
    pub map_embed_hosts: Vec<String>,
    /// Per-path structural fixes applied after sanitization.
    #[serde(default)]
    pub page_fixes: Vec<PageFix>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            link_aliases: HashMap::new(),
            map_embed_hosts: default_map_embed_hosts(),
            page_fixes: Vec::new(),
        }
    }
}

/// A structural fix for one specific page.
///
/// Each fix must no-op when its anchor elements are absent and stay
/// idempotent under repeated application, since snapshot markup varies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageFix {
    /// Path this fix applies to (normalized before comparison).
    pub path: String,
    /// Ensure a container element with this id exists on the page.
    #[serde(default)]
    pub ensure_container: Option<String>,
    /// Element ids to hide.
    #[serde(default)]
    pub hide_ids: Vec<String>,
}

/// Search index builder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Document types included in the index.
    #[serde(default = "default_search_types")]
    pub included_types: Vec<String>,
    /// Cap on deduplicated terms per document.
    #[serde(default = "default_max_terms")]
    pub max_terms: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            included_types: default_search_types(),
            max_terms: default_max_terms(),
        }
    }
}

fn default_base_url() -> String {
    "https://example.com".to_string()
}

fn default_capture_timeout() -> u64 {
    30
}

fn default_settle_ms() -> u64 {
    500
}

fn default_headless() -> bool {
    true
}

fn default_namespace() -> String {
    "mirror".to_string()
}

fn default_blob_base_url() -> String {
    "https://blobs.example.com".to_string()
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_map_embed_hosts() -> Vec<String> {
    vec!["www.embed-map.com".to_string()]
}

fn default_search_types() -> Vec<String> {
    // Raw tag listings are excluded from search by default policy.
    vec![
        "page".to_string(),
        "post".to_string(),
        "news".to_string(),
        "event".to_string(),
        "category".to_string(),
        "profile".to_string(),
    ]
}

fn default_max_terms() -> usize {
    80
}

/// Load settings from the data directory, falling back to defaults.
pub fn load_settings(data_dir: &Path) -> anyhow::Result<Settings> {
    let path = data_dir.join(SETTINGS_FILE);
    if !path.exists() {
        debug!("No {} found, using defaults", SETTINGS_FILE);
        return Ok(Settings::default());
    }
    let raw = fs::read_to_string(&path)?;
    let settings = toml::from_str(&raw)?;
    Ok(settings)
}

/// Write the current settings to the data directory (used by `init`).
pub fn write_settings(data_dir: &Path, settings: &Settings) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(data_dir)?;
    let path = data_dir.join(SETTINGS_FILE);
    fs::write(&path, toml::to_string_pretty(settings)?)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_toml() {
        let settings = Settings::default();
        let raw = toml::to_string_pretty(&settings).unwrap();
        let back: Settings = toml::from_str(&raw).unwrap();
        assert_eq!(back.capture.timeout_secs, 30);
        assert_eq!(back.assets.namespace, "mirror");
        assert!(!back.search.included_types.contains(&"tag".to_string()));
    }

    #[test]
    fn internal_hosts_include_base_url_host() {
        let site = SiteConfig {
            base_url: "https://legacy.example.org".to_string(),
            hosts: vec!["www.legacy.example.org".to_string()],
            expected_route_count: None,
        };
        let hosts = site.internal_hosts();
        assert!(hosts.contains(&"legacy.example.org".to_string()));
        assert!(hosts.contains(&"www.legacy.example.org".to_string()));
    }

    #[test]
    fn load_settings_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings(dir.path()).unwrap();
        assert_eq!(settings.site.base_url, "https://example.com");
    }
}
