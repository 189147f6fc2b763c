//! HTML sanitizer and embed transformer.
//!
//! Two-stage pure pipeline: `sanitize` neutralizes attacker-controlled
//! markup from the mirrored source, then `transform` applies path-aware
//! presentation rewrites to the known-safe result. Both are synchronous,
//! share no mutable state, and are safe to call concurrently per request.

pub mod clean;
pub mod dom;
pub mod embeds;

pub use clean::{sanitize, sanitize_nodes, sanitize_url};
pub use embeds::PageTransformer;

use crate::config::{SiteConfig, TransformConfig};

/// Sanitize then transform in one call, as the serve path does.
pub fn sanitize_and_transform(
    raw_html: &str,
    path: &str,
    site: &SiteConfig,
    config: &TransformConfig,
) -> String {
    let safe = sanitize(raw_html);
    let hosts = site.internal_hosts();
    PageTransformer::new(&hosts, config).transform(&safe, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;

    #[test]
    fn full_pipeline_strips_and_rewrites() {
        let site = SiteConfig {
            base_url: "https://legacy.example.org".to_string(),
            hosts: vec![],
            expected_route_count: None,
        };
        let config = TransformConfig::default();
        let out = sanitize_and_transform(
            "<script>alert(1)</script>\
             <a href=\"https://legacy.example.org/about\" onclick=\"x()\">About</a>\
             <img src=\"https://cdn.example.net/pic.png\">",
            "/",
            &site,
            &config,
        );
        assert!(!out.contains("<script"));
        assert!(!out.contains("onclick"));
        assert!(out.contains("href=\"/about\""));
        assert!(out.contains("decoding=\"async\""));
    }
}
