//! Path-aware presentation rewrites applied to known-safe markup.
//!
//! Runs strictly after the sanitizer. Internal absolute links become
//! root-relative, third-party map/video iframes are replaced with inert
//! click-to-load placeholders, a handful of per-page structural fixes are
//! applied, and media elements get loading hints. Every step no-ops when
//! its anchor elements are absent, since snapshot markup varies.

use url::Url;

use super::dom::{self, Element, Node};
use crate::config::TransformConfig;
use crate::paths;

/// Query parameters stripped from YouTube embed URLs.
const YOUTUBE_TRACKING_PARAMS: &[&str] = &["si", "feature", "wmode", "ab_channel"];

/// YouTube hostnames recognized as embed sources.
const YOUTUBE_HOSTS: &[&str] = &[
    "www.youtube.com",
    "youtube.com",
    "m.youtube.com",
    "www.youtube-nocookie.com",
    "youtube-nocookie.com",
];

/// Google Maps hostnames recognized as embed sources.
const GOOGLE_MAPS_HOSTS: &[&str] = &["www.google.com", "google.com", "maps.google.com"];

/// Path-aware transformer over sanitized markup.
pub struct PageTransformer<'a> {
    internal_hosts: &'a [String],
    config: &'a TransformConfig,
}

impl<'a> PageTransformer<'a> {
    pub fn new(internal_hosts: &'a [String], config: &'a TransformConfig) -> Self {
        Self {
            internal_hosts,
            config,
        }
    }

    /// Transform sanitized HTML for serving under the mirror's routes.
    pub fn transform(&self, safe_html: &str, path: &str) -> String {
        let mut nodes = dom::parse_fragment(safe_html);
        self.rewrite_links(&mut nodes);
        self.defer_embeds(&mut nodes);
        self.apply_page_fixes(&mut nodes, path);
        apply_media_hints(&mut nodes);
        dom::serialize(&nodes)
    }

    /// Rewrite absolute links at the mirrored site's own hosts to
    /// root-relative paths, then apply the legacy alias map.
    fn rewrite_links(&self, nodes: &mut [Node]) {
        dom::for_each_element_mut(nodes, &mut |el| {
            for attr in ["href", "data-href"] {
                if let Some(value) = el.attr(attr).map(str::to_string) {
                    if let Some(rewritten) = self.rewrite_link(&value) {
                        if rewritten != value {
                            el.set_attr(attr, &rewritten);
                        }
                    }
                }
            }
        });
    }

    fn rewrite_link(&self, value: &str) -> Option<String> {
        let relative = match Url::parse(value) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {
                let host = parsed.host_str()?;
                if !self.internal_hosts.iter().any(|h| h == host) {
                    return None;
                }
                let mut out = parsed.path().to_string();
                if let Some(query) = parsed.query() {
                    out.push('?');
                    out.push_str(query);
                }
                if let Some(fragment) = parsed.fragment() {
                    out.push('#');
                    out.push_str(fragment);
                }
                out
            }
            // Non-http(s) absolute URLs are left alone
            Ok(_) => return None,
            // Already relative
            Err(_) => value.to_string(),
        };

        if !relative.starts_with('/') {
            return Some(relative);
        }

        // Legacy alias: a retired path served under its replacement
        let (pathname, query) = paths::split_query(&relative);
        let normalized = paths::normalize(pathname);
        if let Some(replacement) = self.config.link_aliases.get(&normalized) {
            let mut out = replacement.clone();
            if let Some(q) = query {
                out.push_str(q);
            }
            return Some(out);
        }
        Some(relative)
    }

    /// Replace recognized third-party iframes with click-to-load shells.
    fn defer_embeds(&self, nodes: &mut [Node]) {
        dom::for_each_element_mut(nodes, &mut |el| {
            if el.name != "iframe" {
                return;
            }
            // Idempotent under repeated application
            if el.has_attr("data-deferred-src") {
                return;
            }
            let Some(src) = el.attr("src").map(str::to_string) else {
                return;
            };
            let Ok(parsed) = Url::parse(&src) else {
                return;
            };
            let Some(embed) = classify_embed(&parsed, &self.config.map_embed_hosts) else {
                return;
            };
            let final_url = embed.final_url;
            el.set_attr("data-deferred-src", &final_url);
            el.set_attr("srcdoc", &placeholder_srcdoc(&final_url, embed.thumbnail.as_deref()));
            el.set_attr("src", "about:blank");
        });
    }

    /// Structural fixes for specific pages, guarded to stay idempotent.
    fn apply_page_fixes(&self, nodes: &mut Vec<Node>, path: &str) {
        let path = paths::normalize(path);
        for fix in &self.config.page_fixes {
            if paths::normalize(&fix.path) != path {
                continue;
            }
            if let Some(container_id) = &fix.ensure_container {
                if dom::find_by_id(nodes, container_id).is_none() {
                    let mut container = Element::new("div");
                    container.set_attr("id", container_id);
                    nodes.push(Node::Element(container));
                }
            }
            for hide_id in &fix.hide_ids {
                if let Some(el) = dom::find_by_id(nodes, hide_id) {
                    let style = el.attr("style").unwrap_or("").to_string();
                    if !style.replace(' ', "").contains("display:none") {
                        let style = if style.trim().is_empty() {
                            "display:none".to_string()
                        } else {
                            format!("{}; display:none", style.trim_end_matches(';').trim())
                        };
                        el.set_attr("style", &style);
                    }
                }
            }
        }
    }
}

struct EmbedRewrite {
    final_url: String,
    thumbnail: Option<String>,
}

/// Recognize the embed families that get deferred.
fn classify_embed(url: &Url, map_embed_hosts: &[String]) -> Option<EmbedRewrite> {
    let host = url.host_str()?;

    // Legacy map widget
    if map_embed_hosts.iter().any(|h| h == host) {
        return Some(EmbedRewrite {
            final_url: url.to_string(),
            thumbnail: None,
        });
    }

    // YouTube embeds: strip tracking params, switch to the
    // privacy-enhanced domain
    if YOUTUBE_HOSTS.contains(&host) && url.path().starts_with("/embed/") {
        let mut rewritten = url.clone();
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| !YOUTUBE_TRACKING_PARAMS.contains(&k.as_ref()))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        rewritten.set_query(None);
        if !kept.is_empty() {
            let mut pairs = rewritten.query_pairs_mut();
            for (k, v) in &kept {
                pairs.append_pair(k, v);
            }
        }
        let _ = rewritten.set_host(Some("www.youtube-nocookie.com"));
        let video_id = url
            .path()
            .trim_start_matches("/embed/")
            .split('/')
            .next()
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        return Some(EmbedRewrite {
            final_url: rewritten.to_string(),
            thumbnail: video_id.map(|id| format!("https://i.ytimg.com/vi/{id}/hqdefault.jpg")),
        });
    }

    // Generic Google Maps embeds
    if GOOGLE_MAPS_HOSTS.contains(&host) && url.path().starts_with("/maps") {
        return Some(EmbedRewrite {
            final_url: url.to_string(),
            thumbnail: None,
        });
    }

    None
}

/// Inert placeholder document for a deferred embed.
///
/// Contains only a styled link (and optionally a thumbnail image); no
/// third-party code loads until the user interacts.
fn placeholder_srcdoc(url: &str, thumbnail: Option<&str>) -> String {
    let href = dom::escape_attr(url);
    let body = match thumbnail {
        Some(thumb) => format!(
            "<img src=\"{}\" alt=\"\" style=\"position:absolute;inset:0;width:100%;height:100%;object-fit:cover\">\
             <span style=\"position:relative;padding:10px 18px;background:rgba(0,0,0,.7);color:#fff;border-radius:4px\">&#9654; Load</span>",
            dom::escape_attr(thumb)
        ),
        None => "<span style=\"padding:10px 18px;background:#eee;border-radius:4px\">&#9654; Load map</span>"
            .to_string(),
    };
    format!(
        "<html><body style=\"margin:0\">\
         <a href=\"{href}\" target=\"_blank\" rel=\"noopener noreferrer\" \
         style=\"position:relative;display:flex;align-items:center;justify-content:center;\
         width:100%;height:100vh;text-decoration:none;font-family:sans-serif\">{body}</a>\
         </body></html>"
    )
}


/// Add decode/lazy-load hints to media elements.
fn apply_media_hints(nodes: &mut [Node]) {
    let mut image_index = 0usize;
    dom::for_each_element_mut(nodes, &mut |el| {
        let high_priority =
            el.attr("fetchpriority") == Some("high") || el.attr("data-priority") == Some("high");
        match el.name.as_str() {
            "img" => {
                if !el.has_attr("decoding") {
                    el.set_attr("decoding", "async");
                }
                if image_index >= 2 && !el.has_attr("loading") && !high_priority {
                    el.set_attr("loading", "lazy");
                }
                image_index += 1;
            }
            "iframe" => {
                if !el.has_attr("loading") && !high_priority {
                    el.set_attr("loading", "lazy");
                }
            }
            _ => {}
        }
    });
}
