//! Field extraction from captured HTML.
//!
//! Pure functions: the browser produces raw HTML, everything derived from
//! it (SEO metadata, headings, links, assets, flattened text) is computed
//! here so it stays testable without a browser.

use scraper::{Html, Selector};
use url::Url;

use crate::paths;
use crate::sanitize::dom::{self, Node};
use crate::utils::{collapse_whitespace, dedup_preserve_order};

/// Everything derived from one captured page.
#[derive(Debug, Default)]
pub struct ExtractedFields {
    pub title: String,
    pub description: String,
    pub canonical_url: Option<String>,
    pub og_image: Option<String>,
    pub headings: Vec<String>,
    pub links: Vec<String>,
    pub assets: Vec<String>,
    pub text: String,
    pub body_html: String,
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

/// Derive snapshot fields from captured HTML.
pub fn extract_fields(
    html: &str,
    base: &Url,
    internal_hosts: &[String],
    media_hosts: &[String],
) -> ExtractedFields {
    let document = Html::parse_document(html);

    let title = document
        .select(&selector("title"))
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .unwrap_or_default();

    let description = document
        .select(&selector("meta[name=\"description\"]"))
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|c| collapse_whitespace(c))
        .unwrap_or_default();

    let canonical_url = document
        .select(&selector("link[rel=\"canonical\"]"))
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(str::to_string);

    let og_image = document
        .select(&selector("meta[property=\"og:image\"]"))
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::to_string);

    let headings = dedup_preserve_order(
        document
            .select(&selector("h1, h2, h3"))
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .filter(|h| !h.is_empty())
            .collect(),
    );

    let mut links = Vec::new();
    for el in document.select(&selector("a[href]")) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let Ok(absolute) = base.join(href.trim()) else {
            continue;
        };
        if let Some(path) = crate::discovery::internal_path(absolute.as_str(), internal_hosts) {
            links.push(path);
        }
    }
    let links = dedup_preserve_order(links);

    let assets = dedup_preserve_order(collect_assets(
        &document,
        base,
        internal_hosts,
        media_hosts,
    ));

    let body_html = document
        .select(&selector("body"))
        .next()
        .map(|el| el.inner_html())
        .unwrap_or_default();

    let text = flatten_text(&body_html);

    ExtractedFields {
        title,
        description,
        canonical_url,
        og_image,
        headings,
        links,
        assets,
        text,
        body_html,
    }
}

/// Binary asset URLs referenced by the page.
fn collect_assets(
    document: &Html,
    base: &Url,
    internal_hosts: &[String],
    media_hosts: &[String],
) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::new();

    for el in document.select(&selector("img[src], source[src], video[poster], audio[src]")) {
        for attr in ["src", "poster"] {
            if let Some(value) = el.value().attr(attr) {
                candidates.push(value.to_string());
            }
        }
    }
    for el in document.select(&selector("img[srcset], source[srcset]")) {
        if let Some(srcset) = el.value().attr("srcset") {
            for candidate in crate::sanitize::clean::split_srcset(srcset) {
                if let Some(url) = candidate.split_whitespace().next() {
                    candidates.push(url.to_string());
                }
            }
        }
    }
    // File-like links (menus, flyers) count as assets too
    for el in document.select(&selector("a[href]")) {
        if let Some(href) = el.value().attr("href") {
            if paths::file_extension(href)
                .map(|ext| crate::config::FILE_EXTENSIONS.contains(&ext.as_str()))
                .unwrap_or(false)
            {
                candidates.push(href.to_string());
            }
        }
    }

    candidates
        .into_iter()
        .filter_map(|raw| {
            let absolute = base.join(raw.trim()).ok()?;
            if !matches!(absolute.scheme(), "http" | "https") {
                return None;
            }
            let host = absolute.host_str()?;
            let is_media_host = media_hosts.iter().any(|h| h == host);
            let is_internal_file = internal_hosts.iter().any(|h| h == host)
                && paths::file_extension(absolute.path())
                    .map(|ext| crate::config::FILE_EXTENSIONS.contains(&ext.as_str()))
                    .unwrap_or(false);
            if is_media_host || is_internal_file {
                Some(absolute.to_string())
            } else {
                None
            }
        })
        .collect()
}

/// Flattened, whitespace-collapsed page text, skipping non-content tags.
pub fn flatten_text(body_html: &str) -> String {
    let nodes = dom::parse_fragment(body_html);
    let mut parts = Vec::new();
    collect_text(&nodes, &mut parts);
    collapse_whitespace(&parts.join(" "))
}

fn collect_text(nodes: &[Node], out: &mut Vec<String>) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push(text.clone()),
            Node::Element(el) => {
                if matches!(el.name.as_str(), "script" | "style" | "noscript") {
                    continue;
                }
                collect_text(&el.children, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!doctype html>
<html>
<head>
  <title> Kosher  Bakery </title>
  <meta name="description" content="Fresh   bread daily">
  <link rel="canonical" href="https://legacy.example.org/bakery">
  <meta property="og:image" content="https://media.example.net/bakery.jpg">
  <style>body { color: red; }</style>
</head>
<body>
  <h1>Bakery</h1>
  <h2>Hours</h2>
  <h2>Hours</h2>
  <p>Open <b>daily</b> from 7am.</p>
  <script>var tracked = true;</script>
  <a href="/menu.pdf">Menu</a>
  <a href="/about/">About us</a>
  <a href="https://elsewhere.example.com/x">external</a>
  <img src="https://media.example.net/shop.png">
  <img src="/interior.jpg">
</body>
</html>"#;

    fn extract() -> ExtractedFields {
        let base = Url::parse("https://legacy.example.org/bakery").unwrap();
        extract_fields(
            PAGE,
            &base,
            &["legacy.example.org".to_string()],
            &["media.example.net".to_string()],
        )
    }

    #[test]
    fn metadata_fields() {
        let fields = extract();
        assert_eq!(fields.title, "Kosher Bakery");
        assert_eq!(fields.description, "Fresh bread daily");
        assert_eq!(
            fields.canonical_url.as_deref(),
            Some("https://legacy.example.org/bakery")
        );
        assert_eq!(
            fields.og_image.as_deref(),
            Some("https://media.example.net/bakery.jpg")
        );
    }

    #[test]
    fn headings_are_deduplicated() {
        let fields = extract();
        assert_eq!(fields.headings, vec!["Bakery", "Hours"]);
    }

    #[test]
    fn links_are_internal_normalized_paths() {
        let fields = extract();
        assert!(fields.links.contains(&"/menu.pdf".to_string()));
        assert!(fields.links.contains(&"/about".to_string()));
        assert!(!fields.links.iter().any(|l| l.contains("elsewhere")));
    }

    #[test]
    fn assets_cover_media_hosts_and_internal_files() {
        let fields = extract();
        assert!(fields
            .assets
            .contains(&"https://media.example.net/shop.png".to_string()));
        assert!(fields
            .assets
            .contains(&"https://legacy.example.org/interior.jpg".to_string()));
        assert!(fields
            .assets
            .contains(&"https://legacy.example.org/menu.pdf".to_string()));
    }

    #[test]
    fn text_skips_scripts_and_styles() {
        let fields = extract();
        assert!(fields.text.contains("Open daily from 7am."));
        assert!(!fields.text.contains("tracked"));
        assert!(!fields.text.contains("color: red"));
    }
}
