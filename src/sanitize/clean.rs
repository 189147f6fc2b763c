//! Allow-list HTML sanitizer.
//!
//! The mirrored source is untrusted input: this pass removes executable
//! markup outright, unwraps unknown tags (keeping their content), and
//! filters every attribute through scheme and pattern checks. Disallowed
//! input is never an error — it is silently stripped, and the worst case
//! for garbage input is an empty fragment.

use std::sync::OnceLock;

use regex::Regex;

use super::dom::{self, Element, Node};

/// Elements removed entirely, children included.
const REMOVED_TAGS: &[&str] = &[
    "script", "noscript", "object", "embed", "template", "meta", "base",
];

/// Elements kept as-is (attributes still filtered).
const ALLOWED_TAGS: &[&str] = &[
    // Document structure
    "a", "abbr", "address", "article", "aside", "b", "blockquote", "br", "button", "caption",
    "cite", "code", "col", "colgroup", "dd", "del", "details", "div", "dl", "dt", "em",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr",
    "i", "iframe", "img", "input", "ins", "kbd", "label", "li", "link", "main", "mark", "nav",
    "ol", "option", "p", "picture", "pre", "q", "s", "section", "select", "small", "source",
    "span", "strong", "style", "sub", "summary", "sup", "table", "tbody", "td", "textarea",
    "tfoot", "th", "thead", "time", "tr", "u", "ul", "video", "audio", "track", "wbr",
    // SVG primitives
    "svg", "path", "g", "defs", "use", "circle", "rect", "ellipse", "line", "polyline",
    "polygon", "text", "tspan", "clippath", "lineargradient", "radialgradient", "stop", "symbol",
    "mask", "pattern", "filter", "title", "desc",
];

/// Attributes that carry URLs and get scheme-checked.
const URL_ATTRS: &[&str] = &[
    "href", "src", "action", "poster", "data-src", "data-href", "formaction", "xlink:href",
];

/// Sanitize raw mirrored HTML into safe markup.
pub fn sanitize(raw: &str) -> String {
    let nodes = dom::parse_fragment(raw);
    let clean = sanitize_nodes(nodes);
    dom::serialize(&clean)
}

/// Sanitize a parsed tree in place of the string pipeline.
pub fn sanitize_nodes(nodes: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::new();
    for node in nodes {
        match node {
            Node::Text(text) => out.push(Node::Text(text)),
            Node::Element(mut el) => {
                let name = el.name.to_ascii_lowercase();
                if REMOVED_TAGS.contains(&name.as_str()) {
                    continue;
                }

                let children = sanitize_nodes(std::mem::take(&mut el.children));

                // Unknown tags are unwrapped, not dropped: the wrapper goes,
                // the content stays. Custom elements (hyphenated) pass.
                if !ALLOWED_TAGS.contains(&name.as_str()) && !name.contains('-') {
                    out.extend(children);
                    continue;
                }

                sanitize_attributes(&mut el);
                el.children = children;
                out.push(Node::Element(el));
            }
        }
    }
    out
}

fn sanitize_attributes(el: &mut Element) {
    let tag = el.name.to_ascii_lowercase();
    let mut kept: Vec<(String, String)> = Vec::new();

    for (name, value) in el.attrs.drain(..) {
        let lower = name.to_ascii_lowercase();

        // Event handlers and srcdoc never survive
        if lower.starts_with("on") || lower == "srcdoc" {
            continue;
        }

        if lower == "style" {
            if let Some(cleaned) = sanitize_style(&value) {
                kept.push((name, cleaned));
            }
            continue;
        }

        if lower == "srcset" {
            if let Some(cleaned) = sanitize_srcset(&value) {
                kept.push((name, cleaned));
            }
            continue;
        }

        if URL_ATTRS.contains(&lower.as_str()) {
            if let Some(cleaned) = sanitize_url(&value) {
                kept.push((name, cleaned));
            }
            continue;
        }

        kept.push((name, value));
    }

    el.attrs = kept;

    // Anchors escaping to a new tab must not leak an opener handle
    if tag == "a" && el.attr("target") == Some("_blank") {
        let mut rel: Vec<String> = el
            .attr("rel")
            .map(|r| r.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        for required in ["noopener", "noreferrer"] {
            if !rel.iter().any(|t| t == required) {
                rel.push(required.to_string());
            }
        }
        el.set_attr("rel", &rel.join(" "));
    }
}

/// Keep a style attribute only when its normalized value is inert.
fn sanitize_style(value: &str) -> Option<String> {
    let normalized: String = value
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    if normalized.contains("expression(")
        || normalized.contains("javascript:")
        || normalized.contains("url(data:text/html")
    {
        return None;
    }
    Some(value.trim().to_string())
}

/// Scheme policy for URL-bearing attributes.
///
/// Allows absolute http(s), `mailto:`, `tel:`, strict base64 image data
/// URIs, root-relative, `./`, `../`, `#`, `?` and schemeless relative
/// paths. Everything else with a scheme is rejected.
pub fn sanitize_url(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some(String::new());
    }

    // Whitespace and control characters inside the scheme are a classic
    // filter bypass ("java\tscript:"), so sniff on a compacted form
    let compact: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();

    if compact.starts_with("javascript:") || compact.starts_with("vbscript:") {
        return None;
    }

    if compact.starts_with("data:") {
        return if data_image_re().is_match(trimmed) {
            Some(trimmed.to_string())
        } else {
            None
        };
    }

    if compact.starts_with("http://")
        || compact.starts_with("https://")
        || compact.starts_with("mailto:")
        || compact.starts_with("tel:")
    {
        return Some(trimmed.to_string());
    }

    if trimmed.starts_with('/')
        || trimmed.starts_with("./")
        || trimmed.starts_with("../")
        || trimmed.starts_with('#')
        || trimmed.starts_with('?')
    {
        return Some(trimmed.to_string());
    }

    // Any other scheme-looking value is rejected
    if let Some(colon) = compact.find(':') {
        let before = &compact[..colon];
        if !before.contains('/') && !before.contains('?') && !before.contains('#') {
            return None;
        }
    }

    // Schemeless relative path
    Some(trimmed.to_string())
}

fn data_image_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // SVG data URIs are excluded: they can carry script
    RE.get_or_init(|| {
        Regex::new(r"^(?i)data:image/(png|jpe?g|gif|webp|avif);base64,[a-z0-9+/=]+$")
            .expect("static regex")
    })
}

/// Sanitize a srcset, dropping the attribute when no candidate survives.
fn sanitize_srcset(value: &str) -> Option<String> {
    let mut kept = Vec::new();
    for candidate in split_srcset(value) {
        let mut parts = candidate.split_whitespace();
        let Some(url) = parts.next() else {
            continue;
        };
        let descriptor = parts.collect::<Vec<_>>().join(" ");
        if let Some(clean) = sanitize_url(url) {
            if descriptor.is_empty() {
                kept.push(clean);
            } else {
                kept.push(format!("{clean} {descriptor}"));
            }
        }
    }
    if kept.is_empty() {
        None
    } else {
        Some(kept.join(", "))
    }
}

/// Split a srcset into candidate strings.
///
/// Naive comma-splitting breaks on URLs containing commas in query
/// strings, so a comma only separates candidates when it is outside
/// quotes and parentheses and the next non-space text looks like the
/// start of a URL.
pub fn split_srcset(value: &str) -> Vec<String> {
    let chars: Vec<char> = value.chars().collect();
    let mut out = Vec::new();
    let mut current = String::new();
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;

    for (i, &c) in chars.iter().enumerate() {
        match c {
            '\'' | '"' => {
                if quote == Some(c) {
                    quote = None;
                } else if quote.is_none() {
                    quote = Some(c);
                }
                current.push(c);
            }
            '(' if quote.is_none() => {
                depth += 1;
                current.push(c);
            }
            ')' if quote.is_none() => {
                depth -= 1;
                current.push(c);
            }
            ',' if quote.is_none() && depth <= 0 => {
                let rest: String = chars[i + 1..].iter().collect();
                if looks_like_url_start(rest.trim_start()) {
                    if !current.trim().is_empty() {
                        out.push(current.trim().to_string());
                    }
                    current.clear();
                } else {
                    current.push(c);
                }
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        out.push(current.trim().to_string());
    }
    out
}

fn looks_like_url_start(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://") || s.starts_with('/') || s.starts_with("data:")
}
