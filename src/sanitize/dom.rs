//! Minimal owned DOM for sanitizer and transformer rules.
//!
//! HTML is parsed through `scraper` and converted into an owned tree so
//! the rule code mutates plain data instead of a parsing library's node
//! handles. Serialization is conservative: text and attribute values are
//! re-escaped on the way out regardless of how they were spelled in the
//! input.

use ego_tree::NodeRef;
use scraper::node::Node as ScraperNode;
use scraper::Html;

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// One node of the owned tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An element with ordered attributes and children.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: &str) {
        if let Some(entry) = self
            .attrs
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            entry.1 = value.to_string();
        } else {
            self.attrs.push((name.to_string(), value.to_string()));
        }
    }

    pub fn remove_attr(&mut self, name: &str) {
        self.attrs.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }
}

/// Parse an HTML fragment into owned nodes.
///
/// Never fails: malformed input parses to whatever tree html5ever can
/// recover, worst case an empty list.
pub fn parse_fragment(html: &str) -> Vec<Node> {
    let fragment = Html::parse_fragment(html);
    let mut nodes = convert_children(fragment.tree.root());

    // Fragment parsing wraps everything in a synthetic <html> root
    if nodes.len() == 1 {
        if let Node::Element(el) = &nodes[0] {
            if el.name == "html" {
                if let Some(Node::Element(el)) = nodes.pop() {
                    return el.children;
                }
            }
        }
    }
    nodes
}

fn convert_children(parent: NodeRef<'_, ScraperNode>) -> Vec<Node> {
    let mut out = Vec::new();
    for child in parent.children() {
        match child.value() {
            ScraperNode::Element(element) => {
                out.push(Node::Element(Element {
                    name: element.name().to_string(),
                    attrs: element
                        .attrs()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                    children: convert_children(child),
                }));
            }
            ScraperNode::Text(text) => {
                let value: &str = &text;
                out.push(Node::Text(value.to_string()));
            }
            ScraperNode::Document | ScraperNode::Fragment => {
                out.extend(convert_children(child));
            }
            // Comments, doctypes and processing instructions carry no
            // renderable content for a mirror
            _ => {}
        }
    }
    out
}

/// Serialize owned nodes back to HTML.
pub fn serialize(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        serialize_node(node, &mut out);
    }
    out
}

fn serialize_node(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => out.push_str(&escape_text(text)),
        Node::Element(el) => {
            out.push('<');
            out.push_str(&el.name);
            for (name, value) in &el.attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape_attr(value));
                out.push('"');
            }
            out.push('>');

            if VOID_ELEMENTS.contains(&el.name.as_str()) {
                return;
            }

            if el.name == "style" {
                // Raw-text element: CSS must not be entity-escaped, but
                // '<' never occurs in valid CSS and could close the tag
                for child in &el.children {
                    if let Node::Text(text) = child {
                        out.push_str(&text.replace('<', ""));
                    }
                }
            } else {
                for child in &el.children {
                    serialize_node(child, out);
                }
            }

            out.push_str("</");
            out.push_str(&el.name);
            out.push('>');
        }
    }
}

/// Pre-order mutable visit over every element in the tree.
pub fn for_each_element_mut<F: FnMut(&mut Element)>(nodes: &mut [Node], f: &mut F) {
    for node in nodes {
        if let Node::Element(el) = node {
            f(el);
            for_each_element_mut(&mut el.children, f);
        }
    }
}

/// Find an element by id anywhere in the tree.
pub fn find_by_id<'a>(nodes: &'a mut [Node], id: &str) -> Option<&'a mut Element> {
    for node in nodes {
        if let Node::Element(el) = node {
            if el.attr("id") == Some(id) {
                return Some(el);
            }
            if let Some(found) = find_by_id(&mut el.children, id) {
                return Some(found);
            }
        }
    }
    None
}

pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}
