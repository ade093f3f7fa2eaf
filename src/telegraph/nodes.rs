//! HTML → Telegraph node conversion
//!
//! Handles exactly the markup subset the HTML report renderer produces
//! (`h3`, `h4`, `p`, `strong`, `i`, `a href`, `br`). Unbalanced or unknown
//! input degrades to text rather than failing; a report must still publish
//! even if a country name contains something odd.

use serde::Serialize;
use std::collections::BTreeMap;

/// A Telegraph content node: either bare text or a tagged element.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Node {
    Text(String),
    Element(NodeElement),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeElement {
    pub tag: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl NodeElement {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: BTreeMap::new(),
            children: Vec::new(),
        }
    }
}

/// Convert an HTML fragment into Telegraph nodes.
pub fn html_to_nodes(html: &str) -> Vec<Node> {
    let mut root: Vec<Node> = Vec::new();
    let mut stack: Vec<NodeElement> = Vec::new();
    let mut rest = html;

    while !rest.is_empty() {
        match rest.find('<') {
            Some(lt) => {
                if lt > 0 {
                    push_text(&mut root, &mut stack, &rest[..lt]);
                }
                match rest[lt..].find('>') {
                    Some(offset) => {
                        let tag_body = &rest[lt + 1..lt + offset];
                        rest = &rest[lt + offset + 1..];
                        process_tag(&mut root, &mut stack, tag_body);
                    }
                    None => {
                        // stray '<' with no closing '>': keep it as text
                        push_text(&mut root, &mut stack, &rest[lt..]);
                        rest = "";
                    }
                }
            }
            None => {
                push_text(&mut root, &mut stack, rest);
                rest = "";
            }
        }
    }

    // unbalanced opening tags are closed implicitly
    while let Some(element) = stack.pop() {
        append(&mut root, &mut stack, Node::Element(element));
    }

    root
}

fn process_tag(root: &mut Vec<Node>, stack: &mut Vec<NodeElement>, tag_body: &str) {
    let tag_body = tag_body.trim();

    if let Some(name) = tag_body.strip_prefix('/') {
        close_tag(root, stack, name.trim());
        return;
    }

    let self_closing = tag_body.ends_with('/');
    let tag_body = tag_body.trim_end_matches('/').trim_end();

    let (name, attrs_part) = match tag_body.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest),
        None => (tag_body, ""),
    };
    let name = name.to_ascii_lowercase();

    let mut element = NodeElement::new(&name);
    if let Some(href) = extract_attr(attrs_part, "href") {
        element.attrs.insert("href".to_string(), href);
    }

    if self_closing || name == "br" {
        append(root, stack, Node::Element(element));
    } else {
        stack.push(element);
    }
}

fn close_tag(root: &mut Vec<Node>, stack: &mut Vec<NodeElement>, name: &str) {
    let name = name.to_ascii_lowercase();

    // pop until the matching tag; implicitly close anything left open inside
    while let Some(element) = stack.pop() {
        let matched = element.tag == name;
        append(root, stack, Node::Element(element));
        if matched {
            return;
        }
    }
}

fn push_text(root: &mut Vec<Node>, stack: &mut Vec<NodeElement>, text: &str) {
    if text.is_empty() {
        return;
    }
    append(root, stack, Node::Text(unescape(text)));
}

fn append(root: &mut Vec<Node>, stack: &mut Vec<NodeElement>, node: Node) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => root.push(node),
    }
}

fn extract_attr(attrs: &str, name: &str) -> Option<String> {
    let start = attrs.find(&format!("{name}=\""))? + name.len() + 2;
    let end = attrs[start..].find('"')?;
    Some(unescape(&attrs[start..start + end]))
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}
