//! Plain-text flattening of rich-text bodies
//!
//! Bodies are stored as editor JSON: nested objects with optional
//! `children` arrays and `text` leaves, usually under a `root` node.

use regex_lite::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Nodes nested deeper than this are ignored
pub const MAX_DEPTH: usize = 64;

/// Parsed rich-text node
#[derive(Debug, Clone, PartialEq)]
pub enum RichTextNode {
    /// Literal text leaf
    Text(String),
    /// Element with children (paragraph, list, link, root ...)
    Container(Vec<RichTextNode>),
}

impl RichTextNode {
    /// Parse editor JSON into a node tree. Returns `None` for values that
    /// carry no text.
    pub fn parse(value: &Value) -> Option<Self> {
        Self::parse_at(value, 0)
    }

    fn parse_at(value: &Value, depth: usize) -> Option<Self> {
        if depth > MAX_DEPTH {
            tracing::debug!(depth, "Rich text nesting limit reached, truncating");
            return None;
        }

        match value {
            Value::String(text) => Some(RichTextNode::Text(text.clone())),
            Value::Array(items) => Some(RichTextNode::Container(
                items
                    .iter()
                    .filter_map(|item| Self::parse_at(item, depth + 1))
                    .collect(),
            )),
            Value::Object(map) => {
                if let Some(Value::String(text)) = map.get("text") {
                    return Some(RichTextNode::Text(text.clone()));
                }
                if let Some(children) = map.get("children") {
                    return Self::parse_at(children, depth + 1);
                }
                map.get("root").and_then(|root| Self::parse_at(root, depth + 1))
            }
            _ => None,
        }
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            RichTextNode::Text(text) => out.push(text),
            RichTextNode::Container(children) => {
                for child in children {
                    child.collect(out);
                }
            }
        }
    }

    /// All literal text joined by single spaces
    pub fn plain_text(&self) -> String {
        let mut leaves = Vec::new();
        self.collect(&mut leaves);
        collapse_whitespace(&leaves.join(" "))
    }
}

/// Flatten a stored body into plain text; empty when there is none
pub fn plain_text(body: &Value) -> String {
    RichTextNode::parse(body)
        .map(|node| node.plain_text())
        .unwrap_or_default()
}

/// Collapse whitespace runs to one space and trim
pub fn collapse_whitespace(text: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let re = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace pattern"));
    re.replace_all(text.trim(), " ").into_owned()
}
