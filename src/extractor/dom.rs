//! Small kuchiki helpers shared by the selector and the sanitizer.
//!
//! `NodeRef` is `Rc`-based and therefore `!Send`; everything here is
//! synchronous and nothing returned from this module should be held across
//! an `.await`.

use kuchiki::iter::NodeIterator;
use kuchiki::traits::TendrilSink;
use kuchiki::{ElementData, NodeDataRef, NodeRef};

pub fn parse_document(html: &str) -> NodeRef {
    kuchiki::parse_html().one(html)
}

/// Parse an HTML fragment and return its container element.
///
/// The explicit `<body>` keeps the parser in body mode so leading `<script>`
/// or `<style>` tags stay in the fragment instead of moving to `<head>`.
pub fn parse_fragment(html: &str) -> NodeRef {
    let document = kuchiki::parse_html().one(format!("<body>{html}</body>"));
    match document.select_first("body") {
        Ok(body) => body.as_node().clone(),
        Err(()) => document,
    }
}

/// Serialized children of `node`, without the node's own tags.
pub fn inner_html(node: &NodeRef) -> String {
    node.children().map(|child| child.to_string()).collect()
}

/// Escaped text suitable for embedding in markup.
pub fn escape_text(text: &str) -> String {
    NodeRef::new_text(text).to_string()
}

pub fn trimmed_len(text: &str) -> usize {
    text.trim().chars().count()
}

/// Length of `text` with every whitespace run folded to a single space.
pub fn collapsed_len(text: &str) -> usize {
    let (words, chars) = text
        .split_whitespace()
        .fold((0usize, 0usize), |(w, c), word| (w + 1, c + word.chars().count()));
    chars + words.saturating_sub(1)
}

/// Lowercased `class` and `id` attributes, space separated.
pub fn label_of(element: &NodeDataRef<ElementData>) -> String {
    let attributes = element.attributes.borrow();
    let class = attributes.get("class").unwrap_or_default();
    let id = attributes.get("id").unwrap_or_default();
    format!("{class} {id}").to_lowercase()
}

/// Detach every element below `root` matching `selector`. Returns how many
/// were removed; an invalid selector removes nothing.
pub fn remove_matching(root: &NodeRef, selector: &str) -> usize {
    let Ok(matches) = root.descendants().select(selector) else {
        return 0;
    };
    // Collect first: detaching while the iterator walks the tree skips nodes.
    let matches: Vec<_> = matches.collect();
    for element in &matches {
        element.as_node().detach();
    }
    matches.len()
}

/// Matching elements strictly below `root`, in document order.
pub fn select_all(root: &NodeRef, selector: &str) -> Vec<NodeDataRef<ElementData>> {
    root.descendants()
        .select(selector)
        .map(|matches| matches.collect())
        .unwrap_or_default()
}

/// Number of matching elements strictly below `root`.
pub fn count_matching(root: &NodeRef, selector: &str) -> usize {
    root.descendants()
        .select(selector)
        .map(|matches| matches.count())
        .unwrap_or(0)
}

/// Every element below `root`, in document order.
pub fn elements(root: &NodeRef) -> Vec<NodeDataRef<ElementData>> {
    root.descendants().elements().collect()
}

/// Text length of an HTML fragment once tags are dropped.
pub fn fragment_text_len(html: &str) -> usize {
    trimmed_len(&parse_fragment(html).text_contents())
}
