//! Tab-order focus (expansion: spec.md §4.2's `:focus` pseudoclass
//! needs something that sets `is_focused`; `original_source/layout.py`'s
//! larger variant and the teacher's `page_handler::focus` module walk
//! the document in tree order to find the next/previous focusable
//! element on `Tab`/`Shift+Tab`).

use cinder_dom::{Document, NodeKey};

const FOCUSABLE_TAGS: &[&str] = &["a", "input", "button", "select", "textarea"];

/// Every focusable node in document order.
#[must_use]
pub fn focusable_nodes(doc: &Document) -> Vec<NodeKey> {
    let mut out = Vec::new();
    doc.walk(|key| {
        if doc.get(key).tag().is_some_and(|tag| FOCUSABLE_TAGS.contains(&tag)) {
            out.push(key);
        }
    });
    out
}

/// The node after `current` in tab order, wrapping to the first
/// focusable node; `None` if nothing is focusable.
#[must_use]
pub fn next_focusable(doc: &Document, current: Option<NodeKey>) -> Option<NodeKey> {
    let nodes = focusable_nodes(doc);
    if nodes.is_empty() {
        return None;
    }
    let Some(current) = current else { return nodes.first().copied() };
    let position = nodes.iter().position(|&n| n == current);
    match position {
        Some(index) => Some(nodes[(index + 1) % nodes.len()]),
        None => nodes.first().copied(),
    }
}

/// Sets focus onto `node`, clearing any previous focus (spec.md §3's
/// `is_focused` flag on element nodes, driving the `:focus` pseudoclass
/// in the next style pass).
pub fn set_focus(doc: &mut Document, previous: Option<NodeKey>, node: Option<NodeKey>) {
    if let Some(previous) = previous {
        doc.set_focused(previous, false);
    }
    if let Some(node) = node {
        doc.set_focused(node, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_focusable_cycles_through_inputs() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.new_element("input");
        let b = doc.new_element("input");
        doc.append_child(root, a);
        doc.append_child(root, b);

        assert_eq!(next_focusable(&doc, None), Some(a));
        assert_eq!(next_focusable(&doc, Some(a)), Some(b));
        assert_eq!(next_focusable(&doc, Some(b)), Some(a));
    }

    #[test]
    fn non_focusable_tags_are_skipped() {
        let mut doc = Document::new();
        let root = doc.root();
        let div = doc.new_element("div");
        doc.append_child(root, div);
        assert_eq!(next_focusable(&doc, None), None);
    }
}
