//! Accessibility surface hook. spec.md's Non-goals exclude
//! "accessibility beyond surface hooks" — that phrasing invites exactly
//! a surface hook: a post-layout walk producing `(NodeKey, role, label,
//! rect)` tuples for focusable/text nodes, not wired into any OS AT
//! API. Grounded on
//! `BigBadE-valor/crates/page_handler/src/accessibility.rs`'s
//! tag-to-role mapping and aria-label/alt/text-content name derivation,
//! adapted onto this crate's `LayoutArena` instead of building a
//! parallel tree, and returning owned strings rather than leaking role
//! strings to `'static`.

use crate::object::{LayoutArena, LayoutKind};
use cinder_display::Rect;
use cinder_dom::{Document, NodeData, NodeKey};

/// One accessibility-tree entry.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessibilityNode {
    pub node: NodeKey,
    pub role: String,
    pub label: String,
    pub rect: Rect,
}

/// Walks `arena`'s laid-out tree producing an accessibility entry for
/// every focusable element and every run of text, paired against `doc`
/// for tag/attribute/text lookups. Plain container blocks with no
/// recognized role and no `role`/`aria-label`/`alt` override are
/// skipped — they have no accessible presence of their own.
#[must_use]
pub fn accessibility_tree(arena: &LayoutArena, doc: &Document) -> Vec<AccessibilityNode> {
    let mut out = Vec::new();
    for layout_node in &arena.nodes {
        match layout_node.kind {
            LayoutKind::Block | LayoutKind::Input | LayoutKind::Image | LayoutKind::Iframe => {
                let data = doc.get(layout_node.node);
                let Some(tag) = data.tag() else { continue };
                if !is_focusable(tag, data) {
                    continue;
                }
                out.push(AccessibilityNode {
                    node: layout_node.node,
                    role: role_for(tag, data),
                    label: name_for(data),
                    rect: layout_node.self_rect(&arena.graph),
                });
            }
            LayoutKind::Text => {
                let data = doc.get(layout_node.node);
                let text = collapse_whitespace(data.text().unwrap_or(""));
                if text.is_empty() {
                    continue;
                }
                out.push(AccessibilityNode {
                    node: layout_node.node,
                    role: "text".to_owned(),
                    label: text,
                    rect: layout_node.self_rect(&arena.graph),
                });
            }
            LayoutKind::Document | LayoutKind::Line => {}
        }
    }
    out
}

/// Whether `tag` has an accessible presence worth surfacing: either an
/// explicit `role`/`aria-label` override, or a tag this mapping
/// recognizes as more than a plain container.
fn is_focusable(tag: &str, data: &NodeData) -> bool {
    data.attribute("role").is_some() || data.attribute("aria-label").is_some() || role_for(tag, data) != "generic"
}

fn role_for(tag: &str, data: &NodeData) -> String {
    if let Some(role) = data.attribute("role") {
        return role.to_owned();
    }
    match tag {
        "a" => "link",
        "button" => "button",
        "img" => "img",
        "input" | "textarea" => "textbox",
        "ul" | "ol" => "list",
        "li" => "listitem",
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => "heading",
        _ => "generic",
    }
    .to_owned()
}

fn name_for(data: &NodeData) -> String {
    if let Some(label) = data.attribute("aria-label") {
        return label.to_owned();
    }
    if let Some(alt) = data.attribute("alt") {
        return alt.to_owned();
    }
    String::new()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinder_dom::Document;
    use cinder_style::StyleEngine;

    fn doc_with_link() -> Document {
        let mut doc = Document::new();
        let root = doc.root();
        let link = doc.new_element("a");
        doc.set_attribute(link, "href", "https://example.com/");
        let text = doc.new_text("Read more");
        doc.append_child(link, text);
        doc.append_child(root, link);
        doc
    }

    #[test]
    fn link_gets_role_link_and_text_child_gets_role_text() {
        let doc = doc_with_link();
        let styles = StyleEngine::new();
        let mut arena = LayoutArena::new();
        arena.build_and_layout(&doc, &styles, 800.0, 1.0);

        let tree = accessibility_tree(&arena, &doc);
        assert!(tree.iter().any(|n| n.role == "link"));
        assert!(tree.iter().any(|n| n.role == "text" && n.label == "Read"));
    }

    #[test]
    fn plain_div_with_no_role_is_skipped() {
        let mut doc = Document::new();
        let root = doc.root();
        let div = doc.new_element("div");
        doc.append_child(root, div);

        let styles = StyleEngine::new();
        let mut arena = LayoutArena::new();
        arena.build_and_layout(&doc, &styles, 800.0, 1.0);

        let tree = accessibility_tree(&arena, &doc);
        assert!(!tree.iter().any(|n| n.node == div));
    }

    #[test]
    fn explicit_role_attribute_overrides_tag_mapping() {
        let mut doc = Document::new();
        let root = doc.root();
        let div = doc.new_element("div");
        doc.set_attribute(div, "role", "alert");
        doc.append_child(root, div);

        let styles = StyleEngine::new();
        let mut arena = LayoutArena::new();
        arena.build_and_layout(&doc, &styles, 800.0, 1.0);

        let tree = accessibility_tree(&arena, &doc);
        assert!(tree.iter().any(|n| n.node == div && n.role == "alert"));
    }
}
