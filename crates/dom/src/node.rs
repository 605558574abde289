//! Document node arena.
//!
//! Nodes live in a `Vec<NodeData>` arena indexed by `NodeKey`, grounded
//! on the teacher's `indextree`-keyed DOM
//! (`BigBadE-valor/crates/html/src/dom/mod.rs`) but trimmed from
//! `indextree`+`lasso` interning to a plain arena — we don't need
//! attribute-string dedup at the teacher's scale.

use std::collections::HashMap;

/// Stable reference to a node in a `Document`'s arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(pub u32);

impl NodeKey {
    pub const ROOT: Self = Self(0);
}

/// Back-reference slots an element node carries to the subsystems built
/// on top of it (spec.md §3: "`layout_object` back-reference", "blend_op
/// back-reference"). Both are set by passes that run after this node's
/// subtree is (re)built and are cleared when the node is replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeBackRefs {
    pub layout_object: Option<u32>,
    pub blend_op: Option<u32>,
}

#[derive(Debug, Clone)]
pub enum NodeVariant {
    Element {
        tag: String,
        attributes: HashMap<String, String>,
        children: Vec<NodeKey>,
        is_focused: bool,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Clone)]
pub struct NodeData {
    pub variant: NodeVariant,
    pub parent: Option<NodeKey>,
    pub back_refs: NodeBackRefs,
}

impl NodeData {
    #[must_use]
    pub fn is_element(&self) -> bool {
        matches!(self.variant, NodeVariant::Element { .. })
    }

    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        match &self.variant {
            NodeVariant::Element { tag, .. } => Some(tag.as_str()),
            NodeVariant::Text { .. } => None,
        }
    }

    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.variant {
            NodeVariant::Text { text } => Some(text.as_str()),
            NodeVariant::Element { .. } => None,
        }
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        match &self.variant {
            NodeVariant::Element { attributes, .. } => attributes.get(name).map(String::as_str),
            NodeVariant::Text { .. } => None,
        }
    }

    #[must_use]
    pub fn children(&self) -> &[NodeKey] {
        match &self.variant {
            NodeVariant::Element { children, .. } => children.as_slice(),
            NodeVariant::Text { .. } => &[],
        }
    }
}

/// The document tree: arena of nodes exclusively owned by the tab that
/// loaded it (spec.md §3).
#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: Vec<NodeData>,
    root: Option<NodeKey>,
}

impl Document {
    #[must_use]
    pub fn new() -> Self {
        let mut doc = Self::default();
        let root = doc.push(NodeData {
            variant: NodeVariant::Element {
                tag: "html".to_owned(),
                attributes: HashMap::new(),
                children: Vec::new(),
                is_focused: false,
            },
            parent: None,
            back_refs: NodeBackRefs::default(),
        });
        doc.root = Some(root);
        doc
    }

    #[must_use]
    pub fn root(&self) -> NodeKey {
        self.root.unwrap_or(NodeKey::ROOT)
    }

    #[must_use]
    pub fn get(&self, key: NodeKey) -> &NodeData {
        &self.nodes[key.0 as usize]
    }

    pub fn get_mut(&mut self, key: NodeKey) -> &mut NodeData {
        &mut self.nodes[key.0 as usize]
    }

    fn push(&mut self, data: NodeData) -> NodeKey {
        let key = NodeKey(self.nodes.len() as u32);
        self.nodes.push(data);
        key
    }

    pub fn new_element(&mut self, tag: impl Into<String>) -> NodeKey {
        self.push(NodeData {
            variant: NodeVariant::Element {
                tag: tag.into(),
                attributes: HashMap::new(),
                children: Vec::new(),
                is_focused: false,
            },
            parent: None,
            back_refs: NodeBackRefs::default(),
        })
    }

    pub fn new_text(&mut self, text: impl Into<String>) -> NodeKey {
        self.push(NodeData {
            variant: NodeVariant::Text { text: text.into() },
            parent: None,
            back_refs: NodeBackRefs::default(),
        })
    }

    pub fn set_attribute(&mut self, key: NodeKey, name: impl Into<String>, value: impl Into<String>) {
        if let NodeVariant::Element { attributes, .. } = &mut self.get_mut(key).variant {
            attributes.insert(name.into(), value.into());
        }
    }

    /// Invariant (spec.md §3): a child's parent pointer equals the node
    /// that owns it. `append_child` maintains this on both ends.
    pub fn append_child(&mut self, parent: NodeKey, child: NodeKey) {
        self.get_mut(child).parent = Some(parent);
        if let NodeVariant::Element { children, .. } = &mut self.get_mut(parent).variant {
            children.push(child);
        }
    }

    /// Replaces `node`'s children with a fresh subtree (spec.md §3:
    /// "destroyed when replaced" lifecycle, driven by `innerHTML_set`).
    pub fn set_children(&mut self, node: NodeKey, children: Vec<NodeKey>) {
        for &child in &children {
            self.get_mut(child).parent = Some(node);
        }
        if let NodeVariant::Element { children: slot, .. } = &mut self.get_mut(node).variant {
            *slot = children;
        }
    }

    pub fn set_focused(&mut self, node: NodeKey, focused: bool) {
        if let NodeVariant::Element { is_focused, .. } = &mut self.get_mut(node).variant {
            *is_focused = focused;
        }
    }

    /// Ancestor chain from `node` up to (and including) the root, nearest
    /// first — used by descendant-selector matching (spec.md §4.2).
    #[must_use]
    pub fn ancestors(&self, node: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut current = self.get(node).parent;
        while let Some(key) = current {
            out.push(key);
            current = self.get(key).parent;
        }
        out
    }

    /// Preorder walk over the whole tree from the root.
    pub fn walk(&self, mut visit: impl FnMut(NodeKey)) {
        let mut stack = vec![self.root()];
        while let Some(key) = stack.pop() {
            visit(key);
            let children = self.get(key).children();
            for &child in children.iter().rev() {
                stack.push(child);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_child_sets_parent_pointer() {
        let mut doc = Document::new();
        let root = doc.root();
        let p = doc.new_element("p");
        doc.append_child(root, p);
        assert_eq!(doc.get(p).parent, Some(root));
        assert_eq!(doc.get(root).children(), &[p]);
    }

    #[test]
    fn ancestors_walks_to_root() {
        let mut doc = Document::new();
        let root = doc.root();
        let div = doc.new_element("div");
        doc.append_child(root, div);
        let span = doc.new_element("span");
        doc.append_child(div, span);
        assert_eq!(doc.ancestors(span), vec![div, root]);
    }

    #[test]
    fn set_children_reparents_replacement_subtree() {
        let mut doc = Document::new();
        let root = doc.root();
        let new_child = doc.new_text("hello");
        doc.set_children(root, vec![new_child]);
        assert_eq!(doc.get(root).children(), &[new_child]);
        assert_eq!(doc.get(new_child).parent, Some(root));
    }
}
