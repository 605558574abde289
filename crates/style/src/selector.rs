//! Selectors and cascade priority, grounded on
//! `original_source/css.py`'s `TagSelector`/`DescendantSelector`/
//! `PseudoclassSelector` and `cascade_priority`.

use cinder_dom::{Document, NodeKey};

#[derive(Debug, Clone)]
pub enum Selector {
    Tag(String),
    Descendant(Box<Selector>, Box<Selector>),
    Pseudoclass { name: String, base: Box<Selector> },
}

impl Selector {
    #[must_use]
    pub fn tag(tag: impl Into<String>) -> Self {
        Self::Tag(tag.into())
    }

    #[must_use]
    pub fn descendant(ancestor: Selector, descendant: Selector) -> Self {
        Self::Descendant(Box::new(ancestor), Box::new(descendant))
    }

    #[must_use]
    pub fn pseudoclass(name: impl Into<String>, base: Selector) -> Self {
        Self::Pseudoclass {
            name: name.into(),
            base: Box::new(base),
        }
    }

    /// Tag selectors have priority 1; a descendant selector's priority is
    /// the sum of its parts; a pseudoclass selector inherits its base's
    /// priority unchanged.
    #[must_use]
    pub fn priority(&self) -> u32 {
        match self {
            Self::Tag(_) => 1,
            Self::Descendant(ancestor, descendant) => ancestor.priority() + descendant.priority(),
            Self::Pseudoclass { base, .. } => base.priority(),
        }
    }

    #[must_use]
    pub fn matches(&self, doc: &Document, node: NodeKey) -> bool {
        match self {
            Self::Tag(tag) => doc.get(node).tag() == Some(tag.as_str()),
            Self::Descendant(ancestor, descendant) => {
                if !descendant.matches(doc, node) {
                    return false;
                }
                doc.ancestors(node).iter().any(|&a| ancestor.matches(doc, a))
            }
            Self::Pseudoclass { name, base } => {
                if !base.matches(doc, node) {
                    return false;
                }
                match name.as_str() {
                    "focus" => matches!(
                        &doc.get(node).variant,
                        cinder_dom::NodeVariant::Element { is_focused: true, .. }
                    ),
                    _ => false,
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaQuery {
    PrefersDark,
    PrefersLight,
}

impl MediaQuery {
    #[must_use]
    pub fn matches(self, dark_mode: bool) -> bool {
        match self {
            Self::PrefersDark => dark_mode,
            Self::PrefersLight => !dark_mode,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub media: Option<MediaQuery>,
    pub selector: Selector,
    pub body: std::collections::HashMap<String, String>,
}

impl Rule {
    #[must_use]
    pub fn priority(&self) -> u32 {
        self.selector.priority()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_selector_matches_by_tag() {
        let mut doc = Document::new();
        let root = doc.root();
        let p = doc.new_element("p");
        doc.append_child(root, p);
        assert!(Selector::tag("p").matches(&doc, p));
        assert!(!Selector::tag("div").matches(&doc, p));
    }

    #[test]
    fn descendant_selector_walks_ancestor_chain() {
        let mut doc = Document::new();
        let root = doc.root();
        let div = doc.new_element("div");
        doc.append_child(root, div);
        let span = doc.new_element("span");
        doc.append_child(div, span);
        let sel = Selector::descendant(Selector::tag("div"), Selector::tag("span"));
        assert!(sel.matches(&doc, span));
        assert_eq!(sel.priority(), 2);
    }

    #[test]
    fn focus_pseudoclass_requires_is_focused() {
        let mut doc = Document::new();
        let root = doc.root();
        let input = doc.new_element("input");
        doc.append_child(root, input);
        let sel = Selector::pseudoclass("focus", Selector::tag("input"));
        assert!(!sel.matches(&doc, input));
        doc.set_focused(input, true);
        assert!(sel.matches(&doc, input));
    }
}
