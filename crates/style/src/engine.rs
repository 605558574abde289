//! Cascade engine: computes and re-computes per-node style maps,
//! installing transition animations on change. Grounded on
//! `original_source/css.py`'s `style`/`diff_styles` functions.

use crate::animation::{parse_transition, NumericAnimation};
use crate::selector::Rule;
use crate::value::{inherited_defaults, parse_px, resolve_font_size};
use cinder_dom::{Document, NodeKey, NodeVariant};
use std::collections::HashMap;

pub type PropertyMap = HashMap<String, String>;

const REFRESH_RATE_SEC: f32 = 0.033;

/// Owns every node's computed style and in-flight transitions. One
/// instance per tab (spec.md §3: style lives alongside the document).
#[derive(Debug, Default)]
pub struct StyleEngine {
    computed: HashMap<NodeKey, PropertyMap>,
    animations: HashMap<NodeKey, HashMap<String, NumericAnimation>>,
    pub dark_mode: bool,
}

impl StyleEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, node: NodeKey) -> Option<&PropertyMap> {
        self.computed.get(&node)
    }

    /// Recomputes style for the whole document, returning the set of
    /// nodes whose style actually changed. Rules should already be
    /// sorted by ascending cascade priority (spec.md §4.2: "apply every
    /// matching rule in cascade-priority order").
    pub fn recompute(&mut self, doc: &Document, rules: &[Rule]) -> Vec<NodeKey> {
        let mut changed = Vec::new();
        self.style_node(doc, doc.root(), rules, &mut changed);
        changed
    }

    fn style_node(&mut self, doc: &Document, node: NodeKey, rules: &[Rule], changed: &mut Vec<NodeKey>) {
        let data = doc.get(node);
        let parent = data.parent;

        let mut style = match parent {
            Some(p) => self.computed.get(&p).cloned().unwrap_or_else(inherited_defaults),
            None => inherited_defaults(),
        };

        for rule in rules {
            if let Some(media) = rule.media {
                if !media.matches(self.dark_mode) {
                    continue;
                }
            }
            if !rule.selector.matches(doc, node) {
                continue;
            }
            for (property, value) in &rule.body {
                style.insert(property.clone(), value.clone());
            }
        }

        if let NodeVariant::Element { attributes, .. } = &data.variant {
            if let Some(inline) = attributes.get("style") {
                for (property, value) in parse_inline_style(inline) {
                    style.insert(property, value);
                }
            }
        }

        if let Some(font_size) = style.get("font-size").cloned() {
            if font_size.ends_with('%') {
                let parent_px = parent
                    .and_then(|p| self.computed.get(&p))
                    .and_then(|s| s.get("font-size"))
                    .and_then(|s| parse_px(s))
                    .unwrap_or(16.0);
                style.insert("font-size".to_owned(), resolve_font_size(&font_size, parent_px));
            }
        }

        let old_style = self.computed.get(&node).cloned();
        if let Some(old) = &old_style {
            for (property, old_value, new_value, num_frames) in diff_transitioning(old, &style) {
                if property == "opacity" {
                    let old_num: f32 = old_value.parse().unwrap_or(1.0);
                    let new_num: f32 = new_value.parse().unwrap_or(1.0);
                    let mut animation = NumericAnimation::new(old_num, new_num, num_frames);
                    if let Some(first) = animation.animate() {
                        style.insert("opacity".to_owned(), first.to_string());
                    }
                    self.animations.entry(node).or_default().insert(property, animation);
                    changed.push(node);
                }
            }
        }

        if old_style.as_ref() != Some(&style) {
            if !changed.contains(&node) {
                changed.push(node);
            }
        }
        self.computed.insert(node, style);

        for &child in data.children() {
            self.style_node(doc, child, rules, changed);
        }
    }

    /// Advances every installed animation by one frame (called once per
    /// animation-frame tick, spec.md §6 step 3). Returns nodes whose
    /// style changed as a result, for `composited_updates` substitution.
    pub fn advance_animations(&mut self) -> Vec<NodeKey> {
        let mut updated = Vec::new();
        let mut exhausted: Vec<(NodeKey, String)> = Vec::new();
        for (&node, props) in &mut self.animations {
            for (property, animation) in props.iter_mut() {
                match animation.animate() {
                    Some(value) => {
                        if let Some(style) = self.computed.get_mut(&node) {
                            style.insert(property.clone(), value.to_string());
                        }
                        updated.push(node);
                    }
                    None => exhausted.push((node, property.clone())),
                }
            }
        }
        for (node, property) in exhausted {
            if let Some(props) = self.animations.get_mut(&node) {
                props.remove(&property);
                if props.is_empty() {
                    self.animations.remove(&node);
                }
            }
        }
        updated
    }

    #[must_use]
    pub fn has_pending_animations(&self) -> bool {
        !self.animations.is_empty()
    }
}

fn parse_inline_style(inline: &str) -> Vec<(String, String)> {
    inline
        .split(';')
        .filter_map(|decl| {
            let (prop, val) = decl.split_once(':')?;
            let prop = prop.trim();
            if prop.is_empty() {
                return None;
            }
            Some((prop.to_lowercase(), val.trim().to_owned()))
        })
        .collect()
}

/// Grounded on `diff_styles`: only properties named in the new style's
/// `transition` list, whose values actually changed, are reported.
fn diff_transitioning(old: &PropertyMap, new: &PropertyMap) -> Vec<(String, String, String, u32)> {
    let transition = new.get("transition").map(String::as_str).unwrap_or_default();
    let mut out = Vec::new();
    for (property, frames) in parse_transition(transition, REFRESH_RATE_SEC) {
        let (Some(old_value), Some(new_value)) = (old.get(&property), new.get(&property)) else {
            continue;
        };
        if old_value == new_value {
            continue;
        }
        out.push((property, old_value.clone(), new_value.clone(), frames));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::Selector;

    fn rule(tag: &str, body: &[(&str, &str)]) -> Rule {
        Rule {
            media: None,
            selector: Selector::tag(tag),
            body: body.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect(),
        }
    }

    #[test]
    fn inherits_font_size_from_parent() {
        let mut doc = Document::new();
        let root = doc.root();
        let div = doc.new_element("div");
        doc.append_child(root, div);
        let mut engine = StyleEngine::new();
        engine.recompute(&doc, &[]);
        assert_eq!(engine.get(div).and_then(|s| s.get("font-size")).map(String::as_str), Some("16px"));
    }

    #[test]
    fn percent_font_size_resolves_against_parent_px() {
        let mut doc = Document::new();
        let root = doc.root();
        let div = doc.new_element("div");
        doc.append_child(root, div);
        let rules = vec![rule("div", &[("font-size", "50%")])];
        let mut engine = StyleEngine::new();
        engine.recompute(&doc, &rules);
        assert_eq!(engine.get(div).and_then(|s| s.get("font-size")).map(String::as_str), Some("8px"));
    }

    #[test]
    fn inline_style_wins_over_rule() {
        let mut doc = Document::new();
        let root = doc.root();
        let p = doc.new_element("p");
        doc.set_attribute(p, "style", "color:red;");
        doc.append_child(root, p);
        let rules = vec![rule("p", &[("color", "blue")])];
        let mut engine = StyleEngine::new();
        engine.recompute(&doc, &rules);
        assert_eq!(engine.get(p).and_then(|s| s.get("color")).map(String::as_str), Some("red"));
    }

    #[test]
    fn opacity_transition_installs_animation_and_marks_changed() {
        let mut doc = Document::new();
        let root = doc.root();
        let div = doc.new_element("div");
        doc.append_child(root, div);
        let mut engine = StyleEngine::new();
        let rules1 = vec![rule("div", &[("opacity", "1"), ("transition", "opacity 0.066s")])];
        engine.recompute(&doc, &rules1);
        let rules2 = vec![rule("div", &[("opacity", "0"), ("transition", "opacity 0.066s")])];
        let changed = engine.recompute(&doc, &rules2);
        assert!(changed.contains(&div));
        assert!(engine.has_pending_animations());
    }
}
