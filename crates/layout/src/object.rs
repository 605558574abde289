//! Layout tree: Document/Block/Line/Text/Input/Image/Iframe objects
//! over protected fields, grounded on `original_source/layout.py`'s
//! `DocumentLayout`/`BlockLayout`/`LineLayout`/`TextLayout`/
//! `EmbedLayout` family.

use crate::font::{style_from_style, weight_from_style, Font, FontCache, FontStyle, FontWeight};
use crate::protected::{FieldGraph, FieldKey, FieldKind, NodeIdx, ProtectedField};
use cinder_dom::{Document, NodeKey, NodeVariant};
use cinder_style::StyleEngine;

const INPUT_WIDTH_PX: f32 = 200.0;
const IFRAME_WIDTH_PX: f32 = 300.0;
const IFRAME_HEIGHT_PX: f32 = 150.0;

fn dpx(css_px: f32, zoom: f32) -> f32 {
    css_px * zoom
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutKind {
    Document,
    Block,
    Line,
    Text,
    Input,
    Image,
    Iframe,
}

#[derive(Debug)]
pub struct LayoutNode {
    pub kind: LayoutKind,
    pub node: NodeKey,
    pub parent: Option<NodeIdx>,
    pub previous: Option<NodeIdx>,
    pub children: ProtectedField<Vec<NodeIdx>>,
    pub x: ProtectedField<f32>,
    pub y: ProtectedField<f32>,
    pub width: ProtectedField<f32>,
    pub height: ProtectedField<f32>,
    pub zoom: f32,
    pub word: Option<String>,
    pub font: Option<Font>,
    pub ascent: f32,
    pub descent: f32,
}

impl LayoutNode {
    fn new(kind: LayoutKind, node: NodeKey, idx: NodeIdx, parent: Option<NodeIdx>, previous: Option<NodeIdx>) -> Self {
        Self {
            kind,
            node,
            parent,
            previous,
            children: ProtectedField::new(FieldKey(idx, FieldKind::Children), Vec::new()),
            x: ProtectedField::new(FieldKey(idx, FieldKind::X), 0.0),
            y: ProtectedField::new(FieldKey(idx, FieldKind::Y), 0.0),
            width: ProtectedField::new(FieldKey(idx, FieldKind::Width), 0.0),
            height: ProtectedField::new(FieldKey(idx, FieldKind::Height), 0.0),
            zoom: 1.0,
            word: None,
            font: None,
            ascent: 0.0,
            descent: 0.0,
        }
    }

    #[must_use]
    pub fn self_rect(&self, graph: &FieldGraph) -> cinder_display::Rect {
        cinder_display::Rect::new(
            *self.x.get(graph),
            *self.y.get(graph),
            *self.width.get(graph),
            *self.height.get(graph),
        )
    }
}

/// Arena of layout objects for one document/frame, plus the dependency
/// graph that makes recomputation incremental (spec.md §3 Layout
/// object / §4.1).
#[derive(Debug)]
pub struct LayoutArena {
    pub nodes: Vec<LayoutNode>,
    pub graph: FieldGraph,
    pub fonts: FontCache,
    pub root: Option<NodeIdx>,
}

impl Default for LayoutArena {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutArena {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            graph: FieldGraph::new(),
            fonts: FontCache::new(),
            root: None,
        }
    }

    fn push(&mut self, node: LayoutNode) -> NodeIdx {
        let idx = self.nodes.len();
        if let Some(parent) = node.parent {
            self.graph.set_parent(idx, parent);
        }
        self.nodes.push(node);
        // Freshly built objects start with every protected field dirty
        // so the first layout pass actually computes them (mirrors the
        // teacher's "newly constructed layout object" always running
        // `layout()` once before any `set()` call establishes a value).
        for kind in [FieldKind::X, FieldKind::Y, FieldKind::Width, FieldKind::Height, FieldKind::Children] {
            self.graph.mark_dirty(FieldKey(idx, kind));
        }
        idx
    }

    /// Rebuilds the whole layout tree from the document and computed
    /// styles, then runs the layout pass (spec.md §4.3: "Document sets
    /// zoom and width ... lays out a single block child").
    pub fn build_and_layout(&mut self, doc: &Document, styles: &StyleEngine, width: f32, zoom: f32) {
        self.nodes.clear();
        self.graph = FieldGraph::new();

        let doc_idx = self.push(LayoutNode::new(LayoutKind::Document, doc.root(), 0, None, None));
        let block_idx = self.build_block(doc, styles, doc.root(), doc_idx, None);
        self.nodes[doc_idx].children.set(&mut self.graph, vec![block_idx]);
        self.root = Some(doc_idx);

        const HSTEP: f32 = 13.0;
        const VSTEP: f32 = 18.0;
        self.nodes[doc_idx].zoom = zoom;
        self.nodes[doc_idx].width.set(&mut self.graph, width - 2.0 * dpx(HSTEP, zoom));
        self.nodes[doc_idx].x.set(&mut self.graph, dpx(HSTEP, zoom));
        self.nodes[doc_idx].y.set(&mut self.graph, dpx(VSTEP, zoom));

        self.layout_block(styles, block_idx);
        let doc_height = *self.nodes[block_idx].height.get(&self.graph);
        self.nodes[doc_idx].height.set(&mut self.graph, doc_height);
    }

    fn build_block(
        &mut self,
        doc: &Document,
        styles: &StyleEngine,
        node: NodeKey,
        parent: NodeIdx,
        previous: Option<NodeIdx>,
    ) -> NodeIdx {
        let idx = self.nodes.len();
        self.push(LayoutNode::new(LayoutKind::Block, node, idx, Some(parent), previous));

        if layout_mode_is_block(doc, node) {
            let mut prev = None;
            let children_nodes: Vec<NodeKey> = doc.get(node).children().to_vec();
            let mut child_idxs = Vec::new();
            for child in children_nodes {
                let child_idx = self.build_block(doc, styles, child, idx, prev);
                child_idxs.push(child_idx);
                prev = Some(child_idx);
            }
            self.nodes[idx].children.set(&mut self.graph, child_idxs);
        } else {
            let line_idx = self.new_line(idx, None);
            let mut child_idxs = vec![line_idx];
            self.recurse_inline(doc, styles, node, idx, &mut child_idxs);
            self.nodes[idx].children.set(&mut self.graph, child_idxs);
        }
        idx
    }

    fn new_line(&mut self, parent: NodeIdx, previous: Option<NodeIdx>) -> NodeIdx {
        let parent_node = self.nodes[parent].node;
        let idx = self.nodes.len();
        self.push(LayoutNode::new(LayoutKind::Line, parent_node, idx, Some(parent), previous));
        // Starts empty-but-clean so callers can read `children` before
        // the first word/embed is appended to this line.
        self.nodes[idx].children.set(&mut self.graph, Vec::new());
        idx
    }

    fn recurse_inline(
        &mut self,
        doc: &Document,
        styles: &StyleEngine,
        node: NodeKey,
        parent_block: NodeIdx,
        lines: &mut Vec<NodeIdx>,
    ) {
        let data = doc.get(node);
        match &data.variant {
            NodeVariant::Text { text } => {
                for word in text.split_whitespace() {
                    self.add_inline_word(doc, styles, node, word.to_owned(), parent_block, lines);
                }
            }
            NodeVariant::Element { tag, children, .. } => {
                match tag.as_str() {
                    "br" => lines.push(self.new_line(parent_block, lines.last().copied())),
                    "input" | "button" => self.add_inline_embed(doc, styles, node, LayoutKind::Input, parent_block, lines),
                    "img" => self.add_inline_embed(doc, styles, node, LayoutKind::Image, parent_block, lines),
                    "iframe" if data.attribute("src").is_some() => {
                        self.add_inline_embed(doc, styles, node, LayoutKind::Iframe, parent_block, lines);
                    }
                    _ => {
                        for &child in children {
                            self.recurse_inline(doc, styles, child, parent_block, lines);
                        }
                    }
                }
            }
        }
    }

    fn inline_width(&mut self, doc: &Document, styles: &StyleEngine, node: NodeKey, kind: LayoutKind, zoom: f32) -> f32 {
        match kind {
            LayoutKind::Input => dpx(INPUT_WIDTH_PX, zoom),
            LayoutKind::Image => doc
                .get(node)
                .attribute("width")
                .and_then(|w| w.parse::<f32>().ok())
                .map_or(dpx(60.0, zoom), |w| dpx(w, zoom)),
            LayoutKind::Iframe => doc
                .get(node)
                .attribute("width")
                .and_then(|w| w.parse::<f32>().ok())
                .map_or(IFRAME_WIDTH_PX + dpx(2.0, zoom), |w| dpx(w, zoom)),
            LayoutKind::Text => {
                let style = styles.get(node);
                let size = style
                    .and_then(|s| s.get("font-size"))
                    .and_then(|s| cinder_style::value::parse_px(s))
                    .unwrap_or(16.0);
                let weight = weight_from_style(style.and_then(|s| s.get("font-weight")).map(String::as_str));
                let font_style = style_from_style(style.and_then(|s| s.get("font-style")).map(String::as_str));
                self.fonts.resolve(weight, font_style, size, zoom).measure_text(" ")
            }
            LayoutKind::Document | LayoutKind::Block | LayoutKind::Line => 0.0,
        }
    }

    fn add_inline_embed(
        &mut self,
        doc: &Document,
        styles: &StyleEngine,
        node: NodeKey,
        kind: LayoutKind,
        parent_block: NodeIdx,
        lines: &mut Vec<NodeIdx>,
    ) {
        let zoom = self.nodes[parent_block].zoom.max(1.0);
        let w = self.inline_width(doc, styles, node, kind, zoom);
        self.push_inline_child(doc, styles, node, kind, w, parent_block, lines, None);
    }

    fn add_inline_word(
        &mut self,
        doc: &Document,
        styles: &StyleEngine,
        node: NodeKey,
        word: String,
        parent_block: NodeIdx,
        lines: &mut Vec<NodeIdx>,
    ) {
        let zoom = self.nodes[parent_block].zoom.max(1.0);
        let style = styles.get(node);
        let size = style
            .and_then(|s| s.get("font-size"))
            .and_then(|s| cinder_style::value::parse_px(s))
            .unwrap_or(16.0);
        let weight = weight_from_style(style.and_then(|s| s.get("font-weight")).map(String::as_str));
        let font_style = style_from_style(style.and_then(|s| s.get("font-style")).map(String::as_str));
        let font = self.fonts.resolve(weight, font_style, size, zoom);
        let w = font.measure_text(&word);
        self.push_inline_child(doc, styles, node, LayoutKind::Text, w, parent_block, lines, Some(word));
    }

    #[allow(clippy::too_many_arguments)]
    fn push_inline_child(
        &mut self,
        _doc: &Document,
        _styles: &StyleEngine,
        node: NodeKey,
        kind: LayoutKind,
        advance_width: f32,
        parent_block: NodeIdx,
        lines: &mut Vec<NodeIdx>,
        word: Option<String>,
    ) {
        let block_width = *self.nodes[parent_block].width.get(&self.graph);
        let block_x = *self.nodes[parent_block].x.get(&self.graph);

        let mut line_idx = *lines.last().unwrap_or(&0);
        let cursor_x = line_cursor_x(self, line_idx, block_x);
        if cursor_x + advance_width > block_x + block_width && !self.nodes[line_idx].children.get(&self.graph).is_empty() {
            line_idx = self.new_line(parent_block, Some(line_idx));
            lines.push(line_idx);
        }

        let previous = self.nodes[line_idx].children.get(&self.graph).last().copied();
        let child_idx = self.nodes.len();
        let mut child = LayoutNode::new(kind, node, child_idx, Some(line_idx), previous);
        child.word = word;
        self.push(child);
        // Width is already known at construction time for every embed
        // kind (and for text, from the same font metrics computed just
        // above); `layout_inline_child` only refines height/ascent.
        self.nodes[child_idx].width.set(&mut self.graph, advance_width);
        let mut line_children = self.nodes[line_idx].children.get(&self.graph).clone();
        line_children.push(child_idx);
        self.nodes[line_idx].children.set(&mut self.graph, line_children);
    }

    /// Top-down layout pass, skipping subtrees whose `layout_needed()`
    /// is false (spec.md §4.3: "each object's `layout()` is a no-op
    /// when `!layout_needed()`").
    fn layout_block(&mut self, styles: &StyleEngine, idx: NodeIdx) {
        let own_fields = [
            FieldKey(idx, FieldKind::X),
            FieldKey(idx, FieldKind::Y),
            FieldKey(idx, FieldKind::Width),
            FieldKey(idx, FieldKind::Height),
            FieldKey(idx, FieldKind::Children),
        ];
        if !self.graph.layout_needed(idx, &own_fields) {
            return;
        }

        let parent = self.nodes[idx].parent;
        let (zoom, p_width, p_x) = match parent {
            Some(p) => (self.nodes[p].zoom, *self.nodes[p].width.get(&self.graph), *self.nodes[p].x.get(&self.graph)),
            None => (self.nodes[idx].zoom, *self.nodes[idx].width.get(&self.graph), *self.nodes[idx].x.get(&self.graph)),
        };
        self.nodes[idx].zoom = zoom;
        self.nodes[idx].width.set(&mut self.graph, p_width);
        self.nodes[idx].x.set(&mut self.graph, p_x);

        let y = match self.nodes[idx].previous {
            Some(prev) => *self.nodes[prev].y.get(&self.graph) + *self.nodes[prev].height.get(&self.graph),
            None => parent.map_or(*self.nodes[idx].y.get(&self.graph), |p| *self.nodes[p].y.get(&self.graph)),
        };
        self.nodes[idx].y.set(&mut self.graph, y);

        let children = self.nodes[idx].children.get(&self.graph).clone();
        let mut height = 0.0;
        for &child in &children {
            match self.nodes[child].kind {
                LayoutKind::Block => self.layout_block(styles, child),
                LayoutKind::Line => self.layout_line(child),
                _ => {}
            }
            height += *self.nodes[child].height.get(&self.graph);
        }
        self.nodes[idx].height.set(&mut self.graph, height);
        self.graph.clear_dirty_descendants(idx);
    }

    fn layout_line(&mut self, idx: NodeIdx) {
        let parent = self.nodes[idx].parent.unwrap_or(idx);
        let zoom = self.nodes[parent].zoom;
        let width = *self.nodes[parent].width.get(&self.graph);
        let x = *self.nodes[parent].x.get(&self.graph);
        self.nodes[idx].zoom = zoom;
        self.nodes[idx].width.set(&mut self.graph, width);
        self.nodes[idx].x.set(&mut self.graph, x);

        let y = match self.nodes[idx].previous {
            Some(prev) => *self.nodes[prev].y.get(&self.graph) + *self.nodes[prev].height.get(&self.graph),
            None => *self.nodes[parent].y.get(&self.graph),
        };
        self.nodes[idx].y.set(&mut self.graph, y);

        let children = self.nodes[idx].children.get(&self.graph).clone();
        let mut cursor_x = x;
        for &child in &children {
            self.layout_inline_child(child, cursor_x);
            cursor_x += *self.nodes[child].width.get(&self.graph);
        }

        if children.is_empty() {
            self.nodes[idx].height.set(&mut self.graph, 0.0);
            self.nodes[idx].ascent = 0.0;
            self.nodes[idx].descent = 0.0;
            return;
        }

        let max_ascent = children.iter().map(|&c| -self.nodes[c].ascent).fold(0.0_f32, f32::max);
        let baseline = y + max_ascent;
        for &child in &children {
            let is_text = self.nodes[child].kind == LayoutKind::Text;
            let ascent = self.nodes[child].ascent;
            let child_y = if is_text { baseline + ascent / 1.25 } else { baseline + ascent };
            self.nodes[child].y.set(&mut self.graph, child_y);
        }
        let max_descent = children.iter().map(|&c| self.nodes[c].descent).fold(0.0_f32, f32::max);
        self.nodes[idx].height.set(&mut self.graph, max_ascent + max_descent);
    }

    fn layout_inline_child(&mut self, idx: NodeIdx, x: f32) {
        self.nodes[idx].x.set(&mut self.graph, x);
        match self.nodes[idx].kind {
            LayoutKind::Text => {
                let word = self.nodes[idx].word.clone().unwrap_or_default();
                let zoom = self.nodes[idx].zoom.max(1.0);
                let font = self.fonts.resolve(FontWeight::Normal, FontStyle::Normal, 16.0, zoom);
                self.nodes[idx].width.set(&mut self.graph, font.measure_text(&word));
                self.nodes[idx].height.set(&mut self.graph, font.linespace());
                self.nodes[idx].ascent = font.ascent();
                self.nodes[idx].descent = font.descent();
                self.nodes[idx].font = Some(font);
            }
            LayoutKind::Input => {
                let zoom = self.nodes[idx].zoom.max(1.0);
                let font = self.fonts.resolve(FontWeight::Normal, FontStyle::Normal, 16.0, zoom);
                self.nodes[idx].width.set(&mut self.graph, dpx(INPUT_WIDTH_PX, zoom));
                self.nodes[idx].height.set(&mut self.graph, font.linespace());
                self.nodes[idx].ascent = -font.linespace();
                self.nodes[idx].descent = 0.0;
                self.nodes[idx].font = Some(font);
            }
            LayoutKind::Image => {
                let zoom = self.nodes[idx].zoom.max(1.0);
                let font = self.fonts.resolve(FontWeight::Normal, FontStyle::Normal, 16.0, zoom);
                let w = *self.nodes[idx].width.get(&self.graph);
                let h = w.max(font.linespace());
                self.nodes[idx].height.set(&mut self.graph, h);
                self.nodes[idx].ascent = -h;
                self.nodes[idx].descent = 0.0;
            }
            LayoutKind::Iframe => {
                let zoom = self.nodes[idx].zoom.max(1.0);
                let h = IFRAME_HEIGHT_PX + dpx(2.0, zoom);
                self.nodes[idx].height.set(&mut self.graph, h);
                self.nodes[idx].ascent = -h;
                self.nodes[idx].descent = 0.0;
            }
            LayoutKind::Document | LayoutKind::Block | LayoutKind::Line => {}
        }
    }
}

fn line_cursor_x(arena: &LayoutArena, line_idx: NodeIdx, block_x: f32) -> f32 {
    let children = arena.nodes[line_idx].children.get(&arena.graph);
    children.last().map_or(block_x, |&last| {
        *arena.nodes[last].x.get(&arena.graph) + *arena.nodes[last].width.get(&arena.graph)
    })
}

/// Mirrors `BlockLayout.layout_mode` (`original_source/layout.py`):
/// block if any non-text child carries a block-level tag, inline
/// otherwise (including bare `input`/`img`/`iframe` leaves).
fn layout_mode_is_block(doc: &Document, node: NodeKey) -> bool {
    const BLOCK_ELEMENTS: &[&str] = &[
        "html", "body", "article", "section", "nav", "aside", "h1", "h2", "h3", "h4", "h5", "h6", "hgroup", "header",
        "footer", "address", "p", "hr", "pre", "blockquote", "ol", "ul", "menu", "li", "dl", "dt", "dd", "figure",
        "figcaption", "main", "div", "table", "form", "fieldset", "legend", "details", "summary",
    ];
    let data = doc.get(node);
    if matches!(data.variant, NodeVariant::Text { .. }) {
        return false;
    }
    if !data.children().is_empty() {
        for &child in data.children() {
            let child_data = doc.get(child);
            if matches!(child_data.variant, NodeVariant::Text { .. }) {
                continue;
            }
            if let Some(tag) = child_data.tag() {
                if BLOCK_ELEMENTS.contains(&tag) {
                    return true;
                }
            }
        }
        return false;
    }
    !matches!(data.tag(), Some("input" | "img" | "iframe"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test code may use unwrap for simplicity")]
mod tests {
    use super::*;
    use cinder_style::{Rule, Selector};

    fn build(html_children: &[&str], width: f32) -> (Document, StyleEngine, LayoutArena) {
        let mut doc = Document::new();
        let root = doc.root();
        for tag in html_children {
            let el = doc.new_element(*tag);
            doc.append_child(root, el);
            let text = doc.new_text("hi there friend");
            doc.append_child(el, text);
        }
        let mut styles = StyleEngine::new();
        let rules: Vec<Rule> = vec![Rule {
            media: None,
            selector: Selector::tag("p"),
            body: std::collections::HashMap::new(),
        }];
        styles.recompute(&doc, &rules);
        let mut arena = LayoutArena::new();
        arena.build_and_layout(&doc, &styles, width, 1.0);
        (doc, styles, arena)
    }

    #[test]
    fn single_paragraph_produces_block_and_line() {
        let (_doc, _styles, arena) = build(&["p"], 800.0);
        let root = arena.root.unwrap();
        let html_block = arena.nodes[root].children.get(&arena.graph)[0];
        assert_eq!(arena.nodes[html_block].kind, LayoutKind::Block);
        let p_block = arena.nodes[html_block].children.get(&arena.graph)[0];
        assert_eq!(arena.nodes[p_block].kind, LayoutKind::Block);
        let line_children = arena.nodes[p_block].children.get(&arena.graph).clone();
        assert_eq!(arena.nodes[line_children[0]].kind, LayoutKind::Line);
    }

    #[test]
    fn stacked_blocks_chain_y_by_previous_sibling_height() {
        let (_doc, _styles, arena) = build(&["p", "p"], 800.0);
        let root = arena.root.unwrap();
        let html_block = arena.nodes[root].children.get(&arena.graph)[0];
        let children = arena.nodes[html_block].children.get(&arena.graph).clone();
        assert_eq!(children.len(), 2);
        let first_bottom = *arena.nodes[children[0]].y.get(&arena.graph) + *arena.nodes[children[0]].height.get(&arena.graph);
        assert!((first_bottom - *arena.nodes[children[1]].y.get(&arena.graph)).abs() < 0.01);
    }

    #[test]
    fn narrow_width_wraps_to_a_second_line() {
        let (_doc, _styles, arena) = build(&["p"], 20.0);
        let root = arena.root.unwrap();
        let html_block = arena.nodes[root].children.get(&arena.graph)[0];
        let p_block = arena.nodes[html_block].children.get(&arena.graph)[0];
        let lines = arena.nodes[p_block].children.get(&arena.graph).clone();
        assert!(lines.len() > 1, "expected wrapping to produce multiple lines, got {}", lines.len());
    }
}
