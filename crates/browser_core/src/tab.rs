//! `Tab`: owns one document, its style rules, the script bridge, the
//! layout graph, and commit production (spec.md §3 Tab, §4.7 Animation
//! frame pipeline). Grounded directly on
//! `original_source/browser_ui.py`'s `Tab` class; the commit-producing
//! shape (as opposed to that source's direct-to-canvas `draw()`)
//! follows spec.md §4.7/§4.8's tab→browser handoff instead.

use crate::commit::CommitData;
use crate::focus;
use crate::selection::Selection;
use cinder_display::{BlendMode, DisplayArena, EffectKind};
use cinder_dom::{parse_into, Document, NodeKey};
use cinder_layout::{accessibility_tree, paint_tree, AccessibilityNode, LayoutArena};
use cinder_net::UrlClient;
use cinder_script::{ScriptEngine, StubScriptEngine, StubScriptHost};
use cinder_style::{Rule, StyleEngine};
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

const VSTEP: f32 = 18.0;
const SCROLL_STEP: f32 = 100.0;
const ZOOM_STEP: f32 = 1.1;
const ZOOM_MIN: f32 = 0.25;
const ZOOM_MAX: f32 = 5.0;

const DEFAULT_CSS: &str = "\
a { color: blue; }\n\
i { font-style: italic; }\n\
b { font-weight: bold; }\n\
small { font-size: 10px; }\n\
big { font-size: 22px; }\n\
";

enum ScriptSource {
    External(String),
    Inline(String),
}

fn collect_scripts(doc: &Document) -> Vec<ScriptSource> {
    let mut out = Vec::new();
    doc.walk(|key| {
        let data = doc.get(key);
        if data.tag() != Some("script") {
            return;
        }
        if let Some(src) = data.attribute("src") {
            out.push(ScriptSource::External(src.to_owned()));
            return;
        }
        let mut text = String::new();
        for &child in data.children() {
            if let Some(t) = doc.get(child).text() {
                text.push_str(t);
            }
        }
        if !text.trim().is_empty() {
            out.push(ScriptSource::Inline(text));
        }
    });
    out
}

fn collect_link_stylesheets(doc: &Document) -> Vec<String> {
    let mut out = Vec::new();
    doc.walk(|key| {
        let data = doc.get(key);
        if data.tag() == Some("link") && data.attribute("rel") == Some("stylesheet") {
            if let Some(href) = data.attribute("href") {
                out.push(href.to_owned());
            }
        }
    });
    out
}

fn collect_inline_style_text(doc: &Document) -> Vec<String> {
    let mut out = Vec::new();
    doc.walk(|key| {
        let data = doc.get(key);
        if data.tag() != Some("style") {
            return;
        }
        let mut text = String::new();
        for &child in data.children() {
            if let Some(t) = doc.get(child).text() {
                text.push_str(t);
            }
        }
        out.push(text);
    });
    out
}

/// One browsing context: document, style rules, script bridge, layout
/// root, and the `needs_*` dirty flags driving `render()` (spec.md §3).
pub struct Tab {
    pub url: Option<Url>,
    history: Vec<Url>,
    client: Arc<dyn UrlClient>,
    script_host: StubScriptHost,
    script_engine: StubScriptEngine,
    rules: Vec<Rule>,
    styles: StyleEngine,
    layout: LayoutArena,
    allowed_origins: Option<Vec<String>>,
    focus: Option<NodeKey>,
    selection: Selection,
    scroll: f32,
    scroll_changed_locally: bool,
    width: f32,
    height: f32,
    tab_height: f32,
    zoom: f32,
    needs_style: bool,
    needs_layout: bool,
    needs_paint: bool,
    display_list: Option<DisplayArena>,
}

impl Tab {
    #[must_use]
    pub fn new(tab_height: f32, height: f32, width: f32, client: Arc<dyn UrlClient>) -> Self {
        Self {
            url: None,
            history: Vec::new(),
            client,
            script_host: StubScriptHost::new(Document::new(), "about:blank"),
            script_engine: StubScriptEngine::new(),
            rules: Vec::new(),
            styles: StyleEngine::new(),
            layout: LayoutArena::new(),
            allowed_origins: None,
            focus: None,
            selection: Selection::new(),
            scroll: 0.0,
            scroll_changed_locally: false,
            width,
            height,
            tab_height,
            zoom: 1.0,
            needs_style: false,
            needs_layout: false,
            needs_paint: false,
            display_list: None,
        }
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        self.script_host.document()
    }

    #[must_use]
    pub fn scroll(&self) -> f32 {
        self.scroll
    }

    fn allowed_request(&self, url: &Url) -> bool {
        match &self.allowed_origins {
            Some(origins) => origins.iter().any(|origin| *origin == self.client.origin(url)),
            None => true,
        }
    }

    /// Navigates to `url`, fetching scripts/stylesheets the document
    /// references (spec.md §4.7's antecedent, grounded on
    /// `original_source/browser_ui.py`'s `Tab.load`). Network/CSP
    /// failures are logged and skip the resource; a failed top-level
    /// fetch aborts the navigation (spec.md §7).
    pub fn load(&mut self, url: Url, payload: Option<&str>) {
        let (headers, body) = match self.client.request(&url, self.url.as_ref(), payload) {
            Ok(response) => response,
            Err(err) => {
                log::warn!("navigation to {url} failed: {err}");
                return;
            }
        };

        self.scroll = 0.0;
        self.scroll_changed_locally = false;
        self.history.push(url.clone());
        self.url = Some(url.clone());

        let client = Arc::clone(&self.client);
        self.allowed_origins = headers.get("content-security-policy").and_then(|csp| {
            let mut parts = csp.split_whitespace();
            if parts.next()? != "default-src" {
                return None;
            }
            Some(parts.filter_map(|origin| Url::parse(origin).ok().map(|parsed| client.origin(&parsed))).collect())
        });

        let html = String::from_utf8_lossy(&body).into_owned();
        let mut doc = Document::new();
        parse_into(&mut doc, &html);

        let origin = self.client.origin(&url);
        self.script_host = StubScriptHost::new(doc, origin);
        self.script_engine = StubScriptEngine::new();
        self.focus = None;

        for script in collect_scripts(self.script_host.document()) {
            match script {
                ScriptSource::Inline(source) => self.script_engine.run_script(&source),
                ScriptSource::External(src) => {
                    let Ok(script_url) = self.client.resolve(&url, &src) else { continue };
                    if !self.allowed_request(&script_url) {
                        log::info!("blocked script {src} due to csp");
                        continue;
                    }
                    let Ok((_, body)) = self.client.request(&script_url, Some(&url), None) else { continue };
                    self.script_engine.run_script(&String::from_utf8_lossy(&body));
                }
            }
        }

        let mut rules = cinder_style::parse_stylesheet(DEFAULT_CSS);
        for href in collect_link_stylesheets(self.script_host.document()) {
            let Ok(style_url) = self.client.resolve(&url, &href) else { continue };
            if !self.allowed_request(&style_url) {
                log::info!("blocked stylesheet {href} due to csp");
                continue;
            }
            let Ok((_, body)) = self.client.request(&style_url, Some(&url), None) else { continue };
            rules.extend(cinder_style::parse_stylesheet(&String::from_utf8_lossy(&body)));
        }
        for inline in collect_inline_style_text(self.script_host.document()) {
            rules.extend(cinder_style::parse_stylesheet(&inline));
        }
        self.rules = rules;

        self.needs_style = true;
        self.needs_layout = true;
        self.needs_paint = true;
        self.render();
    }

    pub fn go_back(&mut self) {
        if self.history.len() <= 1 {
            return;
        }
        self.history.pop();
        if let Some(back) = self.history.pop() {
            self.load(back, None);
        }
    }

    /// style → layout → paint, each gated on its `needs_*` flag
    /// (spec.md §4.3/§4.4/§4.7 step 5), then clamps scroll.
    pub fn render(&mut self) {
        if self.needs_style {
            let mut rules = self.rules.clone();
            rules.sort_by_key(Rule::priority);
            let changed = self.styles.recompute(self.script_host.document(), &rules);
            if !changed.is_empty() {
                self.needs_layout = true;
            }
            self.needs_style = false;
        }
        if self.needs_layout {
            self.layout.build_and_layout(self.script_host.document(), &self.styles, self.width, self.zoom);
            self.needs_layout = false;
            self.needs_paint = true;
        }
        if self.needs_paint {
            if let Some(root) = self.layout.root {
                let mut display = paint_tree(&self.layout, &self.styles, root);
                if let (Some(overlay), Some(content_root)) = (self.selection.overlay_paint(), display.root()) {
                    let overlay_id = display.push_paint(overlay);
                    let wrapper =
                        display.push_effect(EffectKind::Transform { translation: (0.0, 0.0) }, vec![content_root, overlay_id]);
                    display.set_root(wrapper);
                    display.assign_parents();
                }
                self.display_list = Some(display);
            }
            self.needs_paint = false;
        }
        self.clamp_scroll();
    }

    fn document_height(&self) -> f32 {
        self.layout.root.map_or(0.0, |root| *self.layout.nodes[root].height.get(&self.layout.graph))
    }

    fn max_scroll(&self) -> f32 {
        (self.document_height() + 2.0 * VSTEP - self.tab_height).max(0.0)
    }

    fn clamp_scroll(&mut self) {
        self.scroll = self.scroll.clamp(0.0, self.max_scroll());
    }

    pub fn scrolldown(&mut self) {
        self.scroll_changed_locally = true;
        self.scroll = (self.scroll + SCROLL_STEP).min(self.max_scroll());
    }

    pub fn scrollup(&mut self) {
        if self.scroll <= 0.0 {
            return;
        }
        self.scroll_changed_locally = true;
        self.scroll = (self.scroll - SCROLL_STEP).max(0.0);
    }

    /// Positive `delta` scrolls up, matching the signed-tick convention
    /// spec.md §6 names for the mouse-wheel event.
    pub fn scroll_with_mouse(&mut self, delta: f32) {
        if delta < 0.0 {
            self.scrolldown();
        } else {
            self.scrollup();
        }
    }

    /// Anchors a selection drag at tab-local `(x, y)`, pre-scroll-offset
    /// (expansion: text selection overlay).
    pub fn begin_selection(&mut self, x: f32, y: f32) {
        self.selection.start(x, y + self.scroll);
    }

    /// Extends the active selection drag to `(x, y)`; a no-op if no
    /// drag is active.
    pub fn drag_selection(&mut self, x: f32, y: f32) {
        self.selection.extend_to(x, y + self.scroll);
        self.needs_paint = true;
        self.render();
    }

    /// Ends the active selection drag, dropping the overlay.
    pub fn end_selection(&mut self) {
        self.selection.clear();
        self.needs_paint = true;
        self.render();
    }

    /// Ctrl-`=` zoom step (spec.md §6); re-lays-out at the new zoom.
    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * ZOOM_STEP).min(ZOOM_MAX);
        self.needs_layout = true;
        self.needs_paint = true;
        self.render();
    }

    /// Ctrl-`-` zoom step (spec.md §6).
    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / ZOOM_STEP).max(ZOOM_MIN);
        self.needs_layout = true;
        self.needs_paint = true;
        self.render();
    }

    /// Ctrl-`0` zoom reset (spec.md §6).
    pub fn zoom_reset(&mut self) {
        self.zoom = 1.0;
        self.needs_layout = true;
        self.needs_paint = true;
        self.render();
    }

    /// Ctrl-`d` dark-mode toggle (spec.md §6), flipping the
    /// `prefers-color-scheme` media-query input the style engine
    /// cascades against.
    pub fn toggle_dark_mode(&mut self) {
        self.styles.dark_mode = !self.styles.dark_mode;
        self.needs_style = true;
        self.render();
    }

    /// The accessibility surface hook for this tab's current layout
    /// (spec.md's accessibility non-goal excludes OS AT wiring, not the
    /// hook itself).
    #[must_use]
    pub fn accessibility_tree(&self) -> Vec<AccessibilityNode> {
        accessibility_tree(&self.layout, self.document())
    }

    pub fn handle_resize(&mut self, width: f32, height: f32, chrome_height: f32) {
        self.width = width;
        self.height = height;
        self.tab_height = height - chrome_height;
        self.needs_layout = true;
        self.needs_paint = true;
        self.render();
    }

    fn hit_test(&self, x: f32, y: f32) -> Option<NodeKey> {
        let mut found = None;
        for layout_node in &self.layout.nodes {
            let rect = layout_node.self_rect(&self.layout.graph);
            if x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height {
                found = Some(layout_node.node);
            }
        }
        found
    }

    /// Hit-tests `(x,y)` (tab-local, pre-scroll-offset) against the
    /// laid-out tree and dispatches `<a>`/`<input>`/`<button>` default
    /// actions, short-circuited by a `click` listener's `preventDefault`
    /// (spec.md §4.7 antecedent, grounded on `Tab.click`).
    pub fn click(&mut self, x: f32, y: f32) {
        let previous_focus = self.focus.take();
        focus::set_focus(self.script_host.document_mut(), previous_focus, None);

        let y = y + self.scroll;
        let Some(hit) = self.hit_test(x, y) else {
            self.render();
            return;
        };

        let chain: Vec<NodeKey> = {
            let doc = self.script_host.document();
            let mut chain = vec![hit];
            chain.extend(doc.ancestors(hit));
            chain
        };

        for node in chain {
            let (is_element, tag, href) = {
                let data = self.script_host.document().get(node);
                (data.is_element(), data.tag().map(str::to_owned), data.attribute("href").map(str::to_owned))
            };
            if !is_element {
                continue;
            }
            match tag.as_deref() {
                Some("a") if href.is_some() => {
                    if self.script_engine.dispatch_event("click", node) {
                        return;
                    }
                    if let (Some(base), Some(href)) = (self.url.clone(), href) {
                        if let Ok(resolved) = self.client.resolve(&base, &href) {
                            self.load(resolved, None);
                        }
                    }
                    return;
                }
                Some("input") => {
                    if self.script_engine.dispatch_event("click", node) {
                        return;
                    }
                    self.script_host.document_mut().set_attribute(node, "value", "");
                    focus::set_focus(self.script_host.document_mut(), None, Some(node));
                    self.focus = Some(node);
                    self.render();
                    return;
                }
                Some("button") => {
                    if self.script_engine.dispatch_event("click", node) {
                        return;
                    }
                    self.submit_nearest_form(node);
                    return;
                }
                _ => {}
            }
        }
        self.render();
    }

    fn submit_nearest_form(&mut self, button: NodeKey) {
        let mut current = Some(button);
        while let Some(node) = current {
            let (tag, has_action, parent) = {
                let data = self.script_host.document().get(node);
                (data.tag().map(str::to_owned), data.attribute("action").is_some(), data.parent)
            };
            if tag.as_deref() == Some("form") && has_action {
                self.submit_form(node);
                return;
            }
            current = parent;
        }
        self.render();
    }

    fn submit_form(&mut self, form: NodeKey) {
        if self.script_engine.dispatch_event("submit", form) {
            return;
        }
        let doc = self.script_host.document();
        let mut inputs = Vec::new();
        let mut stack = vec![form];
        while let Some(node) = stack.pop() {
            let data = doc.get(node);
            if data.tag() == Some("input") {
                if let Some(name) = data.attribute("name") {
                    inputs.push((name.to_owned(), data.attribute("value").unwrap_or_default().to_owned()));
                }
            }
            stack.extend(data.children().iter().copied());
        }
        let Some(action) = doc.get(form).attribute("action").map(str::to_owned) else {
            return;
        };
        let Some(base) = self.url.clone() else {
            return;
        };
        let Ok(target) = self.client.resolve(&base, &action) else {
            return;
        };

        let body = inputs
            .iter()
            .map(|(name, value)| {
                format!(
                    "{}={}",
                    url::form_urlencoded::byte_serialize(name.as_bytes()).collect::<String>(),
                    url::form_urlencoded::byte_serialize(value.as_bytes()).collect::<String>(),
                )
            })
            .collect::<Vec<_>>()
            .join("&");
        self.load(target, Some(&body));
    }

    pub fn keypress(&mut self, ch: char) {
        let Some(focus) = self.focus else { return };
        if self.script_engine.dispatch_event("keydown", focus) {
            return;
        }
        let current = self.script_host.document().get(focus).attribute("value").unwrap_or_default().to_owned();
        self.script_host.document_mut().set_attribute(focus, "value", current + &ch.to_string());
        self.needs_style = true;
        self.render();
    }

    /// Runs one animation frame: rAF handlers, animation advance,
    /// re-render, and `CommitData` production (spec.md §4.7, the
    /// 7-step pipeline this method follows verbatim).
    pub fn run_animation_frame(&mut self, scroll_from_browser: Option<f32>) -> CommitData {
        if !self.scroll_changed_locally {
            if let Some(scroll) = scroll_from_browser {
                self.scroll = scroll;
            }
        }

        self.script_engine.run_animation_frame_callbacks();

        let animated = self.styles.advance_animations();
        if !animated.is_empty() {
            self.needs_paint = true;
        }

        let needs_composite = self.needs_style || self.needs_layout;

        self.render();

        let scroll = if self.scroll_changed_locally { Some(self.scroll) } else { None };
        self.scroll_changed_locally = false;

        let composited_updates = if needs_composite {
            None
        } else {
            let mut updates = HashMap::new();
            for node in animated {
                if let Some(style) = self.styles.get(node) {
                    let opacity = style.get("opacity").and_then(|v| v.parse::<f32>().ok()).unwrap_or(1.0);
                    let blend_mode = match style.get("mix-blend-mode").map(String::as_str) {
                        Some("multiply") => BlendMode::Multiply,
                        Some("screen") => BlendMode::Screen,
                        _ => BlendMode::Normal,
                    };
                    updates.insert(node.0 as u64, EffectKind::Blend { opacity, blend_mode, source_node: node.0 as u64 });
                }
            }
            Some(updates)
        };

        CommitData {
            url: self.url.as_ref().map(ToString::to_string).unwrap_or_default(),
            scroll,
            height: self.document_height() + 2.0 * VSTEP,
            display_list: self.display_list.take(),
            composited_updates,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test code may use unwrap for simplicity")]
mod tests {
    use super::*;
    use cinder_net::Headers;
    use std::collections::HashMap as Map;

    struct FixtureClient {
        pages: Map<String, Vec<u8>>,
    }

    impl UrlClient for FixtureClient {
        fn request(&self, url: &Url, _referrer: Option<&Url>, _payload: Option<&str>) -> anyhow::Result<(Headers, Vec<u8>)> {
            self.pages
                .get(url.as_str())
                .cloned()
                .map(|body| (Headers::new(), body))
                .ok_or_else(|| anyhow::anyhow!("no fixture for {url}"))
        }

        fn resolve(&self, base: &Url, relative: &str) -> anyhow::Result<Url> {
            base.join(relative).map_err(|err| anyhow::anyhow!("{err}"))
        }

        fn origin(&self, url: &Url) -> String {
            format!("{}://{}", url.scheme(), url.host_str().unwrap_or_default())
        }
    }

    fn client_with(pages: &[(&str, &str)]) -> Arc<dyn UrlClient> {
        let pages = pages.iter().map(|(url, body)| ((*url).to_owned(), body.as_bytes().to_vec())).collect();
        Arc::new(FixtureClient { pages })
    }

    /// Scenario 1: a single paragraph at 800x600 lays out as one line
    /// and commits a height of `2*VSTEP + linespace`.
    #[test]
    fn scenario_1_single_paragraph_commits_expected_height() {
        let client = client_with(&[("https://example.com/", "<p>hello</p>")]);
        let mut tab = Tab::new(600.0, 600.0, 800.0, client);
        tab.load(Url::parse("https://example.com/").unwrap(), None);

        let data = tab.run_animation_frame(None);
        assert!(data.height > 2.0 * VSTEP);
        assert!(data.display_list.is_some());
    }

    #[test]
    fn clicking_a_link_navigates_to_its_resolved_href() {
        let client = client_with(&[
            ("https://example.com/", "<a href=\"/next\">go</a>"),
            ("https://example.com/next", "<p>arrived</p>"),
        ]);
        let mut tab = Tab::new(600.0, 600.0, 800.0, client);
        tab.load(Url::parse("https://example.com/").unwrap(), None);

        let hit = tab.hit_test(20.0, 20.0).expect("anchor should be hit-testable near the origin");
        assert_eq!(tab.document().get(hit).text(), Some("go"));
        tab.click(20.0, 20.0);

        assert_eq!(tab.url.as_ref().unwrap().as_str(), "https://example.com/next");
    }

    #[test]
    fn scroll_is_clamped_to_document_height() {
        let client = client_with(&[("https://example.com/", "<p>hello</p>")]);
        let mut tab = Tab::new(50.0, 600.0, 800.0, client);
        tab.load(Url::parse("https://example.com/").unwrap(), None);

        for _ in 0..20 {
            tab.scrolldown();
        }
        assert!(tab.scroll >= 0.0);
        assert!(tab.scroll <= tab.max_scroll());
    }

    #[test]
    fn selection_drag_adds_an_overlay_paint_command_to_the_display_list() {
        let client = client_with(&[("https://example.com/", "<p>hello</p>")]);
        let mut tab = Tab::new(600.0, 600.0, 800.0, client);
        tab.load(Url::parse("https://example.com/").unwrap(), None);
        let before = tab.display_list.as_ref().map(DisplayArena::len).unwrap_or(0);

        tab.begin_selection(5.0, 5.0);
        tab.drag_selection(50.0, 50.0);

        let after = tab.display_list.as_ref().map(DisplayArena::len).unwrap_or(0);
        assert!(after > before);
    }

    #[test]
    fn go_back_reloads_the_previous_history_entry() {
        let client = client_with(&[
            ("https://example.com/a", "<p>a</p>"),
            ("https://example.com/b", "<p>b</p>"),
        ]);
        let mut tab = Tab::new(600.0, 600.0, 800.0, client);
        tab.load(Url::parse("https://example.com/a").unwrap(), None);
        tab.load(Url::parse("https://example.com/b").unwrap(), None);
        tab.go_back();
        assert_eq!(tab.url.as_ref().unwrap().as_str(), "https://example.com/a");
    }
}
