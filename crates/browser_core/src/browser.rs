//! `Browser`: owns the tab list, the chrome, and the commit/composite/
//! raster/draw pipeline (spec.md §3 Browser, §4.8 Commit protocol),
//! grounded directly on `original_source/browser_ui.py`'s `Browser`
//! class, generalized from its single-threaded direct-draw loop to the
//! commit-and-flag-driven pipeline spec.md §4.7/§4.8 describe.

use crate::chrome::{Chrome, ChromeAction};
use crate::commit::CommitData;
use crate::input::{InputEvent, Modifier};
use crate::tab::Tab;
use crate::task_runner::TaskRunner;
use crate::telemetry::Telemetry;
use crate::timer::AnimationTimer;
use cinder_compositor::{composite, CompositedUpdates};
use cinder_display::DisplayArena;
use cinder_net::UrlClient;
use cinder_raster::canvas::Canvas;
use cinder_raster::LayerSurface;
use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use url::Url;

/// A tab paired with its own task-runner thread. Kept separate from
/// `Tab` itself (spec.md's component table lists "Task runner" and
/// "Tab" as distinct collaborators; a tab scheduling tasks on itself
/// would be circular ownership).
struct TabHandle {
    tab: Arc<Mutex<Tab>>,
    tasks: TaskRunner,
}

/// The browser-side half of the commit pipeline: active tab, chrome,
/// and the composite/raster/draw flags a commit sets (spec.md §4.8).
pub struct Browser<C: Canvas> {
    chrome: Chrome,
    tabs: Vec<TabHandle>,
    active_tab: usize,
    width: f32,
    height: f32,
    client: Arc<dyn UrlClient>,
    timer: AnimationTimer,

    url: String,
    scroll: f32,
    content_height: f32,
    display_list: Option<DisplayArena>,
    pending_updates: Option<CompositedUpdates>,

    needs_composite: bool,
    needs_raster: bool,
    needs_draw: bool,

    layers: Vec<cinder_compositor::layer::CompositedLayer>,
    canvas: C,
    surfaces: HashMap<usize, LayerSurface<C::Target>>,
    window_target: Option<C::Target>,

    /// Commits produced by tasks running on a tab's own thread land here
    /// (spec.md §5/§4.8); `pump_commits` drains them on the browser
    /// thread before each composite.
    commit_tx: Sender<(usize, CommitData)>,
    commit_rx: Receiver<(usize, CommitData)>,
    accessibility_enabled: bool,
    wants_quit: bool,

    /// Chrome Trace Event Format writer (spec.md §5 "Persisted state");
    /// `None` unless `enable_telemetry` was called.
    telemetry: Option<Telemetry>,
    hud_enabled: bool,
}

impl<C: Canvas> Browser<C> {
    #[must_use]
    pub fn new(width: f32, height: f32, client: Arc<dyn UrlClient>, canvas: C) -> Self {
        let chrome = Chrome::new(width);
        let (commit_tx, commit_rx) = mpsc::channel();
        Self {
            chrome,
            tabs: Vec::new(),
            active_tab: 0,
            width,
            height,
            client,
            timer: AnimationTimer::new(),
            url: String::new(),
            scroll: 0.0,
            content_height: 0.0,
            display_list: None,
            pending_updates: None,
            needs_composite: false,
            needs_raster: false,
            needs_draw: false,
            layers: Vec::new(),
            canvas,
            surfaces: HashMap::new(),
            window_target: None,
            commit_tx,
            commit_rx,
            accessibility_enabled: false,
            wants_quit: false,
            telemetry: None,
            hud_enabled: false,
        }
    }

    /// Opens a Chrome Trace Event Format trace file and begins recording
    /// composite/raster/draw spans into it (spec.md §5 "Persisted
    /// state", gated by `EngineConfig::telemetry_enabled`).
    ///
    /// # Errors
    /// Returns an error if `path` cannot be created or written to.
    pub fn enable_telemetry(&mut self, path: &std::path::Path) -> anyhow::Result<()> {
        self.telemetry = Some(Telemetry::open(path)?);
        Ok(())
    }

    /// Gates the per-frame HUD stats log line (`EngineConfig::hud_enabled`).
    pub fn set_hud_enabled(&mut self, enabled: bool) {
        self.hud_enabled = enabled;
    }

    #[must_use]
    pub fn active_tab_index(&self) -> usize {
        self.active_tab
    }

    #[must_use]
    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    fn tab_titles(&self) -> Vec<String> {
        (0..self.tabs.len()).map(|i| format!("Tab {i}")).collect()
    }

    fn active_tab_handle(&self) -> &TabHandle {
        &self.tabs[self.active_tab]
    }

    /// Schedules `work` onto tab `index`'s own worker thread (spec.md §5:
    /// input handlers post tasks into the tab's FIFO rather than mutating
    /// the tab from the calling thread). A no-op if `index` has no tab.
    fn schedule_on_tab<F>(&self, index: usize, work: F)
    where
        F: FnOnce(&mut Tab) + Send + 'static,
    {
        let Some(handle) = self.tabs.get(index) else { return };
        let tab = Arc::clone(&handle.tab);
        handle.tasks.schedule_task(Box::new(move || {
            let mut tab = tab.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            work(&mut tab);
        }));
    }

    /// Drains commits produced by tab worker threads since the last call
    /// and applies each in arrival order (spec.md §4.8).
    pub fn pump_commits(&mut self) {
        while let Ok((index, data)) = self.commit_rx.try_recv() {
            self.commit(index, data);
        }
    }

    /// Whether any tab still has worker-thread tasks queued; the
    /// embedder should keep polling (rather than waiting for the next
    /// window event) while this is `true`, so an async commit still
    /// reaches the screen.
    #[must_use]
    pub fn has_pending_work(&self) -> bool {
        self.tabs.iter().any(|handle| handle.tasks.pending_len() > 0)
    }

    /// Set once a Ctrl-`q` chord has been handled; the embedder's event
    /// loop should exit once this is `true`.
    #[must_use]
    pub fn wants_quit(&self) -> bool {
        self.wants_quit
    }

    #[must_use]
    pub fn accessibility_enabled(&self) -> bool {
        self.accessibility_enabled
    }

    /// Ctrl-`a` chord: toggles the accessibility surface hook for the
    /// active tab (spec.md's accessibility non-goal excludes OS AT
    /// wiring, not the hook itself).
    pub fn toggle_accessibility(&mut self) {
        self.accessibility_enabled = !self.accessibility_enabled;
        if self.accessibility_enabled {
            if let Some(handle) = self.tabs.get(self.active_tab) {
                let tab = handle.tab.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                log::info!("accessibility surface: {} nodes", tab.accessibility_tree().len());
            }
        }
    }

    /// Creates a new tab, loads `url` into it, makes it active, and
    /// commits its first frame synchronously (spec.md §6 `Browser.new_tab`).
    pub fn new_tab(&mut self, url: Url) {
        let tab_height = self.height - self.chrome.bottom;
        let mut tab = Tab::new(tab_height, self.height, self.width, Arc::clone(&self.client));
        tab.load(url, None);
        let data = tab.run_animation_frame(None);

        let index = self.tabs.len();
        let tasks = TaskRunner::start(format!("tab-{index}"));
        self.tabs.push(TabHandle { tab: Arc::new(Mutex::new(tab)), tasks });
        self.active_tab = index;
        self.commit(index, data);
    }

    /// Applies a tab's `CommitData` if it's still the active tab,
    /// per spec.md §4.8's ignore-stale-commit rule.
    pub fn commit(&mut self, tab_index: usize, data: CommitData) {
        if tab_index != self.active_tab {
            log::debug!("ignoring commit from inactive tab {tab_index}");
            return;
        }
        self.url = data.url;
        if let Some(scroll) = data.scroll {
            self.scroll = scroll;
        }
        self.content_height = data.height;
        if let Some(display_list) = data.display_list {
            self.display_list = Some(display_list);
        }
        self.pending_updates = data.composited_updates;
        self.needs_composite = true;
    }

    /// Runs the composite → raster → draw cascade, each stage gated by
    /// its own flag and cleared once run (spec.md §4.8).
    pub fn composite_raster_and_draw(&mut self) {
        self.pump_commits();
        if self.needs_composite {
            if let Some(telemetry) = &self.telemetry {
                telemetry.begin("composite");
            }
            if let Some(display_list) = &self.display_list {
                let updates = self.pending_updates.take().unwrap_or_default();
                let result = composite(display_list, &updates);
                self.layers = result.layers;
            }
            if let Some(telemetry) = &self.telemetry {
                telemetry.end("composite");
            }
            self.needs_composite = false;
            self.needs_raster = true;
        }

        if self.needs_raster {
            if let Some(telemetry) = &self.telemetry {
                telemetry.begin("raster");
            }
            self.surfaces.retain(|&index, _| index < self.layers.len());
            if let Some(display_list) = &self.display_list {
                for (index, layer) in self.layers.iter().enumerate() {
                    let surface = self.surfaces.entry(index).or_insert_with(LayerSurface::new);
                    cinder_raster::raster_layer(&mut self.canvas, surface, layer, display_list);
                }
            }
            if let Some(telemetry) = &self.telemetry {
                telemetry.end("raster");
            }
            self.needs_raster = false;
            self.needs_draw = true;
        }

        if self.needs_draw {
            if let Some(telemetry) = &self.telemetry {
                telemetry.begin("draw");
            }
            if self.window_target.is_none() {
                self.window_target = Some(self.canvas.render_target(self.width as u32, self.height as u32));
            }
            self.canvas.save();
            self.canvas.clear(cinder_display::Color::WHITE);
            for command in self.chrome.paint(self.width, &self.tab_titles(), Some(self.active_tab), &self.url) {
                self.canvas.draw(&command);
            }
            self.canvas.restore();
            if let Some(target) = &mut self.window_target {
                if let Err(err) = self.canvas.present(target) {
                    log::warn!("presenting frame failed: {err}");
                }
            }
            if let Some(telemetry) = &self.telemetry {
                telemetry.end("draw");
            }
            if self.hud_enabled {
                log::debug!("hud: {} layer(s), {} tab(s)", self.layers.len(), self.tabs.len());
            }
            self.needs_draw = false;
        }
    }

    /// Runs one animation frame on the active tab's own thread and
    /// delivers the resulting commit back over `commit_tx` (spec.md §5,
    /// §4.9): queued after whatever input mutation preceded it on that
    /// tab's FIFO, so it always observes that mutation first.
    pub fn run_animation_frame(&mut self) {
        if self.tabs.is_empty() {
            return;
        }
        let index = self.active_tab;
        let scroll = self.scroll;
        let handle = self.active_tab_handle();
        let tab = Arc::clone(&handle.tab);
        let tx = self.commit_tx.clone();
        handle.tasks.schedule_task(Box::new(move || {
            let data = {
                let mut tab = tab.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                tab.run_animation_frame(Some(scroll))
            };
            let _ = tx.send((index, data));
        }));
    }

    /// Schedules an animation frame at most once per refresh interval,
    /// mirroring spec.md §4.9's `set_needs_animation_frame`.
    pub fn schedule_animation_frame<F>(&self, on_fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.timer.schedule(on_fire);
    }

    pub fn handle_click(&mut self, x: f32, y: f32) {
        if y < self.chrome.bottom {
            match self.chrome.click(x, y, self.tabs.len()) {
                ChromeAction::NewTab => self.new_tab(Url::parse("about:blank").unwrap_or_else(|_| unreachable!())),
                ChromeAction::GoBack => self.go_back(),
                ChromeAction::SelectTab(index) if index < self.tabs.len() => {
                    self.active_tab = index;
                    self.needs_composite = true;
                }
                ChromeAction::FocusAddressBar | ChromeAction::SelectTab(_) | ChromeAction::None => {}
            }
        } else {
            self.chrome.blur();
            let index = self.active_tab;
            let chrome_bottom = self.chrome.bottom;
            self.schedule_on_tab(index, move |tab| {
                tab.begin_selection(x, y - chrome_bottom);
                tab.click(x, y - chrome_bottom);
            });
            self.run_animation_frame();
        }
    }

    /// Extends an in-progress selection drag (expansion).
    pub fn handle_mouse_drag(&mut self, x: f32, y: f32) {
        if y < self.chrome.bottom {
            return;
        }
        let index = self.active_tab;
        let chrome_bottom = self.chrome.bottom;
        self.schedule_on_tab(index, move |tab| tab.drag_selection(x, y - chrome_bottom));
        self.run_animation_frame();
    }

    /// Ends an in-progress selection drag (expansion).
    pub fn handle_mouse_up(&mut self) {
        let index = self.active_tab;
        self.schedule_on_tab(index, Tab::end_selection);
        self.run_animation_frame();
    }

    pub fn go_back(&mut self) {
        let index = self.active_tab;
        self.schedule_on_tab(index, Tab::go_back);
        self.run_animation_frame();
    }

    pub fn handle_key(&mut self, ch: char) {
        if self.chrome.keypress(ch) {
            self.needs_composite = true;
            return;
        }
        let index = self.active_tab;
        self.schedule_on_tab(index, move |tab| tab.keypress(ch));
        self.run_animation_frame();
    }

    pub fn handle_enter(&mut self) {
        if let Some(raw_url) = self.chrome.enter() {
            if let Ok(url) = Url::parse(&raw_url) {
                let index = self.active_tab;
                self.schedule_on_tab(index, move |tab| tab.load(url, None));
                self.run_animation_frame();
                return;
            }
        }
        self.needs_composite = true;
    }

    pub fn handle_down(&mut self) {
        let index = self.active_tab;
        self.schedule_on_tab(index, Tab::scrolldown);
        self.run_animation_frame();
    }

    pub fn handle_up(&mut self) {
        let index = self.active_tab;
        self.schedule_on_tab(index, Tab::scrollup);
        self.run_animation_frame();
    }

    pub fn handle_scroll_with_mouse(&mut self, delta: f32) {
        let index = self.active_tab;
        self.schedule_on_tab(index, move |tab| tab.scroll_with_mouse(delta));
        self.run_animation_frame();
    }

    pub fn handle_resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
        self.chrome = Chrome::new(width);
        let chrome_bottom = self.chrome.bottom;
        let index = self.active_tab;
        self.schedule_on_tab(index, move |tab| tab.handle_resize(width, height, chrome_bottom));
        self.run_animation_frame();
    }

    pub fn handle_event(&mut self, event: InputEvent) {
        match event {
            InputEvent::Quit => {}
            InputEvent::MouseDown { x, y } => self.handle_click(x, y),
            InputEvent::MouseDrag { x, y } => self.handle_mouse_drag(x, y),
            InputEvent::MouseUp => self.handle_mouse_up(),
            InputEvent::MouseWheel { delta } => self.handle_scroll_with_mouse(delta),
            InputEvent::KeyDown { keysym } => {
                if keysym == "Return" {
                    self.handle_enter();
                } else if keysym == "Down" {
                    self.handle_down();
                } else if keysym == "Up" {
                    self.handle_up();
                }
            }
            InputEvent::TextInput { text } => {
                for ch in text.chars() {
                    self.handle_key(ch);
                }
            }
            InputEvent::Chord { modifier: Modifier::Ctrl, key } => match key.as_str() {
                "t" => self.new_tab(Url::parse("about:blank").unwrap_or_else(|_| unreachable!())),
                "w" => {
                    // Non-goal (spec.md): tab-close is not modeled; left
                    // as a no-op chord instead of panicking on an
                    // unrecognized key.
                }
                "=" | "+" => {
                    let index = self.active_tab;
                    self.schedule_on_tab(index, Tab::zoom_in);
                    self.run_animation_frame();
                }
                "-" => {
                    let index = self.active_tab;
                    self.schedule_on_tab(index, Tab::zoom_out);
                    self.run_animation_frame();
                }
                "0" => {
                    let index = self.active_tab;
                    self.schedule_on_tab(index, Tab::zoom_reset);
                    self.run_animation_frame();
                }
                "ArrowLeft" => self.go_back(),
                "l" => {
                    self.chrome.focus_address_bar();
                    self.needs_composite = true;
                }
                "d" => {
                    let index = self.active_tab;
                    self.schedule_on_tab(index, Tab::toggle_dark_mode);
                    self.run_animation_frame();
                }
                "a" => self.toggle_accessibility(),
                "Tab" => {
                    if !self.tabs.is_empty() {
                        self.active_tab = (self.active_tab + 1) % self.tabs.len();
                        self.needs_composite = true;
                    }
                }
                "q" => self.wants_quit = true,
                _ => {}
            },
            InputEvent::Resize { width, height } => self.handle_resize(width, height),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test code may use unwrap for simplicity")]
mod tests {
    use super::*;
    use cinder_net::Headers;
    use cinder_raster::CpuCanvas;
    use std::time::{Duration, Instant};

    struct FixtureClient {
        pages: HashMap<String, Vec<u8>>,
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

    fn test_browser(pages: &[(&str, &str)]) -> Browser<CpuCanvas> {
        Browser::new(800.0, 600.0, client_with(pages), CpuCanvas::new())
    }

    #[test]
    fn new_tab_commits_a_non_empty_display_list() {
        let mut browser = test_browser(&[("https://example.com/", "<p>hello</p>")]);
        browser.new_tab(Url::parse("https://example.com/").unwrap());
        assert_eq!(browser.tab_count(), 1);
        assert!(browser.display_list.is_some());
    }

    #[test]
    fn composite_raster_and_draw_clears_every_flag() {
        let mut browser = test_browser(&[("https://example.com/", "<p>hello</p>")]);
        browser.new_tab(Url::parse("https://example.com/").unwrap());
        browser.composite_raster_and_draw();
        assert!(!browser.needs_composite);
        assert!(!browser.needs_raster);
        assert!(!browser.needs_draw);
    }

    #[test]
    fn commit_from_inactive_tab_is_ignored() {
        let mut browser = test_browser(&[("https://example.com/", "<p>hello</p>")]);
        browser.new_tab(Url::parse("https://example.com/").unwrap());
        let stale_url = browser.url.clone();
        browser.commit(
            99,
            CommitData { url: "https://evil.example/".to_owned(), scroll: None, height: 0.0, display_list: None, composited_updates: None },
        );
        assert_eq!(browser.url, stale_url);
    }

    #[test]
    fn selecting_a_tab_makes_it_active() {
        let mut browser = test_browser(&[
            ("https://example.com/a", "<p>a</p>"),
            ("https://example.com/b", "<p>b</p>"),
        ]);
        browser.new_tab(Url::parse("https://example.com/a").unwrap());
        browser.new_tab(Url::parse("https://example.com/b").unwrap());
        assert_eq!(browser.active_tab_index(), 1);

        let tab_bar_y = 1.0;
        let select_x = browser.chrome.tab_rect_for_test(0).x + 1.0;
        browser.handle_click(select_x, tab_bar_y);
        assert_eq!(browser.active_tab_index(), 0);
    }

    /// `handle_down` dispatches the scroll mutation onto the tab's own
    /// task-runner thread rather than mutating it synchronously; the
    /// resulting commit only becomes visible once `pump_commits` drains
    /// the channel the worker thread sent it over.
    #[test]
    fn handle_down_dispatches_through_the_tab_task_runner_and_eventually_commits() {
        let page = "<p>line</p>".repeat(80);
        let mut browser = test_browser(&[("https://example.com/", &page)]);
        browser.new_tab(Url::parse("https://example.com/").unwrap());
        browser.handle_down();

        let deadline = Instant::now() + Duration::from_secs(2);
        while browser.scroll == 0.0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
            browser.pump_commits();
        }
        assert!(browser.scroll > 0.0);
    }

    #[test]
    fn ctrl_q_chord_sets_wants_quit() {
        let mut browser = test_browser(&[("https://example.com/", "<p>hello</p>")]);
        browser.new_tab(Url::parse("https://example.com/").unwrap());
        assert!(!browser.wants_quit());
        browser.handle_event(InputEvent::Chord { modifier: Modifier::Ctrl, key: "q".to_owned() });
        assert!(browser.wants_quit());
    }

    #[test]
    fn ctrl_tab_chord_cycles_the_active_tab() {
        let mut browser = test_browser(&[
            ("https://example.com/a", "<p>a</p>"),
            ("https://example.com/b", "<p>b</p>"),
        ]);
        browser.new_tab(Url::parse("https://example.com/a").unwrap());
        browser.new_tab(Url::parse("https://example.com/b").unwrap());
        assert_eq!(browser.active_tab_index(), 1);
        browser.handle_event(InputEvent::Chord { modifier: Modifier::Ctrl, key: "Tab".to_owned() });
        assert_eq!(browser.active_tab_index(), 0);
    }
}
