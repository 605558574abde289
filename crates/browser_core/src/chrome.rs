//! Tab bar / url bar / back arrow / new-tab-plus chrome widget
//! (spec.md §6 "Chrome"), grounded directly on
//! `original_source/browser_ui.py`'s `Chrome` class — hit-rect layout,
//! `click`/`keypress`/`enter`/`blur` dispatch, and `paint()`.

use cinder_display::{Color, PaintCommand, Rect};
use cinder_layout::font::{Font, FontStyle, FontWeight};

const PADDING: f32 = 5.0;
const DEFAULT_TAB_URL: &str = "about:blank";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChromeFocus {
    AddressBar,
}

/// What a chrome click resolved to; the browser executes it against its
/// own tab list (the `Chrome` struct only knows rects, not tabs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChromeAction {
    NewTab,
    GoBack,
    FocusAddressBar,
    SelectTab(usize),
    None,
}

pub struct Chrome {
    font: Font,
    padding: f32,
    tabbar_bottom: f32,
    pub urlbar_top: f32,
    pub urlbar_bottom: f32,
    pub bottom: f32,
    newtab_rect: Rect,
    back_rect: Rect,
    address_rect: Rect,
    pub focus: Option<ChromeFocus>,
    pub address_bar: String,
}

impl Chrome {
    #[must_use]
    pub fn new(width: f32) -> Self {
        let font = Font { size_px: 12.0, weight: FontWeight::Normal, style: FontStyle::Normal };
        let font_height = font.linespace();
        let tabbar_bottom = font_height + 2.0 * PADDING;
        let plus_width = font.measure_text("+") + 2.0 * PADDING;
        let newtab_rect = Rect::new(PADDING, PADDING, plus_width, font_height);
        let urlbar_top = tabbar_bottom;
        let urlbar_bottom = urlbar_top + font_height + 2.0 * PADDING;
        let back_width = font.measure_text("<") + 2.0 * PADDING;
        let back_rect = Rect::new(PADDING, urlbar_top + PADDING, back_width, urlbar_bottom - urlbar_top - 2.0 * PADDING);
        let address_rect = Rect::new(
            back_rect.x + back_rect.width + PADDING,
            urlbar_top + PADDING,
            (width - PADDING - (back_rect.x + back_rect.width + PADDING)).max(0.0),
            urlbar_bottom - urlbar_top - 2.0 * PADDING,
        );
        Self {
            font,
            padding: PADDING,
            tabbar_bottom,
            urlbar_top,
            urlbar_bottom,
            bottom: urlbar_bottom,
            newtab_rect,
            back_rect,
            address_rect,
            focus: None,
            address_bar: String::new(),
        }
    }

    fn tab_rect(&self, index: usize) -> Rect {
        let tabs_start = self.newtab_rect.x + self.newtab_rect.width + self.padding;
        let tab_width = self.font.measure_text("Tab X") + 2.0 * self.padding;
        Rect::new(tabs_start + tab_width * index as f32, 0.0, tab_width, self.tabbar_bottom)
    }

    #[cfg(test)]
    #[must_use]
    pub fn tab_rect_for_test(&self, index: usize) -> Rect {
        self.tab_rect(index)
    }

    /// Resolves a browser-surface click into an action (spec.md §6
    /// `click(x,y)` dispatching on hit rects). `tab_count` bounds which
    /// tab-bar slots are live.
    #[must_use]
    pub fn click(&mut self, x: f32, y: f32, tab_count: usize) -> ChromeAction {
        self.focus = None;
        if contains(self.newtab_rect, x, y) {
            return ChromeAction::NewTab;
        }
        if contains(self.back_rect, x, y) {
            return ChromeAction::GoBack;
        }
        if contains(self.address_rect, x, y) {
            self.focus = Some(ChromeFocus::AddressBar);
            self.address_bar.clear();
            return ChromeAction::FocusAddressBar;
        }
        for i in 0..tab_count {
            if contains(self.tab_rect(i), x, y) {
                return ChromeAction::SelectTab(i);
            }
        }
        ChromeAction::None
    }

    /// Returns `true` (consuming the keypress) only while the address
    /// bar has focus (spec.md §6 `keypress`).
    pub fn keypress(&mut self, ch: char) -> bool {
        if self.focus == Some(ChromeFocus::AddressBar) {
            self.address_bar.push(ch);
            true
        } else {
            false
        }
    }

    /// Returns the URL to navigate to if Enter was pressed while the
    /// address bar had focus.
    pub fn enter(&mut self) -> Option<String> {
        if self.focus == Some(ChromeFocus::AddressBar) {
            self.focus = None;
            if self.address_bar.is_empty() {
                // spec.md §7: "an empty address bar does nothing on Enter".
                return None;
            }
            return Some(std::mem::take(&mut self.address_bar));
        }
        None
    }

    pub fn blur(&mut self) {
        self.focus = None;
    }

    /// Programmatic equivalent of clicking the address bar (spec.md §6
    /// Ctrl-`l` chord).
    pub fn focus_address_bar(&mut self) {
        self.focus = Some(ChromeFocus::AddressBar);
        self.address_bar.clear();
    }

    /// Paints the whole chrome surface (spec.md §6 `paint()`).
    #[must_use]
    pub fn paint(&self, width: f32, tab_titles: &[String], active_tab: Option<usize>, current_url: &str) -> Vec<PaintCommand> {
        let mut cmds = vec![
            PaintCommand::Rect { rect: Rect::new(0.0, 0.0, width, self.bottom), color: Color::WHITE },
            PaintCommand::Line {
                rect: Rect::new(0.0, self.bottom, width, 1.0),
                p1: (0.0, self.bottom),
                p2: (width, self.bottom),
                color: Color::BLACK,
                thickness: 1.0,
            },
            PaintCommand::Text {
                rect: Rect::new(self.newtab_rect.x + self.padding, self.newtab_rect.y, 10.0, self.newtab_rect.height),
                text: "+".to_owned(),
                color: Color::BLACK,
                font_size_px: self.font.size_px,
            },
        ];

        for (i, title) in tab_titles.iter().enumerate() {
            let bounds = self.tab_rect(i);
            cmds.push(PaintCommand::Text {
                rect: Rect::new(bounds.x + self.padding, bounds.y + self.padding, bounds.width, bounds.height),
                text: title.clone(),
                color: Color::BLACK,
                font_size_px: self.font.size_px,
            });
            if active_tab == Some(i) {
                cmds.push(PaintCommand::Line {
                    rect: Rect::new(bounds.x, bounds.y + bounds.height, bounds.width, 1.0),
                    p1: (bounds.x, bounds.y + bounds.height),
                    p2: (bounds.x + bounds.width, bounds.y + bounds.height),
                    color: Color::WHITE,
                    thickness: 1.0,
                });
            }
        }

        cmds.push(PaintCommand::Text {
            rect: Rect::new(self.back_rect.x + self.padding, self.back_rect.y, 10.0, self.back_rect.height),
            text: "<".to_owned(),
            color: Color::BLACK,
            font_size_px: self.font.size_px,
        });

        let address_text = if self.focus == Some(ChromeFocus::AddressBar) { self.address_bar.as_str() } else { current_url };
        cmds.push(PaintCommand::Text {
            rect: Rect::new(self.address_rect.x + self.padding, self.address_rect.y, self.address_rect.width, self.address_rect.height),
            text: if address_text.is_empty() { DEFAULT_TAB_URL.to_owned() } else { address_text.to_owned() },
            color: Color::BLACK,
            font_size_px: self.font.size_px,
        });
        cmds
    }
}

fn contains(rect: Rect, x: f32, y: f32) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test code may use unwrap for simplicity")]
mod tests {
    use super::*;

    #[test]
    fn clicking_new_tab_rect_returns_new_tab_action() {
        let mut chrome = Chrome::new(800.0);
        assert_eq!(chrome.click(7.0, 7.0, 0), ChromeAction::NewTab);
    }

    #[test]
    fn clicking_address_bar_focuses_it_and_keypress_is_consumed() {
        let mut chrome = Chrome::new(800.0);
        let action = chrome.click(chrome.address_rect_for_test().x + 1.0, chrome.address_rect_for_test().y + 1.0, 0);
        assert_eq!(action, ChromeAction::FocusAddressBar);
        assert!(chrome.keypress('h'));
        assert_eq!(chrome.address_bar, "h");
    }

    #[test]
    fn enter_with_empty_address_bar_does_nothing() {
        let mut chrome = Chrome::new(800.0);
        chrome.focus = Some(ChromeFocus::AddressBar);
        assert_eq!(chrome.enter(), None);
    }

    #[test]
    fn enter_returns_and_clears_address_bar() {
        let mut chrome = Chrome::new(800.0);
        chrome.focus = Some(ChromeFocus::AddressBar);
        chrome.address_bar = "example.com".to_owned();
        assert_eq!(chrome.enter(), Some("example.com".to_owned()));
        assert!(chrome.address_bar.is_empty());
    }

    impl Chrome {
        fn address_rect_for_test(&self) -> Rect {
            self.address_rect
        }
    }
}
