//! Text selection overlay (expansion: supplemental to spec.md, present
//! in the original's larger variant and the teacher's
//! `page_handler::selection` module — a highlighted rect tracking a
//! drag gesture over laid-out text).

use cinder_display::{Color, PaintCommand, Rect};

#[derive(Debug, Clone, Copy, Default)]
pub struct Selection {
    anchor: Option<(f32, f32)>,
    current: Option<(f32, f32)>,
}

impl Selection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, x: f32, y: f32) {
        self.anchor = Some((x, y));
        self.current = Some((x, y));
    }

    pub fn extend_to(&mut self, x: f32, y: f32) {
        if self.anchor.is_some() {
            self.current = Some((x, y));
        }
    }

    pub fn clear(&mut self) {
        self.anchor = None;
        self.current = None;
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.anchor.is_some()
    }

    /// The normalized selection rect, or `None` if no drag is active.
    #[must_use]
    pub fn rect(&self) -> Option<Rect> {
        let (anchor, current) = (self.anchor?, self.current?);
        let x = anchor.0.min(current.0);
        let y = anchor.1.min(current.1);
        let width = (anchor.0 - current.0).abs();
        let height = (anchor.1 - current.1).abs();
        Some(Rect::new(x, y, width, height))
    }

    /// A translucent overlay rect for the current selection, suitable
    /// for appending to the tab's display list during paint.
    #[must_use]
    pub fn overlay_paint(&self) -> Option<PaintCommand> {
        self.rect().map(|rect| PaintCommand::RRect { rect, radius: 0.0, color: Color::rgba(0.2, 0.4, 1.0, 0.3) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_normalizes_drag_direction() {
        let mut selection = Selection::new();
        selection.start(50.0, 50.0);
        selection.extend_to(10.0, 20.0);
        assert_eq!(selection.rect(), Some(Rect::new(10.0, 20.0, 40.0, 30.0)));
    }

    #[test]
    fn clear_drops_the_selection() {
        let mut selection = Selection::new();
        selection.start(1.0, 1.0);
        selection.clear();
        assert!(!selection.is_active());
        assert_eq!(selection.rect(), None);
    }
}
