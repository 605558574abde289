//! `CompositedLayer` (spec.md §3 "Composited layer"): an ordered run of
//! paint commands that share a parent effect, plus the bounds the
//! raster stage needs.

use cinder_display::{DisplayNodeId, Rect};

/// A GPU-backed intermediate surface holding paint commands that share
/// an effect parent. The surface itself is allocated lazily by the
/// raster stage; this struct only carries the bookkeeping the
/// compositor produces.
#[derive(Debug, Clone)]
pub struct CompositedLayer {
    /// Paint leaves in this layer, in paint order. Invariant: every
    /// item shares `items[0].parent`.
    pub items: Vec<DisplayNodeId>,
    /// Parent effect every item in this layer shares.
    pub parent: Option<DisplayNodeId>,
    /// Union of this layer's items' bounds, un-mapped back through the
    /// effect chain into local space and outset by 1px (spec.md §4.5).
    pub composited_bounds: Rect,
    /// Union of this layer's items' absolute (viewport) rects.
    pub absolute_bounds: Rect,
}

impl CompositedLayer {
    #[must_use]
    pub fn new(item: DisplayNodeId, parent: Option<DisplayNodeId>, local_rect: Rect, absolute_rect: Rect) -> Self {
        Self {
            items: vec![item],
            parent,
            composited_bounds: local_rect,
            absolute_bounds: absolute_rect,
        }
    }

    pub fn add(&mut self, item: DisplayNodeId, local_rect: Rect, absolute_rect: Rect) {
        self.items.push(item);
        self.composited_bounds = self.composited_bounds.union(local_rect);
        self.absolute_bounds = self.absolute_bounds.union(absolute_rect);
    }

    pub(crate) fn intersects_absolute(&self, other: Rect) -> bool {
        self.absolute_bounds.intersects(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_layer_seeds_bounds_from_first_item() {
        let rect = Rect::new(1.0, 2.0, 3.0, 4.0);
        let layer = CompositedLayer::new(DisplayNodeId(0), None, rect, rect);
        assert_eq!(layer.items, vec![DisplayNodeId(0)]);
        assert_eq!(layer.composited_bounds, rect);
    }

    #[test]
    fn add_unions_bounds() {
        let mut layer = CompositedLayer::new(DisplayNodeId(0), None, Rect::new(0.0, 0.0, 10.0, 10.0), Rect::new(0.0, 0.0, 10.0, 10.0));
        layer.add(DisplayNodeId(1), Rect::new(20.0, 20.0, 5.0, 5.0), Rect::new(20.0, 20.0, 5.0, 5.0));
        assert_eq!(layer.composited_bounds, Rect::new(0.0, 0.0, 25.0, 25.0));
    }
}
