//! Deterministic CPU reference `Canvas`: records the sequence of
//! operations it was asked to perform instead of rasterizing actual
//! pixels, so `raster.rs`'s layer-skip/lazy-allocation/translate
//! contract can be exercised in tests without a real GPU. The teacher's
//! analogous `wgpu_backend` is out of scope (spec.md §1).

use crate::canvas::{Canvas, RenderTarget};
use anyhow::Result;
use cinder_display::{BlendMode, Color, PaintCommand, Rect};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuTarget {
    width: u32,
    height: u32,
    presented: bool,
}

impl RenderTarget for CpuTarget {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

/// One entry in a `CpuCanvas`'s op log, enough to assert ordering and
/// which paint commands actually got drawn.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasOp {
    Save,
    Restore,
    SaveLayer { alpha: f32, blend: BlendMode },
    Translate { dx: f32, dy: f32 },
    Clip { rect: Rect },
    Clear { color: Color },
    Draw { command: PaintCommand },
    Present,
}

#[derive(Debug, Default)]
pub struct CpuCanvas {
    pub ops: Vec<CanvasOp>,
    save_depth: u32,
}

impl CpuCanvas {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Canvas for CpuCanvas {
    type Target = CpuTarget;

    fn render_target(&mut self, width: u32, height: u32) -> Self::Target {
        CpuTarget { width, height, presented: false }
    }

    fn save(&mut self) {
        self.save_depth += 1;
        self.ops.push(CanvasOp::Save);
    }

    fn restore(&mut self) {
        self.save_depth = self.save_depth.saturating_sub(1);
        self.ops.push(CanvasOp::Restore);
    }

    fn save_layer(&mut self, alpha: f32, blend: BlendMode) {
        self.save_depth += 1;
        self.ops.push(CanvasOp::SaveLayer { alpha, blend });
    }

    fn translate(&mut self, dx: f32, dy: f32) {
        self.ops.push(CanvasOp::Translate { dx, dy });
    }

    fn clip(&mut self, rect: Rect) {
        self.ops.push(CanvasOp::Clip { rect });
    }

    fn clear(&mut self, color: Color) {
        self.ops.push(CanvasOp::Clear { color });
    }

    fn draw(&mut self, command: &PaintCommand) {
        self.ops.push(CanvasOp::Draw { command: command.clone() });
    }

    fn present(&mut self, target: &mut Self::Target) -> Result<()> {
        target.presented = true;
        self.ops.push(CanvasOp::Present);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_restore_are_balanced_by_depth() {
        let mut canvas = CpuCanvas::new();
        canvas.save();
        canvas.save_layer(0.5, BlendMode::Normal);
        canvas.restore();
        canvas.restore();
        assert_eq!(canvas.save_depth, 0);
    }

    #[test]
    fn present_marks_target_presented() {
        let mut canvas = CpuCanvas::new();
        let mut target = canvas.render_target(100, 100);
        assert!(canvas.present(&mut target).is_ok());
        assert!(target.presented);
    }
}
