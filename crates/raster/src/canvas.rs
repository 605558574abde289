//! `Canvas` trait: the GPU canvas library collaborator spec.md §6
//! names ("consumes rects/text/lines/rrects/images; provides
//! save/restore, saveLayer with paint, translate, clip, present").
//! Grounded on `BigBadE-valor/crates/renderer/src/backend.rs`'s
//! `RenderBackend`/`RenderTarget` split, narrowed to the 2D
//! immediate-mode surface this workspace actually draws through — the
//! real GPU backend (wgpu) is an external collaborator out of scope
//! (spec.md §1).

use anyhow::Result;
use cinder_display::{BlendMode, Color, PaintCommand, Rect};
use core::fmt::Debug;

/// A lazily-constructible render target, one per composited layer plus
/// one for the window/chrome surface.
pub trait RenderTarget: Debug {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
}

/// Backend-agnostic 2D canvas. `save`/`restore` bracket a
/// transform+clip stack; `save_layer` additionally begins an
/// alpha/blend-mode compositing group, ended by the matching
/// `restore`.
pub trait Canvas: Debug {
    type Target: RenderTarget;

    /// Allocates (or recycles) a render target sized to `width`x`height`
    /// physical pixels (spec.md §4.6: "allocate a GPU render target
    /// sized to the rounded-out bounds").
    fn render_target(&mut self, width: u32, height: u32) -> Self::Target;

    fn save(&mut self);
    fn restore(&mut self);
    fn save_layer(&mut self, alpha: f32, blend: BlendMode);
    fn translate(&mut self, dx: f32, dy: f32);
    fn clip(&mut self, rect: Rect);
    fn clear(&mut self, color: Color);
    fn draw(&mut self, command: &PaintCommand);

    /// Presents the accumulated draw commands to `target`.
    ///
    /// # Errors
    /// Returns an error if presentation to the backend fails.
    fn present(&mut self, target: &mut Self::Target) -> Result<()>;
}
