//! The GPU canvas collaborator (spec.md §6) and per-layer raster
//! (spec.md §4.6): a backend-agnostic `Canvas` trait plus a
//! deterministic CPU reference implementation, and the raster pass
//! that walks composited layers and replays their paint commands onto
//! lazily-allocated surfaces.

pub mod canvas;
pub mod cpu_backend;
pub mod raster;

pub use canvas::{Canvas, RenderTarget};
pub use cpu_backend::{CanvasOp, CpuCanvas, CpuTarget};
pub use raster::{raster_layer, surface_dims, LayerSurface};
