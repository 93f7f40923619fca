//! Rendering: viewport math, raster primitives, badge glyphs and the mask compositor.

pub mod compositor;
pub mod glyph;
pub mod raster;
pub mod viewport;

pub use compositor::MaskCompositor;
pub use viewport::{CanvasRect, Viewport};
