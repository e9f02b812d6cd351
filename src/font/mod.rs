//! Font data and glyph rasterization.
//!
//! Provides `FontCollection` (font bytes + metrics via swash) and the
//! `Rasterizer` seam the presenter uses to turn glyph runs into coverage
//! bitmaps. Text shaping happens upstream: the presenter only ever sees
//! glyph indices.

mod collection;
mod discovery;
mod rasterizer;

pub use collection::FontCollection;
pub use discovery::find_monospace_font;
pub use rasterizer::{GlyphTarget, Rasterizer, SwashRasterizer};

use crate::geometry::CellSize;

/// Compact face index within a `FontCollection`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FaceIdx(pub u16);

/// Cell geometry and rasterization size derived from the primary font.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    /// Font size in device pixels.
    pub size_px: f32,
    pub cell: CellSize,
    /// Baseline offset from the top of a cell, in device pixels.
    pub baseline: u16,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self {
            size_px: 16.0,
            cell: CellSize::new(8, 16),
            baseline: 12,
        }
    }
}
