//! Glyph-atlas frame renderer for GPU terminal emulators.
//!
//! Rows of shaped glyph runs go in; one instanced draw of textured quads
//! comes out. Glyphs are rasterized on first use into a square atlas texture
//! and reused until the atlas fills up or the font changes.

pub mod app;
pub mod atlas;
pub mod config;
pub mod engine;
pub mod error;
pub mod font;
pub mod geometry;
pub mod gpu;
pub mod logging;

pub use engine::{ApiHandle, AtlasEngine, Placement, Row};
pub use error::{GpuError, PresentError, RasterError, ResultCode};
