//! Glyph atlas bookkeeping: rectangle packing and the glyph-run cache.
//!
//! Both halves are CPU-side only. The atlas texture itself belongs to the
//! GPU backend; the presenter ties the three together.

mod glyph_cache;
mod packer;

pub use glyph_cache::{CacheEntry, GlyphCache, GlyphKey};
pub use packer::{GuillotinePacker, PackerKind, RectPacker, ShelfPacker};
