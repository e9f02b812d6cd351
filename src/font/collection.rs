//! Font data collection: owns raw bytes and swash cache keys.

use std::path::Path;
use std::sync::Arc;

use swash::{CacheKey, FontRef};

use crate::geometry::CellSize;

use super::{FaceIdx, FontMetrics};

/// Per-face data: raw bytes + swash identifiers for transient `FontRef` creation.
struct FaceData {
    /// Raw font file bytes (kept alive for swash `FontRef` borrowing).
    bytes: Arc<Vec<u8>>,
    /// Byte offset to the font table directory (from `FontRef::from_index`).
    offset: u32,
    /// Unique cache key for `ScaleContext` reuse across frames.
    cache_key: CacheKey,
}

/// Validate font bytes and extract swash metadata.
///
/// Returns `(offset, cache_key)` on success.
fn validate_font(data: &[u8], face_index: u32) -> Option<(u32, CacheKey)> {
    let fr = FontRef::from_index(data, face_index as usize)?;
    Some((fr.offset, fr.key))
}

/// Loaded font faces, addressed by [`FaceIdx`] in load order.
#[derive(Default)]
pub struct FontCollection {
    faces: Vec<FaceData>,
}

impl FontCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a face from font file bytes. Returns `None` if the bytes
    /// are not a font (or the collection index does not exist).
    pub fn add_face(&mut self, bytes: Vec<u8>, face_index: u32) -> Option<FaceIdx> {
        let (offset, cache_key) = validate_font(&bytes, face_index)?;
        let idx = FaceIdx(u16::try_from(self.faces.len()).ok()?);
        self.faces.push(FaceData {
            bytes: Arc::new(bytes),
            offset,
            cache_key,
        });
        Some(idx)
    }

    /// Read a font file from disk and register its first face.
    pub fn load_file(&mut self, path: &Path) -> Option<FaceIdx> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                log::warn!("font: failed to read {}: {e}", path.display());
                return None;
            }
        };
        let idx = self.add_face(bytes, 0);
        if idx.is_none() {
            log::warn!("font: {} is not a usable font", path.display());
        }
        idx
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Create a transient swash `FontRef` for a loaded face.
    pub fn font_ref(&self, idx: FaceIdx) -> Option<FontRef<'_>> {
        let fd = self.faces.get(usize::from(idx.0))?;
        Some(FontRef {
            data: &fd.bytes,
            offset: fd.offset,
            key: fd.cache_key,
        })
    }

    /// Glyph index for `ch`, or 0 (`.notdef`) when the face lacks it.
    pub fn glyph_id(&self, idx: FaceIdx, ch: char) -> u16 {
        self.font_ref(idx).map_or(0, |fr| fr.charmap().map(ch))
    }

    /// Cell geometry for the face at `size_px`: width of 'M', ascent plus
    /// descent, baseline at the rounded-up ascent.
    pub fn metrics(&self, idx: FaceIdx, size_px: f32) -> Option<FontMetrics> {
        let fr = self.font_ref(idx)?;
        let metrics = fr.metrics(&[]).scale(size_px);
        let cell_height = (metrics.ascent + metrics.descent.abs()).ceil();
        let baseline = metrics.ascent.ceil();
        let gid = fr.charmap().map('M');
        let cell_width = fr.glyph_metrics(&[]).scale(size_px).advance_width(gid).ceil();
        Some(FontMetrics {
            size_px,
            cell: CellSize::new(cell_width.max(1.0) as u16, cell_height.max(1.0) as u16),
            baseline: baseline as u16,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_font_bytes() {
        let mut fonts = FontCollection::new();
        assert!(fonts.add_face(b"definitely not a font".to_vec(), 0).is_none());
        assert!(fonts.is_empty());
    }

    #[test]
    fn unknown_face_has_no_metrics() {
        let fonts = FontCollection::new();
        assert!(fonts.metrics(FaceIdx(0), 16.0).is_none());
        assert_eq!(fonts.glyph_id(FaceIdx(3), 'a'), 0);
    }

    #[test]
    fn missing_file_is_not_fatal() {
        let mut fonts = FontCollection::new();
        let path = std::env::temp_dir().join("oriterm_atlas_no_such_font.ttf");
        assert!(fonts.load_file(&path).is_none());
    }
}
