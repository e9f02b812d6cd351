//! Glyph quad byte buffer writer.

/// Quad instance stride in bytes.
///
/// Layout:
///   [0..8]   pos:     vec2<f32>  (pixel position of the top-left corner)
///   [8..16]  size:    vec2<f32>  (pixel size)
///   [16..24] `uv_pos`:  vec2<f32>  (normalized atlas top-left)
///   [24..32] `uv_size`: vec2<f32>  (normalized atlas size)
///   [32..48] color:   vec4<f32>  (RGBA)
pub const QUAD_STRIDE: u64 = 48;

/// Writes glyph quad instances to a byte buffer without unsafe code.
#[derive(Debug, Default)]
pub struct QuadWriter {
    data: Vec<u8>,
}

impl QuadWriter {
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(4096),
        }
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Push one textured glyph quad. `color` is `0xRRGGBBAA`.
    pub fn push_glyph(
        &mut self,
        pos: [f32; 2],
        size: [f32; 2],
        uv_pos: [f32; 2],
        uv_size: [f32; 2],
        color: u32,
    ) {
        for v in pos.into_iter().chain(size).chain(uv_pos).chain(uv_size) {
            self.data.extend_from_slice(&v.to_ne_bytes());
        }
        for v in unpack_rgba(color) {
            self.data.extend_from_slice(&v.to_ne_bytes());
        }
    }

    pub fn count(&self) -> u32 {
        (self.data.len() / QUAD_STRIDE as usize) as u32
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Split `0xRRGGBBAA` into normalized channels.
pub fn unpack_rgba(color: u32) -> [f32; 4] {
    [
        ((color >> 24) & 0xFF) as f32 / 255.0,
        ((color >> 16) & 0xFF) as f32 / 255.0,
        ((color >> 8) & 0xFF) as f32 / 255.0,
        (color & 0xFF) as f32 / 255.0,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f32_at(bytes: &[u8], idx: usize) -> f32 {
        let mut b = [0u8; 4];
        b.copy_from_slice(&bytes[idx * 4..idx * 4 + 4]);
        f32::from_ne_bytes(b)
    }

    #[test]
    fn one_quad_is_one_stride() {
        let mut w = QuadWriter::new();
        assert!(w.is_empty());
        w.push_glyph([1.0, 2.0], [8.0, 16.0], [0.25, 0.5], [0.125, 0.25], 0xFF00_80FF);
        assert_eq!(w.count(), 1);
        assert_eq!(w.as_bytes().len(), QUAD_STRIDE as usize);

        let b = w.as_bytes();
        assert_eq!(f32_at(b, 0), 1.0);
        assert_eq!(f32_at(b, 3), 16.0);
        assert_eq!(f32_at(b, 4), 0.25);
        assert_eq!(f32_at(b, 7), 0.25);
        assert_eq!(f32_at(b, 8), 1.0);
        assert_eq!(f32_at(b, 9), 0.0);
        assert_eq!(f32_at(b, 11), 1.0);
    }

    #[test]
    fn clear_empties_between_frames() {
        let mut w = QuadWriter::new();
        for _ in 0..10 {
            w.push_glyph([0.0; 2], [1.0; 2], [0.0; 2], [0.0; 2], 0);
        }
        assert_eq!(w.count(), 10);
        w.clear();
        assert!(w.is_empty());
        assert_eq!(w.count(), 0);
    }

    #[test]
    fn unpack_rgba_channels() {
        assert_eq!(unpack_rgba(0xFFFF_FFFF), [1.0; 4]);
        assert_eq!(unpack_rgba(0x0000_00FF), [0.0, 0.0, 0.0, 1.0]);
    }
}
