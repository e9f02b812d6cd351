//! Glyph-run rasterization into a reusable coverage target.

use swash::scale::{Render, ScaleContext, Source};
use swash::zeno::Format;

use crate::error::RasterError;
use crate::geometry::PixelRect;

use super::{FaceIdx, FontCollection};

/// Turns a shaped glyph run into 8-bit coverage.
///
/// Implementations draw into `target` with the pen starting at
/// [`GlyphTarget::origin`] on the baseline, and return the union of every
/// glyph's ink box in target pixel coordinates. The box is NOT clipped to the
/// target: a box with negative coordinates or one extending past the target
/// tells the caller to reposition or grow the target and call again.
pub trait Rasterizer {
    fn rasterize(
        &mut self,
        face: FaceIdx,
        glyphs: &[u16],
        size_px: f32,
        target: &mut GlyphTarget,
    ) -> Result<PixelRect, RasterError>;
}

/// Off-screen R8 coverage surface reused across rasterizations.
///
/// The presenter owns it and decides when to reposition or grow it.
#[derive(Debug, Clone)]
pub struct GlyphTarget {
    width: u32,
    height: u32,
    /// Pen origin on the baseline, in target pixels.
    origin: (i32, i32),
    pixels: Vec<u8>,
}

impl GlyphTarget {
    /// Create a cleared target with the pen a quarter in from the left and
    /// the baseline three quarters down.
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            origin: ((width / 4) as i32, (height * 3 / 4) as i32),
            pixels: vec![0; (width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn origin(&self) -> (i32, i32) {
        self.origin
    }

    pub fn set_origin(&mut self, x: i32, y: i32) {
        self.origin = (x, y);
    }

    /// Resize to `width` × `height`, discarding contents. The origin stays.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.pixels.clear();
        self.pixels.resize((self.width * self.height) as usize, 0);
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// Whether `rect` lies entirely inside the target.
    pub fn contains(&self, rect: PixelRect) -> bool {
        rect.left >= 0
            && rect.top >= 0
            && rect.right <= self.width as i32
            && rect.bottom <= self.height as i32
    }

    /// Coverage at `(x, y)`, or 0 outside the target.
    pub fn pixel(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return 0;
        }
        self.pixels[(y as u32 * self.width + x as u32) as usize]
    }

    /// Max-blend a `w` × `h` coverage bitmap with its top-left at `(x, y)`.
    ///
    /// Parts falling outside the target are dropped.
    pub fn blend(&mut self, x: i32, y: i32, w: u32, h: u32, coverage: &[u8]) {
        for row in 0..h as i32 {
            let ty = y + row;
            if ty < 0 || ty >= self.height as i32 {
                continue;
            }
            for col in 0..w as i32 {
                let tx = x + col;
                if tx < 0 || tx >= self.width as i32 {
                    continue;
                }
                let Some(&src) = coverage.get((row as u32 * w + col as u32) as usize) else {
                    continue;
                };
                let dst = &mut self.pixels[(ty as u32 * self.width + tx as u32) as usize];
                *dst = (*dst).max(src);
            }
        }
    }

    /// Copy `rect` into `out` as tightly packed rows.
    ///
    /// `rect` must lie inside the target (see [`GlyphTarget::contains`]).
    pub fn extract(&self, rect: PixelRect, out: &mut Vec<u8>) {
        out.clear();
        if rect.is_empty() || !self.contains(rect) {
            return;
        }
        out.reserve((rect.width() * rect.height()) as usize);
        for y in rect.top..rect.bottom {
            let start = (y as u32 * self.width + rect.left as u32) as usize;
            out.extend_from_slice(&self.pixels[start..start + rect.width() as usize]);
        }
    }
}

/// [`Rasterizer`] backed by swash outlines.
pub struct SwashRasterizer {
    fonts: FontCollection,
    scale_context: ScaleContext,
}

impl SwashRasterizer {
    pub fn new(fonts: FontCollection) -> Self {
        Self {
            fonts,
            scale_context: ScaleContext::new(),
        }
    }

    pub fn fonts(&self) -> &FontCollection {
        &self.fonts
    }
}

impl Rasterizer for SwashRasterizer {
    fn rasterize(
        &mut self,
        face: FaceIdx,
        glyphs: &[u16],
        size_px: f32,
        target: &mut GlyphTarget,
    ) -> Result<PixelRect, RasterError> {
        let fr = self.fonts.font_ref(face).ok_or(RasterError::UnknownFace(face))?;
        let advances = fr.glyph_metrics(&[]).scale(size_px);
        let mut scaler = self
            .scale_context
            .builder(fr)
            .size(size_px)
            .hint(true)
            .build();

        target.clear();
        let (origin_x, baseline_y) = target.origin();
        let mut pen_x = origin_x as f32;
        let mut ink = PixelRect::default();

        for &gid in glyphs {
            let image = Render::new(&[Source::Outline])
                .format(Format::Alpha)
                .render(&mut scaler, gid)
                .ok_or(RasterError::Scaler(gid))?;
            let p = image.placement;
            if p.width > 0 && p.height > 0 {
                let left = pen_x.round() as i32 + p.left;
                let top = baseline_y - p.top;
                target.blend(left, top, p.width, p.height, &image.data);
                ink = ink.union(PixelRect::new(
                    left,
                    top,
                    left + p.width as i32,
                    top + p.height as i32,
                ));
            }
            pen_x += advances.advance_width(gid);
        }

        Ok(ink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_target_places_pen_inside() {
        let t = GlyphTarget::new(64, 64);
        assert_eq!(t.origin(), (16, 48));
        assert_eq!((t.width(), t.height()), (64, 64));
    }

    #[test]
    fn blend_clips_and_keeps_max() {
        let mut t = GlyphTarget::new(4, 4);
        t.blend(-1, -1, 2, 2, &[10, 20, 30, 40]);
        assert_eq!(t.pixel(0, 0), 40);
        assert_eq!(t.pixel(1, 0), 0);

        t.blend(0, 0, 1, 1, &[5]);
        assert_eq!(t.pixel(0, 0), 40);
        t.blend(0, 0, 1, 1, &[200]);
        assert_eq!(t.pixel(0, 0), 200);
    }

    #[test]
    fn extract_copies_tight_rows() {
        let mut t = GlyphTarget::new(8, 8);
        t.blend(2, 3, 3, 2, &[1, 2, 3, 4, 5, 6]);
        let mut out = Vec::new();
        t.extract(PixelRect::new(2, 3, 5, 5), &mut out);
        assert_eq!(out, vec![1, 2, 3, 4, 5, 6]);

        // Out-of-bounds requests copy nothing.
        t.extract(PixelRect::new(6, 6, 10, 10), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn resize_discards_contents_keeps_origin() {
        let mut t = GlyphTarget::new(8, 8);
        t.set_origin(1, 6);
        t.blend(0, 0, 1, 1, &[255]);
        t.resize(16, 12);
        assert_eq!(t.pixel(0, 0), 0);
        assert_eq!(t.origin(), (1, 6));
        assert!(t.contains(PixelRect::new(0, 0, 16, 12)));
        assert!(!t.contains(PixelRect::new(-1, 0, 4, 4)));
    }

    #[test]
    fn swash_rasterizer_reports_unknown_face() {
        let mut r = SwashRasterizer::new(FontCollection::new());
        let mut t = GlyphTarget::new(16, 16);
        assert_eq!(
            r.rasterize(FaceIdx(0), &[1], 16.0, &mut t),
            Err(RasterError::UnknownFace(FaceIdx(0)))
        );
    }
}
