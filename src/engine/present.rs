//! Frame building and presentation.

use crate::atlas::{CacheEntry, GlyphKey};
use crate::error::PresentError;
use crate::font::{GlyphTarget, Rasterizer};
use crate::geometry::{CellRect, CellSize, PixelRect};
use crate::gpu::{DrawCall, GpuBackend, PresentParams, QUAD_STRIDE, ScrollRect};

use super::AtlasEngine;
use super::frame::Row;

/// Smallest vertex buffer ever allocated, in quads.
const MIN_VERTEX_QUADS: u64 = 256;

/// Outcome of resolving one cache miss.
enum Miss {
    Cached(CacheEntry),
    /// Nothing to draw for this key in this frame.
    Skipped,
    /// The packer is out of room.
    AtlasFull,
}

/// How to present a frame whose damage is `dirty` on a grid whose full
/// extent is `full`, after the content moved `scroll` rows.
pub fn plan_present(dirty: CellRect, full: CellRect, cell: CellSize, scroll: i32) -> PresentParams {
    if dirty == full {
        return PresentParams::Full;
    }
    let scroll = (scroll != 0)
        .then(|| {
            let cols = i32::from(full.right);
            let rows = i32::from(full.bottom);
            let cw = i32::from(cell.width);
            let ch = i32::from(cell.height);
            let rect = PixelRect::new(
                0,
                scroll.max(0) * ch,
                cols * cw,
                (rows + scroll.min(0)) * ch,
            );
            ScrollRect {
                rect,
                offset_y: scroll * ch,
            }
        })
        .filter(|s| !s.rect.is_empty());
    PresentParams::Partial {
        dirty: dirty.to_pixels(cell),
        scroll,
    }
}

impl<B: GpuBackend, R: Rasterizer> AtlasEngine<B, R> {
    pub(super) fn try_present(&mut self) -> Result<(), PresentError> {
        let full = self.r.full_rect();
        if self.r.const_buffer_dirty || self.settings.custom_shader {
            self.r.dirty = full;
        }
        if self.r.dirty.is_empty() {
            self.r.scroll = 0;
            return Ok(());
        }

        self.ensure_resources()?;

        let rows = std::mem::take(&mut self.r.rows);
        let built = self.build_quads(&rows);
        self.r.rows = rows;
        built?;

        // Nothing to draw: the surface and the pacing wait stay untouched.
        if self.r.quads.is_empty() {
            self.r.finish_frame();
            return Ok(());
        }

        self.upload_quads()?;
        if let (Some(atlas), Some(vertices)) =
            (self.r.atlas.as_ref(), self.r.vertex_buffer.as_ref())
        {
            self.r.backend.draw(DrawCall {
                atlas,
                vertices,
                quad_count: self.r.quads.count(),
                viewport: self.r.pixel_size,
            })?;
        }

        let params = plan_present(self.r.dirty, full, self.r.font.cell, self.r.scroll);
        self.r.backend.present(&params)?;
        self.r.wait_for_presentation = true;

        if !self.r.backend.is_adapter_current() {
            self.api().invalidate_device();
        }
        self.r.finish_frame();
        Ok(())
    }

    /// Lazily create the atlas, its packer and the raster target.
    fn ensure_resources(&mut self) -> Result<(), PresentError> {
        if self.r.atlas.is_none() {
            let size = self.r.atlas_size;
            self.r.atlas = Some(self.r.backend.create_atlas(size)?);
            self.r.packer = None;
            log::debug!("engine: atlas {size}x{size} created");
        }
        if self.r.packer.is_none() {
            self.r.packer = Some((self.r.packer_factory)(self.r.atlas_size));
        }
        if self.r.target.is_none() {
            let (w, h) = self.settings.initial_target;
            let cell = self.r.font.cell;
            self.r.target = Some(GlyphTarget::new(
                w.max(u32::from(cell.width) * 2),
                h.max(u32::from(cell.height) * 2),
            ));
        }
        Ok(())
    }

    /// Fill `self.r.quads` from `rows`, resolving cache misses. Rebuilds the
    /// frame once from an emptied atlas if the packer runs out of room.
    fn build_quads(&mut self, rows: &[Row]) -> Result<(), PresentError> {
        let mut atlas_was_reset = false;
        'frame: loop {
            self.r.quads.clear();
            let mut exhausted = false;

            for placement in rows.iter().flat_map(Row::placements) {
                let key = &placement.key;
                let (slot, needs_fill) = self.r.cache.find_or_reserve(key);
                let cached = if needs_fill { None } else { *slot };

                let entry = match cached {
                    Some(entry) => entry,
                    None if exhausted => {
                        self.r.cache.abandon(key);
                        continue;
                    }
                    None => match self.resolve_miss(key)? {
                        Miss::Cached(entry) => entry,
                        Miss::Skipped => {
                            self.r.cache.abandon(key);
                            continue;
                        }
                        Miss::AtlasFull if !atlas_was_reset => {
                            atlas_was_reset = true;
                            log::debug!(
                                "engine: atlas full, starting generation {}",
                                self.r.cache.generation() + 1
                            );
                            self.r.reset_atlas_contents();
                            continue 'frame;
                        }
                        Miss::AtlasFull => {
                            log::warn!(
                                "engine: frame needs more glyphs than a {0}x{0} atlas holds, \
                                 skipping the rest",
                                self.r.atlas_size
                            );
                            exhausted = true;
                            self.r.cache.abandon(key);
                            continue;
                        }
                    },
                };

                let scale = 1.0 / self.r.atlas_size as f32;
                self.r.quads.push_glyph(
                    [
                        placement.baseline[0] + entry.baseline_offset[0],
                        placement.baseline[1] + entry.baseline_offset[1],
                    ],
                    entry.size,
                    [entry.uv[0] * scale, entry.uv[1] * scale],
                    [entry.size[0] * scale, entry.size[1] * scale],
                    placement.color,
                );
            }
            return Ok(());
        }
    }

    /// Rasterize `key`, place it in the atlas and cache it.
    ///
    /// The raster target is repositioned when ink lands left of or above it
    /// and grown when ink runs past its edges, up to `max_attempts`
    /// rasterizations.
    fn resolve_miss(&mut self, key: &GlyphKey) -> Result<Miss, PresentError> {
        let atlas_size = self.r.atlas_size;
        let size_px = self.r.font.size_px;
        let Some(target) = self.r.target.as_mut() else {
            return Ok(Miss::Skipped);
        };

        let mut placed = None;
        for _ in 0..self.settings.max_attempts {
            let ink = self
                .rasterizer
                .rasterize(key.face, &key.glyphs, size_px, target)?;
            if ink.is_empty() {
                return Ok(Miss::Skipped);
            }
            if ink.width() > atlas_size || ink.height() > atlas_size {
                log::warn!(
                    "engine: {key:?} is {}x{}, larger than the atlas, skipped",
                    ink.width(),
                    ink.height()
                );
                return Ok(Miss::Skipped);
            }
            if target.contains(ink) {
                placed = Some(ink);
                break;
            }
            reposition_target(target, ink);
        }
        let Some(ink) = placed else {
            log::warn!(
                "engine: {key:?} still out of bounds after {} attempts, skipped",
                self.settings.max_attempts
            );
            return Ok(Miss::Skipped);
        };

        let Some(packer) = self.r.packer.as_mut() else {
            return Ok(Miss::Skipped);
        };
        let Some((x, y)) = packer.pack(ink.width(), ink.height()) else {
            return Ok(Miss::AtlasFull);
        };

        target.extract(ink, &mut self.r.upload);
        if let Some(atlas) = self.r.atlas.as_ref() {
            let dest = PixelRect::new(
                x as i32,
                y as i32,
                (x + ink.width()) as i32,
                (y + ink.height()) as i32,
            );
            if let Err(e) = self.r.backend.upload_atlas_region(atlas, dest, &self.r.upload) {
                // The packed rect holds no pixels; start a generation so it
                // is not lost until the next reset.
                self.r.reset_atlas_contents();
                return Err(e.into());
            }
        }

        // Offset from the pen, not the font's baseline: the rasterizer places
        // ink relative to the pen, so this stays correct for runs whose ink
        // starts left of or above it.
        let (origin_x, origin_y) = target.origin();
        let entry = CacheEntry {
            uv: [x as f32, y as f32],
            size: [ink.width() as f32, ink.height() as f32],
            baseline_offset: [
                (ink.left - origin_x) as f32,
                (ink.top - origin_y) as f32,
            ],
        };
        *self.r.cache.find_or_reserve(key).0 = Some(entry);
        Ok(Miss::Cached(entry))
    }

    /// Copy the frame's quads into a vertex buffer large enough to hold them.
    fn upload_quads(&mut self) -> Result<(), PresentError> {
        let needed = self.r.quads.as_bytes().len() as u64;
        let fits = self
            .r
            .vertex_buffer
            .as_ref()
            .is_some_and(|vb| self.r.backend.vertex_buffer_capacity(vb) >= needed);
        if !fits {
            let capacity = needed.next_power_of_two().max(MIN_VERTEX_QUADS * QUAD_STRIDE);
            self.r.vertex_buffer = None;
            self.r.vertex_buffer = Some(self.r.backend.create_vertex_buffer(capacity)?);
            log::debug!("engine: vertex buffer grown to {capacity} bytes");
        }
        if let Some(vb) = self.r.vertex_buffer.as_ref() {
            self.r.backend.write_vertices(vb, self.r.quads.as_bytes())?;
        }
        Ok(())
    }
}

/// Move the pen so `ink` starts inside the target, then grow the target to
/// `origin * 2 + ink size` if the shifted ink still runs past its edges.
/// The target never shrinks.
fn reposition_target(target: &mut GlyphTarget, ink: PixelRect) {
    let dx = (-ink.left).max(0);
    let dy = (-ink.top).max(0);
    let (ox, oy) = target.origin();
    let (ox, oy) = (ox + dx, oy + dy);
    target.set_origin(ox, oy);

    let right = (ink.right + dx) as u32;
    let bottom = (ink.bottom + dy) as u32;
    if right > target.width() || bottom > target.height() {
        let w = target
            .width()
            .max(ox.max(0) as u32 * 2 + ink.width())
            .max(right);
        let h = target
            .height()
            .max(oy.max(0) as u32 * 2 + ink.height())
            .max(bottom);
        log::debug!(
            "engine: raster target {}x{} -> {w}x{h}",
            target.width(),
            target.height()
        );
        target.resize(w, h);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::CellCount;

    const CELL: CellSize = CellSize::new(10, 20);

    fn full() -> CellRect {
        CellRect::full(CellCount::new(80, 24))
    }

    #[test]
    fn full_damage_presents_full() {
        assert_eq!(plan_present(full(), full(), CELL, 3), PresentParams::Full);
    }

    #[test]
    fn dirty_rect_is_scaled_to_pixels() {
        let p = plan_present(CellRect::new(2, 3, 10, 5), full(), CELL, 0);
        assert_eq!(
            p,
            PresentParams::Partial {
                dirty: PixelRect::new(20, 60, 100, 100),
                scroll: None,
            }
        );
    }

    #[test]
    fn scroll_down_fills_lower_region() {
        let dirty = CellRect::rows(CellCount::new(80, 24), 0, 2);
        let PresentParams::Partial { scroll, .. } = plan_present(dirty, full(), CELL, 2) else {
            panic!("expected partial present");
        };
        assert_eq!(
            scroll,
            Some(ScrollRect {
                rect: PixelRect::new(0, 40, 800, 480),
                offset_y: 40,
            })
        );
    }

    #[test]
    fn scroll_up_fills_upper_region() {
        let dirty = CellRect::rows(CellCount::new(80, 24), 21, 24);
        let PresentParams::Partial { scroll, .. } = plan_present(dirty, full(), CELL, -3) else {
            panic!("expected partial present");
        };
        assert_eq!(
            scroll,
            Some(ScrollRect {
                rect: PixelRect::new(0, 0, 800, 420),
                offset_y: -60,
            })
        );
    }

    #[test]
    fn scroll_past_grid_drops_scroll_rect() {
        let dirty = CellRect::rows(CellCount::new(80, 24), 0, 23);
        let PresentParams::Partial { scroll, .. } = plan_present(dirty, full(), CELL, -30) else {
            panic!("expected partial present");
        };
        assert_eq!(scroll, None);
    }

    #[test]
    fn reposition_shifts_then_grows() {
        let mut t = GlyphTarget::new(16, 16);
        t.set_origin(2, 12);
        // Ink starting 3px left of the target and running 4px past its right edge.
        reposition_target(&mut t, PixelRect::new(-3, 0, 20, 10));
        assert_eq!(t.origin(), (5, 12));
        assert!(t.width() >= 23);
        assert!(t.contains(PixelRect::new(0, 0, 23, 10)));
    }
}
