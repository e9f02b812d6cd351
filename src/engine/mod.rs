//! The frame presenter.
//!
//! [`AtlasEngine`] turns rows of glyph placements into one instanced draw,
//! rasterizing cache misses into the glyph atlas on the way. It is driven by
//! a single presentation thread:
//!
//! ```text
//! loop {
//!     engine.wait_until_can_render();
//!     engine.start_paint();
//!     for row in visible_rows { engine.paint_row(row); }
//!     engine.present();
//! }
//! ```
//!
//! Every other thread talks to it through an [`ApiHandle`].

mod api;
mod frame;
mod present;
mod render_state;

pub use api::{ApiHandle, Invalidations};
pub use frame::{DEFAULT_COLOR, Placement, Row};
pub use present::plan_present;
pub use render_state::PackerFactory;

use std::sync::Arc;
use std::time::Duration;

use crate::atlas::{GlyphCache, RectPacker};
use crate::config::RenderConfig;
use crate::error::{PresentError, ResultCode};
use crate::font::{FontMetrics, Rasterizer};
use crate::geometry::{CellCount, CellRect, PixelSize};
use crate::gpu::GpuBackend;

use api::ApiState;
use render_state::RenderState;

/// Knobs copied out of [`RenderConfig`] at construction.
#[derive(Debug, Clone)]
struct EngineSettings {
    initial_target: (u32, u32),
    max_attempts: u32,
    latency_timeout: Duration,
    continuous_redraw: bool,
    custom_shader: bool,
}

/// Glyph-atlas text presenter over a [`GpuBackend`] and a [`Rasterizer`].
pub struct AtlasEngine<B: GpuBackend, R: Rasterizer> {
    r: RenderState<B>,
    rasterizer: R,
    api: Arc<ApiState>,
    settings: EngineSettings,
}

impl<B: GpuBackend, R: Rasterizer> AtlasEngine<B, R> {
    pub fn new(backend: B, rasterizer: R, config: &RenderConfig) -> Self {
        let kind = config.atlas.packer;
        let settings = EngineSettings {
            initial_target: (
                config.raster.initial_target_width,
                config.raster.initial_target_height,
            ),
            max_attempts: config.raster.effective_max_attempts(),
            latency_timeout: Duration::from_millis(config.present.frame_latency_timeout_ms),
            continuous_redraw: config.debug.continuous_redraw,
            custom_shader: config.uses_custom_shader(),
        };
        Self {
            r: RenderState::new(
                backend,
                config.atlas.effective_size(),
                Box::new(move |size| kind.build(size)),
            ),
            rasterizer,
            api: Arc::new(ApiState::default()),
            settings,
        }
    }

    /// Replace the packing strategy. Takes effect when the atlas is next
    /// created.
    #[must_use]
    pub fn with_packer<F>(mut self, factory: F) -> Self
    where
        F: Fn(u32) -> Box<dyn RectPacker> + Send + 'static,
    {
        self.r.packer_factory = Box::new(factory);
        self.r.packer = None;
        self
    }

    /// Handle for invalidating this engine from other threads.
    pub fn api(&self) -> ApiHandle {
        ApiHandle::new(Arc::clone(&self.api))
    }

    /// Begin a frame: apply everything other threads published since the
    /// last one and forget the previous frame's rows.
    pub fn start_paint(&mut self) -> ResultCode {
        let pending = self.api.drain();
        self.r.rows.clear();

        let mut result = Ok(());
        if let Some((size, cells)) = pending.viewport {
            if size != self.r.pixel_size {
                result = self.r.backend.resize(size);
                self.r.pixel_size = size;
            }
            self.r.cell_count = cells;
            self.r.dirty = self.r.full_rect();
        }
        if let Some(font) = pending.font {
            self.apply_font(font);
        }
        if pending.invalidations.contains(Invalidations::CONST_BUFFER) {
            self.r.const_buffer_dirty = true;
        }

        let full = self.r.full_rect();
        let mut dirty = pending.dirty;
        if pending.scroll != 0 {
            self.r.scroll += pending.scroll;
            dirty = dirty.union(exposed_rows(self.r.cell_count, pending.scroll));
        }
        self.r.dirty = self.r.dirty.union(dirty).intersect(full);

        match result {
            Ok(()) => ResultCode::Ok,
            Err(e) => self.fail("surface resize", e.into()),
        }
    }

    /// Add one visible row to the frame being built.
    pub fn paint_row(&mut self, row: Row) {
        self.r.rows.push(row);
    }

    /// Draw and present the frame. Never panics on GPU failure: errors are
    /// logged and folded into the returned code. A failed frame keeps its
    /// damage so the next `present()` redraws it.
    pub fn present(&mut self) -> ResultCode {
        match self.try_present() {
            Ok(()) => ResultCode::Ok,
            Err(e) => self.fail("present", e),
        }
    }

    /// Whether the driver should present every tick even without damage.
    pub fn requires_continuous_redraw(&self) -> bool {
        self.settings.continuous_redraw || self.settings.custom_shader
    }

    /// Block (bounded) until the surface can take another frame. Only the
    /// first call after a present waits.
    pub fn wait_until_can_render(&mut self) {
        if std::mem::take(&mut self.r.wait_for_presentation)
            && !self
                .r
                .backend
                .wait_for_frame_latency(self.settings.latency_timeout)
        {
            log::trace!("engine: frame latency wait timed out");
        }
    }

    /// Swap in a freshly created backend after device loss. Every GPU
    /// resource and cache entry is dropped; the next frame redraws fully.
    pub fn replace_backend(&mut self, backend: B) -> B {
        let old = std::mem::replace(&mut self.r.backend, backend);
        self.r.release_gpu_resources();
        if self.r.pixel_size != PixelSize::default() {
            if let Err(e) = self.r.backend.resize(self.r.pixel_size) {
                log::warn!("engine: new backend rejected surface size: {e}");
            }
        }
        self.r.const_buffer_dirty = true;
        log::debug!("engine: backend replaced");
        old
    }

    pub fn backend(&self) -> &B {
        &self.r.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.r.backend
    }

    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }

    pub fn glyph_cache(&self) -> &GlyphCache {
        &self.r.cache
    }

    pub fn cell_count(&self) -> CellCount {
        self.r.cell_count
    }

    pub fn font_metrics(&self) -> FontMetrics {
        self.r.font
    }

    /// Damage waiting for the next present.
    pub fn dirty_rect(&self) -> CellRect {
        self.r.dirty
    }

    fn apply_font(&mut self, font: FontMetrics) {
        self.r.font = font;
        if self.r.atlas.is_some() {
            self.r.reset_atlas_contents();
        }
        // Re-estimated for the new cell size on the next miss.
        self.r.target = None;
        self.r.dirty = self.r.full_rect();
        log::debug!(
            "engine: font {}px, cell {}x{}",
            font.size_px,
            font.cell.width,
            font.cell.height
        );
    }

    /// Log `e` and map it to a result code, raising the device flag for
    /// device-class failures.
    fn fail(&self, what: &str, e: PresentError) -> ResultCode {
        log::error!("engine: {what} failed: {e}");
        let code = ResultCode::from(&e);
        if code.requires_device_recreation() {
            self.api().invalidate_device();
        }
        code
    }
}

/// Rows uncovered by moving the content `scroll` rows (positive: down).
fn exposed_rows(cells: CellCount, scroll: i32) -> CellRect {
    let rows = i32::from(cells.rows);
    let n = scroll.abs().min(rows) as u16;
    if scroll > 0 {
        CellRect::rows(cells, 0, n)
    } else {
        CellRect::rows(cells, cells.rows - n, cells.rows)
    }
}
