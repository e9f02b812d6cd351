//! State owned by the presentation thread.

use crate::atlas::{GlyphCache, RectPacker};
use crate::font::{FontMetrics, GlyphTarget};
use crate::geometry::{CellCount, CellRect, PixelSize};
use crate::gpu::{GpuBackend, QuadWriter};

use super::frame::Row;

/// Builds the packer for a freshly created atlas of the given edge length.
pub type PackerFactory = Box<dyn Fn(u32) -> Box<dyn RectPacker> + Send>;

/// GPU resources and per-frame scalars. Only the presentation thread
/// touches this; other threads go through `ApiHandle`.
pub(crate) struct RenderState<B: GpuBackend> {
    pub backend: B,
    /// Created on the first frame that has something to draw.
    pub atlas: Option<B::Atlas>,
    pub atlas_size: u32,
    pub packer: Option<Box<dyn RectPacker>>,
    pub packer_factory: PackerFactory,
    pub target: Option<GlyphTarget>,
    pub cache: GlyphCache,
    pub vertex_buffer: Option<B::VertexBuffer>,
    pub quads: QuadWriter,
    /// Staging buffer for one glyph's pixels on their way to the atlas.
    pub upload: Vec<u8>,
    pub rows: Vec<Row>,

    pub dirty: CellRect,
    /// Accumulated vertical scroll in rows since the last presented frame.
    pub scroll: i32,
    pub const_buffer_dirty: bool,
    pub pixel_size: PixelSize,
    pub cell_count: CellCount,
    pub font: FontMetrics,
    /// Armed after each present; consumed by `wait_until_can_render()`.
    pub wait_for_presentation: bool,
}

impl<B: GpuBackend> RenderState<B> {
    pub fn new(backend: B, atlas_size: u32, packer_factory: PackerFactory) -> Self {
        Self {
            backend,
            atlas: None,
            atlas_size,
            packer: None,
            packer_factory,
            target: None,
            cache: GlyphCache::new(),
            vertex_buffer: None,
            quads: QuadWriter::new(),
            upload: Vec::new(),
            rows: Vec::new(),
            dirty: CellRect::EMPTY,
            scroll: 0,
            const_buffer_dirty: false,
            pixel_size: PixelSize::default(),
            cell_count: CellCount::default(),
            font: FontMetrics::default(),
            wait_for_presentation: false,
        }
    }

    pub fn full_rect(&self) -> CellRect {
        CellRect::full(self.cell_count)
    }

    /// Start a new atlas generation: every cached location is forgotten and
    /// the packer hands out the whole surface again. The texture is kept.
    pub fn reset_atlas_contents(&mut self) {
        self.cache.clear();
        if let Some(packer) = self.packer.as_mut() {
            packer.reset();
        }
    }

    /// Drop everything created from the backend's device.
    pub fn release_gpu_resources(&mut self) {
        self.atlas = None;
        self.vertex_buffer = None;
        self.packer = None;
        self.cache.clear();
        self.wait_for_presentation = false;
    }

    /// Forget the presented frame's damage.
    pub fn finish_frame(&mut self) {
        self.dirty = CellRect::EMPTY;
        self.scroll = 0;
        self.const_buffer_dirty = false;
    }
}
