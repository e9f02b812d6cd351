//! The seam between the presenter and a concrete graphics API.
//!
//! The presenter only ever talks to a [`GpuBackend`]: it owns the handles the
//! backend gives out (atlas texture, vertex buffer) and passes them back on
//! every call. `WgpuBackend` is the production implementation; tests drive
//! the presenter through a recording fake.

use std::time::Duration;

use crate::error::GpuError;
use crate::geometry::{PixelRect, PixelSize};

/// Pixel region moved by a scroll present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollRect {
    /// Region of the new frame filled from the previous frame's pixels
    /// `offset_y` rows of pixels away.
    pub rect: PixelRect,
    /// Vertical distance the region moves, in pixels.
    pub offset_y: i32,
}

/// How the finished frame reaches the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentParams {
    /// Whole surface changed.
    Full,
    /// Only `dirty` changed, optionally after the previous frame moved
    /// `scroll.offset_y` pixels into `scroll.rect`.
    Partial {
        dirty: PixelRect,
        scroll: Option<ScrollRect>,
    },
}

/// One instanced draw of every glyph quad in the frame.
#[derive(Debug)]
pub struct DrawCall<'a, A, V> {
    pub atlas: &'a A,
    pub vertices: &'a V,
    pub quad_count: u32,
    /// Viewport (and projection) size in pixels.
    pub viewport: PixelSize,
}

/// Graphics device, presentation surface and frame pacing, as used by the
/// presenter.
///
/// Every method is called from the presentation thread only.
pub trait GpuBackend {
    /// Square R8 texture holding rasterized glyph coverage.
    type Atlas;
    /// GPU buffer of quad instances.
    type VertexBuffer;

    fn create_atlas(&mut self, size: u32) -> Result<Self::Atlas, GpuError>;

    /// Write a tightly packed R8 region. Regions never overlap anything
    /// previously written in the same atlas generation.
    fn upload_atlas_region(
        &mut self,
        atlas: &Self::Atlas,
        rect: PixelRect,
        pixels: &[u8],
    ) -> Result<(), GpuError>;

    /// Allocate a vertex buffer holding at least `capacity` bytes.
    fn create_vertex_buffer(&mut self, capacity: u64) -> Result<Self::VertexBuffer, GpuError>;

    fn vertex_buffer_capacity(&self, buffer: &Self::VertexBuffer) -> u64;

    fn write_vertices(&mut self, buffer: &Self::VertexBuffer, bytes: &[u8])
    -> Result<(), GpuError>;

    /// Render the frame into the next surface image.
    fn draw(&mut self, call: DrawCall<'_, Self::Atlas, Self::VertexBuffer>) -> Result<(), GpuError>;

    /// Show the frame rendered by the last [`GpuBackend::draw`].
    fn present(&mut self, params: &PresentParams) -> Result<(), GpuError>;

    /// Reconfigure the presentation surface.
    fn resize(&mut self, size: PixelSize) -> Result<(), GpuError>;

    /// Block until the surface can accept another frame or `timeout`
    /// elapses. Returns whether the surface became ready.
    fn wait_for_frame_latency(&mut self, timeout: Duration) -> bool;

    /// `false` once the adapter backing this device is gone (driver update,
    /// GPU removed) and every resource has to be recreated.
    fn is_adapter_current(&self) -> bool;
}
