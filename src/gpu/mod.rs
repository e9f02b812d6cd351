//! GPU side of the renderer: the backend seam, the wgpu implementation, and
//! the quad buffer format shared by both.

mod backend;
mod frame_signal;
pub mod pipeline;
mod quad_writer;
mod state;
mod wgpu_backend;

pub use backend::{DrawCall, GpuBackend, PresentParams, ScrollRect};
pub use frame_signal::FrameSignal;
pub use quad_writer::{QUAD_STRIDE, QuadWriter, unpack_rgba};
pub use state::GpuState;
pub use wgpu_backend::{WgpuAtlas, WgpuBackend, WgpuVertexBuffer};
