//! Error taxonomy for the frame renderer.
//!
//! Glyph layout problems (empty ink, undersized raster target) never surface
//! here: the presenter recovers from them locally. What remains are GPU
//! failures and rasterizer failures, which `present()` folds into a
//! [`ResultCode`] for the driver.

use crate::font::FaceIdx;

/// Failure reported by a [`GpuBackend`](crate::gpu::GpuBackend).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GpuError {
    #[error("GPU device lost")]
    DeviceLost,
    #[error("GPU out of memory")]
    OutOfMemory,
    #[error("presentation surface lost or outdated")]
    SurfaceLost,
    #[error("timed out acquiring the next surface texture")]
    Timeout,
    #[error("GPU backend error: {0}")]
    Backend(String),
}

/// Failure reported by a [`Rasterizer`](crate::font::Rasterizer).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RasterError {
    #[error("no font face loaded for {0:?}")]
    UnknownFace(FaceIdx),
    #[error("scaler failed to render glyph {0}")]
    Scaler(u16),
}

/// Everything that can abort a frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PresentError {
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error(transparent)]
    Raster(#[from] RasterError),
}

/// Outcome of one `present()` call as seen by the renderer driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    Ok,
    /// The device is gone; recreate every GPU resource and retry.
    DeviceLost,
    OutOfMemory,
    /// The surface must be reconfigured; the next frame may succeed as is.
    SurfaceLost,
    Failed,
}

impl ResultCode {
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    /// Whether the driver has to rebuild the GPU backend before rendering again.
    pub fn requires_device_recreation(self) -> bool {
        matches!(self, Self::DeviceLost | Self::OutOfMemory)
    }
}

impl From<&PresentError> for ResultCode {
    fn from(err: &PresentError) -> Self {
        match err {
            PresentError::Gpu(GpuError::DeviceLost) => Self::DeviceLost,
            PresentError::Gpu(GpuError::OutOfMemory) => Self::OutOfMemory,
            PresentError::Gpu(GpuError::SurfaceLost | GpuError::Timeout) => Self::SurfaceLost,
            PresentError::Gpu(GpuError::Backend(_)) | PresentError::Raster(_) => Self::Failed,
        }
    }
}

impl From<Result<(), PresentError>> for ResultCode {
    fn from(result: Result<(), PresentError>) -> Self {
        match result {
            Ok(()) => Self::Ok,
            Err(e) => Self::from(&e),
        }
    }
}
