//! Lock-free handoff from any thread to the presentation thread.
//!
//! Writers only touch atomics: flags are OR-ed in, the dirty rect is widened
//! with a CAS loop, the scroll delta accumulates with `fetch_add`, sizes and
//! metrics are stored packed. The presenter drains everything at the start of
//! a frame with Acquire swaps, so each write is observed by exactly one frame.

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, AtomicU32, AtomicU64, Ordering};

use bitflags::bitflags;

use crate::font::FontMetrics;
use crate::geometry::{CellCount, CellRect, CellSize, PixelSize};

bitflags! {
    /// Pending structural changes published to the presenter.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Invalidations: u32 {
        /// GPU resources must be recreated. Consumed by the device owner
        /// via [`ApiHandle::take_device_lost`], never by the presenter.
        const DEVICE = 1;
        /// Surface size / cell count changed.
        const SIZE = 1 << 1;
        /// Font metrics changed; the atlas contents are stale.
        const FONT = 1 << 2;
        /// Colors or other shader constants changed; redraw everything.
        const CONST_BUFFER = 1 << 3;
    }
}

/// Everything the presenter picks up at a frame boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Pending {
    pub invalidations: Invalidations,
    pub dirty: CellRect,
    pub scroll: i32,
    pub viewport: Option<(PixelSize, CellCount)>,
    pub font: Option<FontMetrics>,
}

#[derive(Debug, Default)]
pub(crate) struct ApiState {
    invalidations: AtomicU32,
    dirty: AtomicU64,
    scroll: AtomicI32,
    pixel_size: AtomicU64,
    cell_count: AtomicU32,
    /// Cell width, cell height and baseline, 16 bits each.
    font_geometry: AtomicU64,
    /// `f32` bits of the font size.
    font_size: AtomicU32,
}

impl ApiState {
    fn raise(&self, flags: Invalidations) {
        self.invalidations.fetch_or(flags.bits(), Ordering::Release);
    }

    fn widen_dirty(&self, rect: CellRect) {
        if rect.is_empty() {
            return;
        }
        let mut current = self.dirty.load(Ordering::Relaxed);
        loop {
            let next = CellRect::from_bits(current).union(rect).to_bits();
            if next == current {
                return;
            }
            match self.dirty.compare_exchange_weak(
                current,
                next,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    /// Take every pending change except [`Invalidations::DEVICE`].
    pub(crate) fn drain(&self) -> Pending {
        let bits = self
            .invalidations
            .fetch_and(Invalidations::DEVICE.bits(), Ordering::Acquire);
        let invalidations =
            Invalidations::from_bits_truncate(bits).difference(Invalidations::DEVICE);
        let dirty = CellRect::from_bits(self.dirty.swap(0, Ordering::Acquire));
        let scroll = self.scroll.swap(0, Ordering::Acquire);

        let viewport = invalidations.contains(Invalidations::SIZE).then(|| {
            let size = PixelSize::from_bits(self.pixel_size.load(Ordering::Acquire));
            let cells = self.cell_count.load(Ordering::Acquire);
            (size, CellCount::new(cells as u16, (cells >> 16) as u16))
        });
        let font = invalidations.contains(Invalidations::FONT).then(|| {
            let g = self.font_geometry.load(Ordering::Acquire);
            FontMetrics {
                size_px: f32::from_bits(self.font_size.load(Ordering::Acquire)),
                cell: CellSize::new(g as u16, (g >> 16) as u16),
                baseline: (g >> 32) as u16,
            }
        });

        Pending {
            invalidations,
            dirty,
            scroll,
            viewport,
            font,
        }
    }
}

/// Cloneable handle for invalidating the renderer from any thread.
#[derive(Debug, Clone)]
pub struct ApiHandle {
    state: Arc<ApiState>,
}

impl ApiHandle {
    pub(crate) fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }

    /// Mark `rect` (in cells) as changed.
    pub fn invalidate(&self, rect: CellRect) {
        self.state.widen_dirty(rect);
    }

    /// Mark the whole grid as changed.
    pub fn invalidate_all(&self) {
        self.state
            .widen_dirty(CellRect::new(0, 0, u16::MAX, u16::MAX));
    }

    /// Record that the content moved by `rows` (positive: down).
    pub fn invalidate_scroll(&self, rows: i32) {
        if rows != 0 {
            self.state.scroll.fetch_add(rows, Ordering::Release);
        }
    }

    /// Colors changed: the next frame is a full redraw.
    pub fn invalidate_colors(&self) {
        self.state.raise(Invalidations::CONST_BUFFER);
    }

    /// New surface size and grid dimensions.
    pub fn set_viewport(&self, size: PixelSize, cells: CellCount) {
        self.state
            .pixel_size
            .store(size.to_bits(), Ordering::Release);
        self.state.cell_count.store(
            u32::from(cells.cols) | (u32::from(cells.rows) << 16),
            Ordering::Release,
        );
        self.state.raise(Invalidations::SIZE);
    }

    /// New font geometry: drops the atlas contents on the next frame.
    pub fn set_font_metrics(&self, metrics: FontMetrics) {
        let g = u64::from(metrics.cell.width)
            | (u64::from(metrics.cell.height) << 16)
            | (u64::from(metrics.baseline) << 32);
        self.state.font_geometry.store(g, Ordering::Release);
        self.state
            .font_size
            .store(metrics.size_px.to_bits(), Ordering::Release);
        self.state.raise(Invalidations::FONT);
    }

    /// Raise the device-recreation flag.
    pub fn invalidate_device(&self) {
        self.state.raise(Invalidations::DEVICE);
    }

    /// Consume the device-recreation flag.
    pub fn take_device_lost(&self) -> bool {
        let prev = self
            .state
            .invalidations
            .fetch_and(!Invalidations::DEVICE.bits(), Ordering::AcqRel);
        prev & Invalidations::DEVICE.bits() != 0
    }
}
