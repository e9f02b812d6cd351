//! Cell- and pixel-space geometry shared by the engine, the API handle and
//! the GPU backends.
//!
//! Cell coordinates are `u16` so a whole rectangle packs into one `u64`
//! (see [`CellRect::to_bits`]), which is how the API handle publishes dirty
//! regions to the presentation thread without a lock.

/// Grid dimensions in cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CellCount {
    pub cols: u16,
    pub rows: u16,
}

impl CellCount {
    pub const fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }
}

/// Size of one cell in device pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CellSize {
    pub width: u16,
    pub height: u16,
}

impl CellSize {
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

/// Surface size in device pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub(crate) fn to_bits(self) -> u64 {
        (u64::from(self.width) << 32) | u64::from(self.height)
    }

    pub(crate) fn from_bits(bits: u64) -> Self {
        Self {
            width: (bits >> 32) as u32,
            height: bits as u32,
        }
    }
}

/// Half-open rectangle in cell units: `left..right` × `top..bottom`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CellRect {
    pub left: u16,
    pub top: u16,
    pub right: u16,
    pub bottom: u16,
}

impl CellRect {
    pub const EMPTY: Self = Self {
        left: 0,
        top: 0,
        right: 0,
        bottom: 0,
    };

    pub const fn new(left: u16, top: u16, right: u16, bottom: u16) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// The rectangle covering a whole grid of `count` cells.
    pub const fn full(count: CellCount) -> Self {
        Self::new(0, 0, count.cols, count.rows)
    }

    /// Rows `top..bottom` across every column of `count`.
    pub const fn rows(count: CellCount, top: u16, bottom: u16) -> Self {
        Self::new(0, top, count.cols, bottom)
    }

    pub fn is_empty(self) -> bool {
        self.left >= self.right || self.top >= self.bottom
    }

    /// Smallest rectangle containing both. Empty inputs are ignored.
    pub fn union(self, other: Self) -> Self {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        Self {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Clip to `bounds`, returning [`CellRect::EMPTY`] when nothing remains.
    pub fn intersect(self, bounds: Self) -> Self {
        let r = Self {
            left: self.left.max(bounds.left),
            top: self.top.max(bounds.top),
            right: self.right.min(bounds.right),
            bottom: self.bottom.min(bounds.bottom),
        };
        if r.is_empty() { Self::EMPTY } else { r }
    }

    /// Scale to pixel units.
    pub fn to_pixels(self, cell: CellSize) -> PixelRect {
        let w = i32::from(cell.width);
        let h = i32::from(cell.height);
        PixelRect {
            left: i32::from(self.left) * w,
            top: i32::from(self.top) * h,
            right: i32::from(self.right) * w,
            bottom: i32::from(self.bottom) * h,
        }
    }

    pub(crate) fn to_bits(self) -> u64 {
        u64::from(self.left)
            | (u64::from(self.top) << 16)
            | (u64::from(self.right) << 32)
            | (u64::from(self.bottom) << 48)
    }

    pub(crate) fn from_bits(bits: u64) -> Self {
        Self {
            left: bits as u16,
            top: (bits >> 16) as u16,
            right: (bits >> 32) as u16,
            bottom: (bits >> 48) as u16,
        }
    }
}

/// Half-open rectangle in pixel units. May extend past any surface, and may
/// have negative coordinates (ink boxes reported by a rasterizer do).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl PixelRect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(self) -> u32 {
        (self.right - self.left).max(0) as u32
    }

    pub fn height(self) -> u32 {
        (self.bottom - self.top).max(0) as u32
    }

    pub fn is_empty(self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Smallest rectangle containing both. Empty inputs are ignored.
    pub fn union(self, other: Self) -> Self {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        Self {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_rect_bits_survive_packing() {
        let r = CellRect::new(3, 7, 120, 65_000);
        assert_eq!(CellRect::from_bits(r.to_bits()), r);
        assert_eq!(CellRect::from_bits(0), CellRect::EMPTY);
    }

    #[test]
    fn union_ignores_empty() {
        let a = CellRect::new(2, 2, 4, 4);
        assert_eq!(a.union(CellRect::EMPTY), a);
        assert_eq!(CellRect::EMPTY.union(a), a);
        assert_eq!(
            a.union(CellRect::new(0, 3, 3, 10)),
            CellRect::new(0, 2, 4, 10)
        );
    }

    #[test]
    fn intersect_clips_to_bounds() {
        let full = CellRect::full(CellCount::new(80, 24));
        let r = CellRect::new(70, 20, u16::MAX, u16::MAX);
        assert_eq!(r.intersect(full), CellRect::new(70, 20, 80, 24));
        assert!(CellRect::new(90, 0, 100, 5).intersect(full).is_empty());
    }

    #[test]
    fn to_pixels_scales_by_cell_size() {
        let px = CellRect::new(1, 2, 3, 4).to_pixels(CellSize::new(9, 18));
        assert_eq!(px, PixelRect::new(9, 36, 27, 72));
    }

    #[test]
    fn pixel_rect_with_negative_origin() {
        let r = PixelRect::new(-3, -1, 5, 9);
        assert_eq!(r.width(), 8);
        assert_eq!(r.height(), 10);
        assert!(PixelRect::new(4, 4, 4, 9).is_empty());
    }

    #[test]
    fn pixel_size_bits_survive_packing() {
        let s = PixelSize::new(3840, 2160);
        assert_eq!(PixelSize::from_bits(s.to_bits()), s);
    }
}
