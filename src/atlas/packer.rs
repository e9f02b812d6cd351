//! Online rectangle packers for the glyph atlas.
//!
//! Packers hand out non-overlapping regions of a fixed surface and never
//! move a rectangle once placed. Nothing is freed individually: the only way
//! to reclaim space is [`RectPacker::reset`], which the presenter calls when
//! it starts a new atlas generation.

use serde::{Deserialize, Serialize};

/// Allocation strategy for the atlas surface.
pub trait RectPacker: Send {
    /// Find space for a `width` × `height` rectangle.
    ///
    /// Returns the top-left corner, or `None` when the surface is exhausted.
    /// A failed call leaves the packer unchanged.
    fn pack(&mut self, width: u32, height: u32) -> Option<(u32, u32)>;

    /// Forget every allocation.
    fn reset(&mut self);

    /// Surface dimensions `(width, height)`.
    fn size(&self) -> (u32, u32);
}

/// Packer selection, as written in the config file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackerKind {
    #[default]
    Guillotine,
    Shelf,
}

impl PackerKind {
    /// Build a packer over a `size` × `size` atlas.
    pub fn build(self, size: u32) -> Box<dyn RectPacker> {
        match self {
            Self::Guillotine => Box::new(GuillotinePacker::new(size, size)),
            Self::Shelf => Box::new(ShelfPacker::new(size, size)),
        }
    }
}

/// Free region of the atlas surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FreeRect {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

impl FreeRect {
    const fn whole(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            w: width,
            h: height,
        }
    }

    /// `(shorter, longer)` leftover side after placing `w` × `h` in the
    /// corner, or `None` if it does not fit.
    fn leftover(self, w: u32, h: u32) -> Option<(u32, u32)> {
        let dw = self.w.checked_sub(w)?;
        let dh = self.h.checked_sub(h)?;
        Some((dw.min(dh), dw.max(dh)))
    }

    /// Guillotine cut around a `w` × `h` rectangle placed in the corner.
    /// The cut runs along the shorter leftover axis so the larger remainder
    /// stays in one piece.
    fn split(self, w: u32, h: u32) -> [Self; 2] {
        let (dw, dh) = (self.w - w, self.h - h);
        let (right_h, below_w) = if dw < dh { (h, self.w) } else { (self.h, w) };
        [
            Self {
                x: self.x + w,
                y: self.y,
                w: dw,
                h: right_h,
            },
            Self {
                x: self.x,
                y: self.y + h,
                w: below_w,
                h: dh,
            },
        ]
    }

    fn is_empty(self) -> bool {
        self.w == 0 || self.h == 0
    }
}

/// Guillotine packer with best-short-side-fit placement.
///
/// Keeps a list of free rectangles. Each allocation takes the free rectangle
/// that leaves the smallest short side, then cuts what is left of it into at
/// most two new free rectangles. See Jylanki, "A Thousand Ways to Pack the
/// Bin" (2010).
#[derive(Debug)]
pub struct GuillotinePacker {
    width: u32,
    height: u32,
    free: Vec<FreeRect>,
}

impl GuillotinePacker {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            free: vec![FreeRect::whole(width, height)],
        }
    }
}

impl RectPacker for GuillotinePacker {
    /// Ties on the short side are broken by the long side, then by the
    /// earliest free rectangle, so placement depends only on the call
    /// sequence.
    fn pack(&mut self, width: u32, height: u32) -> Option<(u32, u32)> {
        if width == 0 || height == 0 {
            return None;
        }
        let (idx, _) = self
            .free
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.leftover(width, height).map(|score| (i, score)))
            .min_by_key(|&(_, score)| score)?;

        let chosen = self.free.swap_remove(idx);
        self.free.extend(
            chosen
                .split(width, height)
                .into_iter()
                .filter(|r| !r.is_empty()),
        );
        Some((chosen.x, chosen.y))
    }

    fn reset(&mut self) {
        self.free.clear();
        self.free.push(FreeRect::whole(self.width, self.height));
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Row-based shelf packer: fills left to right, opens a new shelf below the
/// tallest rectangle of the current one when a row runs out.
///
/// Cheaper than the guillotine packer and a good fit for monospace grids,
/// where most glyphs share a height.
#[derive(Debug)]
pub struct ShelfPacker {
    width: u32,
    height: u32,
    cursor_x: u32,
    cursor_y: u32,
    row_h: u32,
}

impl ShelfPacker {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cursor_x: 0,
            cursor_y: 0,
            row_h: 0,
        }
    }
}

impl RectPacker for ShelfPacker {
    fn pack(&mut self, w: u32, h: u32) -> Option<(u32, u32)> {
        if w == 0 || h == 0 || w > self.width {
            return None;
        }

        let (mut x, mut y, mut row_h) = (self.cursor_x, self.cursor_y, self.row_h);
        if x + w > self.width {
            x = 0;
            y += row_h;
            row_h = 0;
        }
        if y + h > self.height {
            return None;
        }

        self.cursor_x = x + w;
        self.cursor_y = y;
        self.row_h = row_h.max(h);
        Some((x, y))
    }

    fn reset(&mut self) {
        self.cursor_x = 0;
        self.cursor_y = 0;
        self.row_h = 0;
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
