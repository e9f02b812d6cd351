//! Per-frame input: glyph placements grouped by row.

use crate::atlas::GlyphKey;

/// Opaque white, `0xRRGGBBAA`.
pub const DEFAULT_COLOR: u32 = 0xFFFF_FFFF;

/// One shaped glyph run at a position on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub key: GlyphKey,
    /// Pen position on the baseline, in device pixels.
    pub baseline: [f32; 2],
    /// Grid row the run came from.
    pub row: u16,
    /// `0xRRGGBBAA`.
    pub color: u32,
}

impl Placement {
    pub fn new(key: GlyphKey, baseline: [f32; 2], row: u16) -> Self {
        Self {
            key,
            baseline,
            row,
            color: DEFAULT_COLOR,
        }
    }

    #[must_use]
    pub fn with_color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }
}

/// Ordered placements of one visible line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    placements: Vec<Placement>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, placement: Placement) {
        self.placements.push(placement);
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}

impl From<Vec<Placement>> for Row {
    fn from(placements: Vec<Placement>) -> Self {
        Self { placements }
    }
}

impl FromIterator<Placement> for Row {
    fn from_iter<I: IntoIterator<Item = Placement>>(iter: I) -> Self {
        Self {
            placements: iter.into_iter().collect(),
        }
    }
}
