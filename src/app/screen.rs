//! Demo text model and row layout.

use unicode_width::UnicodeWidthChar;

use crate::atlas::GlyphKey;
use crate::engine::{DEFAULT_COLOR, Placement, Row};
use crate::font::{FaceIdx, FontMetrics};
use crate::geometry::CellCount;

/// Status line foreground, `0xRRGGBBAA`.
pub(super) const STATUS_COLOR: u32 = 0x89B4_FAFF;

/// Scrollable buffer of lines plus a status line pinned to the last row.
pub(super) struct Screen {
    lines: Vec<String>,
    top: usize,
    cells: CellCount,
    status: String,
}

impl Screen {
    pub(super) fn new(lines: Vec<String>) -> Self {
        Self {
            lines,
            top: 0,
            cells: CellCount::new(0, 0),
            status: String::new(),
        }
    }

    /// Demo content: every printable ASCII run plus a few wide characters.
    pub(super) fn sample() -> Self {
        let ascii: String = (0x21u8..0x7F).map(char::from).collect();
        let lines = (0..500)
            .map(|i| match i % 4 {
                0 => format!("{i:>4}  {ascii}"),
                1 => format!("{i:>4}  The quick brown fox jumps over the lazy dog."),
                2 => format!("{i:>4}  fn main() {{ println!(\"glyph atlas\"); }}"),
                _ => format!("{i:>4}  漢字 かな 한글 -> ≠ ≤ ≥"),
            })
            .collect();
        Self::new(lines)
    }

    pub(super) fn set_cells(&mut self, cells: CellCount) {
        self.cells = cells;
        self.top = self.top.min(self.max_top());
    }

    pub(super) fn cells(&self) -> CellCount {
        self.cells
    }

    pub(super) fn set_status(&mut self, status: String) {
        self.status = status;
    }

    /// Scroll the view by `delta` lines (positive: toward the start of the
    /// buffer). Returns how many rows the content actually moved, positive
    /// meaning down.
    pub(super) fn scroll(&mut self, delta: i32) -> i32 {
        let old = self.top;
        let target = if delta >= 0 {
            old.saturating_sub(delta.unsigned_abs() as usize)
        } else {
            old.saturating_add(delta.unsigned_abs() as usize)
        };
        self.top = target.min(self.max_top());
        old as i32 - self.top as i32
    }

    /// Text shown on `row`. The last row is the status line.
    pub(super) fn line(&self, row: u16) -> &str {
        if self.cells.rows > 0 && row == self.cells.rows - 1 {
            return &self.status;
        }
        self.lines
            .get(self.top + usize::from(row))
            .map_or("", String::as_str)
    }

    fn content_rows(&self) -> usize {
        usize::from(self.cells.rows.saturating_sub(1))
    }

    fn max_top(&self) -> usize {
        self.lines.len().saturating_sub(self.content_rows())
    }
}

/// Lay `text` out on grid `row`, one placement per non-blank character.
/// Wide characters take two cells; text past `cols` is dropped.
pub(super) fn layout_row(
    text: &str,
    row: u16,
    cols: u16,
    face: FaceIdx,
    font: &FontMetrics,
    color: u32,
    glyph_for: impl Fn(char) -> u16,
) -> Row {
    let cw = f32::from(font.cell.width);
    let y = f32::from(row) * f32::from(font.cell.height) + f32::from(font.baseline);
    let mut out = Row::new();
    let mut col: u16 = 0;
    for ch in text.chars() {
        let Some(w) = ch.width() else { continue };
        if w == 0 {
            continue;
        }
        let w = w as u16;
        if col + w > cols {
            break;
        }
        if !ch.is_whitespace() {
            let key = GlyphKey::single(face, glyph_for(ch));
            out.push(Placement::new(key, [f32::from(col) * cw, y], row).with_color(color));
        }
        col += w;
    }
    out
}

/// Foreground for `row`.
pub(super) fn row_color(screen: &Screen, row: u16) -> u32 {
    if screen.cells().rows > 0 && row == screen.cells().rows - 1 {
        STATUS_COLOR
    } else {
        DEFAULT_COLOR
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::CellSize;

    fn metrics() -> FontMetrics {
        FontMetrics {
            size_px: 16.0,
            cell: CellSize::new(8, 16),
            baseline: 12,
        }
    }

    fn numbered(n: usize) -> Screen {
        Screen::new((0..n).map(|i| i.to_string()).collect())
    }

    #[test]
    fn layout_skips_spaces_and_advances_wide_chars() {
        let row = layout_row("a 漢b", 2, 80, FaceIdx(0), &metrics(), DEFAULT_COLOR, |c| c as u16);
        let xs: Vec<f32> = row.placements().iter().map(|p| p.baseline[0]).collect();
        assert_eq!(xs, vec![0.0, 16.0, 32.0]);
        assert!(row.placements().iter().all(|p| p.baseline[1] == 44.0));
        assert!(row.placements().iter().all(|p| p.row == 2));
    }

    #[test]
    fn layout_truncates_at_grid_width() {
        let row = layout_row("abcdef", 0, 4, FaceIdx(0), &metrics(), DEFAULT_COLOR, |c| c as u16);
        assert_eq!(row.len(), 4);
        // A wide char that would straddle the edge is dropped.
        let row = layout_row("abc漢", 0, 4, FaceIdx(0), &metrics(), DEFAULT_COLOR, |c| c as u16);
        assert_eq!(row.len(), 3);
    }

    #[test]
    fn last_row_is_status_line() {
        let mut screen = numbered(100);
        screen.set_cells(CellCount::new(10, 5));
        screen.set_status("ready".to_owned());
        assert_eq!(screen.line(0), "0");
        assert_eq!(screen.line(3), "3");
        assert_eq!(screen.line(4), "ready");
        assert_eq!(row_color(&screen, 4), STATUS_COLOR);
        assert_eq!(row_color(&screen, 0), DEFAULT_COLOR);
    }

    #[test]
    fn scroll_reports_actual_movement() {
        let mut screen = numbered(10);
        screen.set_cells(CellCount::new(10, 5));
        // Already at the top: nothing moves.
        assert_eq!(screen.scroll(3), 0);
        // Four content rows over ten lines: at most six rows down the buffer.
        assert_eq!(screen.scroll(-100), -6);
        assert_eq!(screen.line(0), "6");
        assert_eq!(screen.scroll(2), 2);
        assert_eq!(screen.line(0), "4");
    }

    #[test]
    fn growing_grid_clamps_view() {
        let mut screen = numbered(10);
        screen.set_cells(CellCount::new(10, 5));
        screen.scroll(-6);
        screen.set_cells(CellCount::new(10, 9));
        assert_eq!(screen.line(0), "2");
        assert_eq!(screen.line(9), "");
    }
}
