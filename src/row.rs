//! Row buffers and the ordered row list.
//!
//! A row is one laid-out line: an owned sequence of [`CharCell`]s plus
//! cached pixel metrics and the kind of terminator that ended it. The
//! row list always holds at least one row; an empty layer is a single
//! empty row.

use crate::cell::CharCell;
use std::collections::TryReserveError;

/// How a row ends.
///
/// `None` marks a soft wrap: the typesetter broke the row because
/// content exceeded the available width, not because the source text
/// contained a line terminator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Terminator {
    /// Soft wrap; no terminator in the source text.
    #[default]
    None,
    /// `\n`
    Lf,
    /// `\r`
    Cr,
    /// `\r\n`
    CrLf,
}

impl Terminator {
    /// Whether the row was ended by an explicit terminator in the text.
    #[inline]
    pub fn is_explicit(self) -> bool {
        self != Terminator::None
    }

    /// The terminator's source characters, empty for a soft wrap.
    pub fn as_str(self) -> &'static str {
        match self {
            Terminator::None => "",
            Terminator::Lf => "\n",
            Terminator::Cr => "\r",
            Terminator::CrLf => "\r\n",
        }
    }
}

/// Line-height policy: how a row's `height` is derived from its
/// `text_height`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineHeight {
    /// `height = text_height * 11 / 10` (no policy configured).
    Auto,
    /// `height = text_height * factor`.
    Scale(f32),
    /// `height` is a fixed pixel value, ignoring `text_height`.
    Px(i32),
}

impl Default for LineHeight {
    fn default() -> Self {
        LineHeight::Scale(1.428)
    }
}

impl LineHeight {
    /// Compute a row height from its text height.
    #[inline]
    pub fn apply(self, text_height: i32) -> i32 {
        match self {
            LineHeight::Auto => text_height * 11 / 10,
            LineHeight::Scale(factor) => (text_height as f32 * factor) as i32,
            LineHeight::Px(px) => px,
        }
    }
}

/// One line of laid-out text with cached metrics.
#[derive(Debug, Default)]
pub struct Row {
    pub(crate) cells: Vec<CharCell>,
    width: i32,
    height: i32,
    text_height: i32,
    pub(crate) terminator: Terminator,
}

impl Row {
    /// Create an empty row with no metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cells in the row.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the row holds no cells.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The row's cells.
    #[inline]
    pub fn cells(&self) -> &[CharCell] {
        &self.cells
    }

    /// Cached row width: the sum of resolved glyph advances.
    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Cached row height per the line-height policy.
    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Cached text height: the tallest glyph advance, floored at the
    /// layer's base pixel size.
    #[inline]
    pub fn text_height(&self) -> i32 {
        self.text_height
    }

    /// How this row ends.
    #[inline]
    pub fn terminator(&self) -> Terminator {
        self.terminator
    }

    /// Insert a cell at `pos`, growing the row by one.
    ///
    /// A non-negative `pos` is clamped to the row length; a negative
    /// `pos` counts from one past the end (so `-1` appends), clamped
    /// at zero. Growth is fallible; on failure the row is unchanged.
    pub(crate) fn insert_at(&mut self, pos: isize, cell: CharCell) -> Result<(), TryReserveError> {
        let len = self.cells.len() as isize;
        let pos = if pos < 0 {
            (len + 1 + pos).max(0)
        } else {
            pos.min(len)
        } as usize;
        self.cells.try_reserve(1)?;
        self.cells.insert(pos, cell);
        Ok(())
    }

    /// Append a cell. Fallible growth, like [`Self::insert_at`].
    pub(crate) fn push(&mut self, cell: CharCell) -> Result<(), TryReserveError> {
        self.cells.try_reserve(1)?;
        self.cells.push(cell);
        Ok(())
    }

    /// Recompute `width`, `text_height`, and `height` from the cells'
    /// glyph advances.
    ///
    /// Cells without a resolved glyph contribute nothing. `text_height`
    /// floors at `base_pixel_size` so an empty row still has a height.
    /// Must run as the last step of any row mutation.
    pub(crate) fn update_size(&mut self, base_pixel_size: i32, line_height: LineHeight) {
        self.width = 0;
        self.text_height = base_pixel_size;
        for cell in &self.cells {
            let Some(glyph) = cell.glyph.as_ref() else {
                continue;
            };
            self.width += glyph.advance_x;
            if self.text_height < glyph.advance_y {
                self.text_height = glyph.advance_y;
            }
        }
        self.height = line_height.apply(self.text_height);
    }
}

/// Ordered, owned sequence of rows. Never empty.
#[derive(Debug)]
pub struct RowList {
    rows: Vec<Row>,
}

impl RowList {
    /// Create a list holding a single empty row.
    pub fn new() -> Self {
        Self {
            rows: vec![Row::new()],
        }
    }

    /// Number of rows; always at least one.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Always false; kept for API symmetry with collections.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The row at `index`, if in bounds.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// Mutable row access.
    #[inline]
    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Row> {
        self.rows.get_mut(index)
    }

    /// Iterate over all rows in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// The last row.
    #[inline]
    pub fn last(&self) -> &Row {
        // Invariant: rows is never empty.
        &self.rows[self.rows.len() - 1]
    }

    /// Remove and return the row at `index`, shifting subsequent rows
    /// down. Out-of-bounds indices are a no-op returning `None`.
    ///
    /// Callers are responsible for never leaving the list empty.
    pub(crate) fn remove_row(&mut self, index: usize) -> Option<Row> {
        if index >= self.rows.len() {
            return None;
        }
        Some(self.rows.remove(index))
    }

    /// Split the row at `(row, col)`: cells from `col` onward move into
    /// a new row inserted immediately after, which inherits the old
    /// terminator; the split row's terminator becomes `terminator`.
    ///
    /// Metrics of both rows are stale afterwards; the caller recomputes
    /// them. On allocation failure nothing is moved.
    pub(crate) fn split_row(
        &mut self,
        row: usize,
        col: usize,
        terminator: Terminator,
    ) -> Result<(), TryReserveError> {
        self.rows.try_reserve(1)?;
        let src = &mut self.rows[row];
        let col = col.min(src.cells.len());
        let moved = src.cells.split_off(col);
        let inherited = src.terminator;
        src.terminator = terminator;
        let mut next = Row::new();
        next.cells = moved;
        next.terminator = inherited;
        self.rows.insert(row + 1, next);
        Ok(())
    }

    /// Move the first `count` cells of row `dst + 1` to the end of row
    /// `dst`, preserving order.
    pub(crate) fn merge_prefix(&mut self, dst: usize, count: usize) {
        let (left, right) = self.rows.split_at_mut(dst + 1);
        let d = &mut left[dst];
        let s = &mut right[0];
        let count = count.min(s.cells.len());
        d.cells.extend(s.cells.drain(..count));
    }
}

impl Default for RowList {
    fn default() -> Self {
        Self::new()
    }
}
