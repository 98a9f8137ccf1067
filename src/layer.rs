//! The text layer: an incrementally re-typeset, styled, line-wrapped
//! sequence of rows.
//!
//! All mutation entry points are synchronous and run to completion.
//! Edits mutate rows directly, then either invalidate the touched row's
//! rectangle (cheap path) or record a "typeset from row N" task; the
//! next [`TextLayer::update`] call applies pending work in a fixed
//! order and drains the accumulated dirty rectangles.

use crate::cell::CharCell;
use crate::draw::Surface;
use crate::font::FontSource;
use crate::geometry::{DirtyRegions, Point, Rect, TextAlign};
use crate::row::{LineHeight, Row, RowList, Terminator};
use crate::style::{StyleCache, StyleId, TagScanner, TextStyle};
use crate::task::PendingWork;
use std::sync::Arc;
use tracing::trace;

/// Errors reported by layer mutations.
#[derive(Debug, thiserror::Error)]
pub enum LayerError {
    /// A row or column index lies beyond the valid bounds.
    #[error("row or column index out of range")]
    OutOfRange,
    /// A zero count or otherwise unusable argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// Buffer growth failed; the attempted mutation was rolled back.
    #[error("buffer growth failed: {0}")]
    Alloc(#[from] std::collections::TryReserveError),
}

/// The logical insertion point, always clamped to a valid position:
/// `row < row_count` and `col <= row length`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Caret {
    /// Row index.
    pub row: usize,
    /// Column index; may equal the row length (end of row).
    pub col: usize,
}

/// Where a text-processing run places its characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AddMode {
    /// At the caret; the caret follows the inserted text.
    Insert,
    /// At the end of the last row; the caret does not move.
    Append,
}

/// A row-list-shrinking (or splitting) edit, described for caret
/// correction.
#[derive(Debug, Clone, Copy)]
pub(crate) enum RowEdit {
    /// Row `row` was split at `col`; cells from `col` onward now start
    /// a new row at `row + 1`.
    Split {
        /// Split row index.
        row: usize,
        /// First moved column.
        col: usize,
    },
    /// The first `consumed` cells of row `row` moved to the end of row
    /// `row - 1`, which held `dst_len` cells before the merge.
    MergePrefix {
        /// Source row index.
        row: usize,
        /// Number of leading cells moved.
        consumed: usize,
        /// Destination length before the merge.
        dst_len: usize,
    },
    /// All of row `row` merged into row `row - 1` (which held `dst_len`
    /// cells); the row itself still exists until a following `Remove`.
    MergeAll {
        /// Source row index.
        row: usize,
        /// Destination length before the merge.
        dst_len: usize,
    },
    /// Row `row` was removed; following rows shifted up.
    Remove {
        /// Removed row index.
        row: usize,
    },
}

/// Pure caret correction for a single row edit.
///
/// Every row-shrinking operation applies this as a post-condition so
/// the caret keeps pointing at the same logical character.
pub(crate) fn adjust_caret(caret: Caret, edit: RowEdit) -> Caret {
    match edit {
        RowEdit::Split { row, col } => {
            if caret.row == row && caret.col >= col {
                Caret {
                    row: row + 1,
                    col: caret.col - col,
                }
            } else if caret.row > row {
                Caret {
                    row: caret.row + 1,
                    col: caret.col,
                }
            } else {
                caret
            }
        }
        RowEdit::MergePrefix {
            row,
            consumed,
            dst_len,
        } => {
            if caret.row == row {
                if caret.col < consumed {
                    Caret {
                        row: row - 1,
                        col: caret.col + dst_len,
                    }
                } else {
                    Caret {
                        row,
                        col: caret.col - consumed,
                    }
                }
            } else {
                caret
            }
        }
        RowEdit::MergeAll { row, dst_len } => {
            if caret.row == row {
                Caret {
                    row: row - 1,
                    col: caret.col + dst_len,
                }
            } else {
                caret
            }
        }
        RowEdit::Remove { row } => {
            if caret.row > row {
                Caret {
                    row: caret.row - 1,
                    col: caret.col,
                }
            } else {
                caret
            }
        }
    }
}

/// An incremental text layout and reflow engine.
///
/// The layer owns its rows, cells, and inline-style cache; glyphs are
/// shared handles owned by the font collaborator. A single-threaded,
/// synchronous mutation model is assumed throughout.
pub struct TextLayer {
    rows: RowList,
    caret: Caret,
    /// Logical text length: cells plus one unit per explicit terminator.
    length: usize,
    /// Cached layer content width, recomputed during the update pass.
    width: i32,
    offset: Point,
    new_offset: Point,
    max_width: i32,
    max_height: i32,
    fixed_width: i32,
    fixed_height: i32,
    align: TextAlign,
    line_height: LineHeight,
    autowrap: bool,
    multiline: bool,
    style_tags: bool,
    style: TextStyle,
    style_cache: StyleCache,
    dirty: DirtyRegions,
    task: PendingWork,
    fonts: Arc<dyn FontSource>,
}

impl TextLayer {
    /// Create an empty layer (one empty row) using the given font
    /// collaborator.
    pub fn new(fonts: Arc<dyn FontSource>) -> Self {
        Self {
            rows: RowList::new(),
            caret: Caret::default(),
            length: 0,
            width: 0,
            offset: Point::default(),
            new_offset: Point::default(),
            max_width: 0,
            max_height: 0,
            fixed_width: 0,
            fixed_height: 0,
            align: TextAlign::Left,
            line_height: LineHeight::default(),
            autowrap: false,
            multiline: false,
            style_tags: false,
            style: TextStyle::default(),
            style_cache: StyleCache::new(),
            dirty: DirtyRegions::new(),
            task: PendingWork::new(),
            fonts,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Logical text length: cells plus one unit per explicit terminator.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether the layer holds no text.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Number of rows; always at least one.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Height of one row, or zero when `row` is out of bounds.
    pub fn row_height(&self, row: usize) -> i32 {
        self.rows.get(row).map_or(0, Row::height)
    }

    /// Cell count of one row, or `None` when `row` is out of bounds.
    pub fn row_len(&self, row: usize) -> Option<usize> {
        self.rows.get(row).map(Row::len)
    }

    /// The row at `index`, if in bounds.
    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// Cached layer content width (refreshed by [`Self::update`]).
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Total height: the sum of all row heights.
    pub fn height(&self) -> i32 {
        self.rows.iter().map(Row::height).sum()
    }

    /// The current caret position.
    pub fn caret(&self) -> Caret {
        self.caret
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Set the horizontal row alignment.
    pub fn set_align(&mut self, align: TextAlign) {
        self.align = align;
        self.task.request_typeset(0);
    }

    /// Set the line-height policy.
    pub fn set_line_height(&mut self, line_height: LineHeight) {
        self.line_height = line_height;
        self.task.request_typeset(0);
    }

    /// Enable or disable width-driven wrapping.
    pub fn set_autowrap(&mut self, enabled: bool) {
        if self.autowrap != enabled {
            self.autowrap = enabled;
            self.task.request_typeset(0);
        }
    }

    /// Enable or disable multiline layout. Wrapping only applies when
    /// both autowrap and multiline are on.
    pub fn set_multiline(&mut self, enabled: bool) {
        if self.multiline != enabled {
            self.multiline = enabled;
            self.task.request_typeset(0);
        }
    }

    /// Enable or disable inline style-tag recognition for subsequent
    /// text processing.
    pub fn set_style_tags_enabled(&mut self, enabled: bool) {
        self.style_tags = enabled;
    }

    /// Set a fixed layer size in pixels; zero disables the fixed size.
    pub fn set_fixed_size(&mut self, width: i32, height: i32) {
        self.fixed_width = width;
        self.fixed_height = height;
        self.task.request_full_redraw();
        if self.autowrap {
            self.task.request_typeset(0);
        }
    }

    /// Set the soft maximum size in pixels used when no fixed size is
    /// configured.
    pub fn set_max_size(&mut self, width: i32, height: i32) {
        self.max_width = width;
        self.max_height = height;
        self.task.request_full_redraw();
        if self.autowrap {
            self.task.request_typeset(0);
        }
    }

    /// Stage a scroll offset; it takes effect during the next update
    /// pass, which invalidates the before/after row regions.
    pub fn set_offset(&mut self, x: i32, y: i32) {
        self.new_offset = Point::new(x, y);
    }

    /// Replace the layer's base text style. Every glyph is re-resolved
    /// during the next update pass.
    pub fn set_style(&mut self, style: TextStyle) {
        self.style = style;
        self.task.request_glyph_reload();
    }

    /// The layer's base text style.
    pub fn style(&self) -> &TextStyle {
        &self.style
    }

    /// The inline styles collected from markup tags, addressed by the
    /// [`StyleId`]s held in cells.
    pub fn style_cache(&self) -> &StyleCache {
        &self.style_cache
    }

    // =========================================================================
    // Caret
    // =========================================================================

    /// Place the caret, clamping `row` to the last row and `col` to the
    /// row's length.
    pub fn set_caret(&mut self, row: usize, col: usize) {
        let row = row.min(self.rows.len() - 1);
        let col = self.rows.get(row).map_or(0, |r| col.min(r.len()));
        self.caret = Caret { row, col };
    }

    /// Place the caret by pixel hit-test.
    ///
    /// The row is the first whose cumulative height reaches `y` (the
    /// last row when `y` lies below all rows). Within the row, a click
    /// before a glyph's horizontal midpoint selects that glyph; at or
    /// after the midpoint it selects the next.
    pub fn set_caret_by_pixel(&mut self, x: i32, y: i32) {
        let mut row = self.rows.len() - 1;
        let mut bottom = 0;
        for (i, r) in self.rows.iter().enumerate() {
            bottom += r.height();
            if bottom >= y {
                row = i;
                break;
            }
        }
        let r = match self.rows.get(row) {
            Some(r) => r,
            None => return,
        };
        let mut col = r.len();
        let mut pen = self.row_start_x(r);
        for (i, cell) in r.cells().iter().enumerate() {
            let Some(glyph) = cell.glyph.as_ref() else {
                continue;
            };
            pen += glyph.advance_x;
            if x < pen - glyph.advance_x / 2 {
                col = i;
                break;
            }
        }
        self.set_caret(row, col);
    }

    /// Pixel position of the character at `(row, col)`: `y` is the sum
    /// of preceding row heights, `x` the alignment offset plus the
    /// advances of the preceding cells.
    pub fn char_pixel_pos(&self, row: usize, col: usize) -> Result<Point, LayerError> {
        let r = self.rows.get(row).ok_or(LayerError::OutOfRange)?;
        if col > r.len() {
            return Err(LayerError::OutOfRange);
        }
        let y = (0..row).map(|i| self.row_height(i)).sum();
        let mut x = self.row_start_x(r);
        for cell in &r.cells()[..col] {
            x += cell.advance_x();
        }
        Ok(Point::new(x, y))
    }

    /// Pixel position of the caret.
    pub fn caret_pixel_pos(&self) -> Point {
        // The caret is kept clamped, so this lookup cannot fail.
        self.char_pixel_pos(self.caret.row, self.caret.col)
            .unwrap_or_default()
    }

    /// Re-clamp the caret after a mutation that may have shrunk rows.
    fn clamp_caret(&mut self) {
        self.set_caret(self.caret.row, self.caret.col);
    }

    // =========================================================================
    // Text access
    // =========================================================================

    /// Read up to `max` cell code points starting at linear position
    /// `start` (addressed by row cell counts, terminators excluded).
    pub fn get_text(&self, start: usize, max: usize) -> String {
        let mut out = String::new();
        if max == 0 {
            return out;
        }
        let mut seen = 0;
        let mut row = self.rows.len();
        let mut col = 0;
        for (i, r) in self.rows.iter().enumerate() {
            if start < seen + r.len() {
                row = i;
                col = start - seen;
                break;
            }
            seen += r.len();
        }
        let mut taken = 0;
        while row < self.rows.len() && taken < max {
            let r = match self.rows.get(row) {
                Some(r) => r,
                None => break,
            };
            for cell in &r.cells()[col.min(r.len())..] {
                if taken >= max {
                    break;
                }
                out.push(cell.code_point);
                taken += 1;
            }
            col = 0;
            row += 1;
        }
        out
    }

    /// Reconstruct the whole text, re-emitting each row's terminator
    /// characters, so `set_text(&layer.text(), None)` round-trips.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for row in self.rows.iter() {
            for cell in row.cells() {
                out.push(cell.code_point);
            }
            out.push_str(row.terminator().as_str());
        }
        out
    }

    /// Remove all text, styles, and cached metrics, leaving one empty
    /// row. Outstanding [`StyleId`]s are invalidated.
    pub fn clear_text(&mut self) {
        trace!("clear text");
        self.length = 0;
        self.caret = Caret::default();
        self.width = 0;
        self.invalidate_rows(0, None);
        self.rows = RowList::new();
        self.style_cache.clear();
        self.task.request_full_redraw();
    }

    /// Insert text at the caret; the caret ends up after the inserted
    /// text.
    pub fn insert_text(
        &mut self,
        text: &str,
        tags: Option<&mut dyn TagScanner>,
    ) -> Result<(), LayerError> {
        self.process_text(text, AddMode::Insert, tags)
    }

    /// Append text at the end of the last row. The caret does not move.
    pub fn append_text(
        &mut self,
        text: &str,
        tags: Option<&mut dyn TagScanner>,
    ) -> Result<(), LayerError> {
        self.process_text(text, AddMode::Append, tags)
    }

    /// Replace the whole text: clear, then append.
    pub fn set_text(
        &mut self,
        text: &str,
        tags: Option<&mut dyn TagScanner>,
    ) -> Result<(), LayerError> {
        self.clear_text();
        self.append_text(text, tags)
    }

    /// Scan a code-point sequence into cells and row breaks.
    fn process_text(
        &mut self,
        text: &str,
        mode: AddMode,
        mut tags: Option<&mut dyn TagScanner>,
    ) -> Result<(), LayerError> {
        let chars: Vec<char> = text.chars().collect();
        trace!(len = chars.len(), ?mode, "process text");

        let (mut ins_y, mut ins_x) = match mode {
            AddMode::Append => {
                let row = self.rows.len() - 1;
                (row, self.rows.get(row).map_or(0, Row::len))
            }
            AddMode::Insert => (self.caret.row, self.caret.col),
        };
        let first_row = ins_y;
        let mut start_row = ins_y;
        let mut style: Option<StyleId> = None;
        let mut need_typeset = false;
        let mut rect_added = false;

        let mut i = 0;
        while i < chars.len() {
            if self.style_tags {
                if let Some(scanner) = tags.as_deref_mut() {
                    if let Some(next) = scanner.scan_closing_tag(&chars, i) {
                        i = next;
                        style = Some(self.style_cache.push(scanner.current_style()));
                        continue;
                    }
                    if let Some(next) = scanner.scan_opening_tag(&chars, i) {
                        i = next;
                        style = Some(self.style_cache.push(scanner.current_style()));
                        continue;
                    }
                }
            }

            let c = chars[i];
            if c == '\r' || c == '\n' {
                let terminator = if c == '\r' {
                    if chars.get(i + 1) == Some(&'\n') {
                        i += 1;
                        Terminator::CrLf
                    } else {
                        Terminator::Cr
                    }
                } else {
                    Terminator::Lf
                };
                i += 1;
                if !rect_added {
                    self.invalidate_rows(ins_y, None);
                    rect_added = true;
                    start_row = ins_y;
                }
                self.break_row(ins_y, ins_x, terminator)?;
                if let Some(r) = self.rows.get(ins_y) {
                    self.width = self.width.max(r.width());
                }
                need_typeset = true;
                self.length += 1;
                ins_x = 0;
                ins_y += 1;
                continue;
            }

            let mut cell = CharCell::new(c, style);
            cell.resolve_glyph(&self.style, &self.style_cache, self.fonts.as_ref());
            let row = self.rows.get_mut(ins_y).ok_or(LayerError::OutOfRange)?;
            if ins_x >= row.len() {
                row.push(cell)?;
            } else {
                row.insert_at(ins_x as isize, cell)?;
            }
            self.length += 1;
            ins_x += 1;
            i += 1;
        }

        self.update_row_size(ins_y);
        if let Some(r) = self.rows.get(ins_y) {
            self.width = self.width.max(r.width());
        }
        if mode == AddMode::Insert {
            self.caret = Caret {
                row: ins_y,
                col: ins_x,
            };
        }
        if self.autowrap || need_typeset {
            self.task.request_typeset(first_row);
        } else {
            self.invalidate_row(first_row, 0, None);
        }
        if rect_added {
            self.invalidate_rows(start_row, None);
        }
        Ok(())
    }

    // =========================================================================
    // Deletion
    // =========================================================================

    /// Delete `count` units to the right of the caret. The terminator
    /// of a row counts as one unit; crossing a soft-wrap boundary
    /// counts as none.
    pub fn delete_forward(&mut self, count: usize) -> Result<(), LayerError> {
        self.delete_range(self.caret.row, self.caret.col, count)
    }

    /// Delete `count` units to the right of `(row, col)`.
    ///
    /// Fails without mutating on a zero count or an out-of-bounds row.
    pub fn delete_range(&mut self, row: usize, col: usize, count: usize) -> Result<(), LayerError> {
        if count == 0 {
            return Err(LayerError::InvalidArgument("delete count must be > 0"));
        }
        let start_row = row;
        let start_col = self
            .rows
            .get(start_row)
            .ok_or(LayerError::OutOfRange)?
            .len()
            .min(col);
        trace!(start_row, start_col, count, "delete");

        // Walk forward to the end position, counting each explicit
        // terminator as one unit and soft-wrap boundaries as zero.
        let mut remaining = count;
        let mut end_row = start_row;
        let mut end_col = start_col;
        loop {
            let r = match self.rows.get(end_row) {
                Some(r) => r,
                None => break,
            };
            if end_col + remaining <= r.len() {
                end_col += remaining;
                remaining = 0;
                break;
            }
            remaining -= r.len() - end_col;
            if r.terminator().is_explicit() {
                remaining -= 1;
            }
            end_col = 0;
            end_row += 1;
            if remaining == 0 {
                break;
            }
        }
        // Committed only after the last fallible step, so an allocation
        // failure leaves the count untouched.
        let consumed = count - remaining;
        if end_row >= self.rows.len() {
            end_row = self.rows.len() - 1;
            end_col = self.rows.get(end_row).map_or(0, Row::len);
        }
        if end_row == start_row && end_col == start_col {
            return Ok(());
        }

        let prev_soft = start_row > 0
            && self
                .rows
                .get(start_row - 1)
                .is_some_and(|r| !r.terminator().is_explicit());

        if end_row == start_row {
            // Local deletion: left-compact the surviving suffix.
            self.length -= consumed;
            self.invalidate_row(start_row, start_col, None);
            self.task.request_typeset(start_row);
            if let Some(r) = self.rows.get_mut(start_row) {
                r.cells.drain(start_col..end_col.min(r.cells.len()));
            }
            let now_empty = self.rows.get(start_row).is_some_and(Row::is_empty);
            if now_empty && start_row > 0 && prev_soft {
                self.remove_emptied_row(start_row);
            } else {
                self.update_row_size(start_row);
            }
            self.clamp_caret();
            return Ok(());
        }

        let suffix_len = self
            .rows
            .get(end_row)
            .map_or(0, |r| r.len().saturating_sub(end_col));
        if let Some(r) = self.rows.get_mut(start_row) {
            r.cells.try_reserve(suffix_len)?;
        }
        self.length -= consumed;

        self.invalidate_rows(start_row + 1, None);
        let suffix = self
            .rows
            .get_mut(end_row)
            .map_or_else(Vec::new, |r| r.cells.split_off(end_col.min(r.cells.len())));
        // The start row's own terminator was consumed by the walk; the
        // merged row ends the way the end row did.
        let end_terminator = self
            .rows
            .get(end_row)
            .map_or(Terminator::None, Row::terminator);
        // Remove every fully-enclosed row plus the end row (its
        // surviving suffix has been copied out).
        for _ in start_row + 1..=end_row {
            self.rows.remove_row(start_row + 1);
            self.caret = adjust_caret(self.caret, RowEdit::Remove { row: start_row + 1 });
        }
        if let Some(r) = self.rows.get_mut(start_row) {
            r.cells.truncate(start_col);
            r.cells.extend(suffix);
            r.terminator = end_terminator;
        }
        self.update_row_size(start_row);

        let now_empty = self.rows.get(start_row).is_some_and(Row::is_empty);
        if now_empty && start_row > 0 && prev_soft && self.rows.len() > 1 {
            self.invalidate_row(start_row, 0, None);
            self.remove_emptied_row(start_row);
        }
        self.task.request_typeset(start_row);
        self.clamp_caret();
        Ok(())
    }

    /// Drop a row that a deletion left empty behind a soft wrap: an
    /// artificial wrap boundary with no content left. If the row still
    /// carried an explicit terminator (one the deletion did not
    /// consume), the soft-wrapped predecessor takes it over so the text
    /// keeps its line break.
    fn remove_emptied_row(&mut self, row: usize) {
        if let Some(removed) = self.rows.remove_row(row) {
            if removed.terminator().is_explicit() && row > 0 {
                if let Some(prev) = self.rows.get_mut(row - 1) {
                    prev.terminator = removed.terminator();
                }
            }
            self.caret = adjust_caret(self.caret, RowEdit::Remove { row });
        }
    }

    /// Delete `count` units to the left of the caret, then move the
    /// caret to the start of the deleted range.
    ///
    /// Walking backward, a soft-wrapped row contributes its length
    /// minus one (the wrap boundary itself is free); a terminator-ended
    /// row contributes its length plus one for the terminator.
    pub fn backspace(&mut self, count: usize) -> Result<(), LayerError> {
        if count == 0 {
            return Err(LayerError::InvalidArgument("backspace count must be > 0"));
        }
        let mut col = self.caret.col as isize;
        let mut row = self.caret.row as isize;
        let mut shortfall = count as isize;
        while row >= 0 {
            let r = match self.rows.get(row as usize) {
                Some(r) => r,
                None => break,
            };
            if (row as usize) < self.caret.row {
                col = r.len() as isize;
                if !r.terminator().is_explicit() {
                    col -= 1;
                }
            }
            if col >= shortfall {
                col -= shortfall;
                shortfall = 0;
                break;
            }
            shortfall -= col + 1;
            row -= 1;
        }
        if row < 0 || shortfall == count as isize {
            return Err(LayerError::OutOfRange);
        }
        // Fewer deletable units than requested: trim the count.
        let count = if shortfall > 0 {
            count - shortfall as usize
        } else {
            count
        };
        let (row, col) = (row as usize, col.max(0) as usize);
        self.delete_range(row, col, count)?;
        // If the computed position no longer exists, fall back to the
        // end of the last remaining row.
        if col == 0 && row >= self.rows.len() {
            let last = self.rows.len() - 1;
            let end = self.rows.get(last).map_or(0, Row::len);
            self.set_caret(last, end);
        } else {
            self.set_caret(row, col);
        }
        Ok(())
    }

    // =========================================================================
    // Typesetting
    // =========================================================================

    /// Request a typeset pass starting at `row`; coalesces with any
    /// pending request by taking the minimum row.
    pub fn request_typeset(&mut self, row: usize) {
        self.task.request_typeset(row);
    }

    fn update_row_size(&mut self, row: usize) {
        let base = self.style.pixel_size;
        let line_height = self.line_height;
        if let Some(r) = self.rows.get_mut(row) {
            r.update_size(base, line_height);
        }
    }

    /// Split a row, keeping both halves' metrics fresh and the caret on
    /// its logical character.
    fn break_row(
        &mut self,
        row: usize,
        col: usize,
        terminator: Terminator,
    ) -> Result<(), LayerError> {
        self.rows.split_row(row, col, terminator)?;
        self.update_row_size(row);
        self.update_row_size(row + 1);
        Ok(())
    }

    /// The effective wrap width: the fixed width if set, else the soft
    /// maximum.
    fn wrap_width(&self) -> i32 {
        if self.fixed_width > 0 {
            self.fixed_width
        } else {
            self.max_width
        }
    }

    /// Whether width-driven wrapping is disabled.
    fn wrap_disabled(&self) -> bool {
        self.wrap_width() <= 0 || !self.autowrap || !self.multiline
    }

    /// Re-wrap and re-merge a single row. A split leaves the remainder
    /// as the next row for the caller's from-index loop to process.
    fn typeset_row(&mut self, row: usize) -> Result<(), LayerError> {
        let max_width = self.wrap_width();
        let wrap_disabled = self.wrap_disabled();

        // Split scan: find the first cell that pushes the accumulated
        // width past the limit. A single oversized glyph never splits
        // below one cell.
        let mut split_at = None;
        {
            let r = self.rows.get(row).ok_or(LayerError::OutOfRange)?;
            let mut row_width = 0;
            for (col, cell) in r.cells().iter().enumerate() {
                let Some(glyph) = cell.glyph.as_ref() else {
                    continue;
                };
                row_width += glyph.advance_x;
                if wrap_disabled || col < 1 || row_width <= max_width {
                    continue;
                }
                split_at = Some(col);
                break;
            }
        }
        if let Some(col) = split_at {
            self.break_row(row, col, Terminator::None)?;
            self.caret = adjust_caret(self.caret, RowEdit::Split { row, col });
            return Ok(());
        }

        self.update_row_size(row);
        let stable = {
            let r = self.rows.get(row).ok_or(LayerError::OutOfRange)?;
            r.terminator().is_explicit() || row == self.rows.len() - 1
        };
        if stable {
            return Ok(());
        }

        // Merge: this row is soft-wrapped and under the limit; pull
        // cells from following rows while they fit.
        let mut row_width = self.rows.get(row).map_or(0, Row::width);
        loop {
            let done = self
                .rows
                .get(row)
                .is_some_and(|r| r.terminator().is_explicit());
            if done || row + 1 >= self.rows.len() {
                break;
            }
            let dst_len = self.rows.get(row).map_or(0, Row::len);
            let mut consumed = 0;
            let mut hit_limit = false;
            if let Some(next) = self.rows.get(row + 1) {
                for cell in next.cells() {
                    match cell.glyph.as_ref() {
                        // Glyphless cells are free to merge.
                        None => consumed += 1,
                        Some(glyph) => {
                            let w = row_width + glyph.advance_x;
                            if !wrap_disabled && w > max_width {
                                hit_limit = true;
                                break;
                            }
                            row_width = w;
                            consumed += 1;
                        }
                    }
                }
            }
            if hit_limit {
                self.caret = adjust_caret(
                    self.caret,
                    RowEdit::MergePrefix {
                        row: row + 1,
                        consumed,
                        dst_len,
                    },
                );
                self.rows.merge_prefix(row, consumed);
                self.update_row_size(row);
                return Ok(());
            }
            // The entire next row fits: adopt its terminator, delete
            // it, and keep merging against the new next row.
            self.caret = adjust_caret(
                self.caret,
                RowEdit::MergeAll {
                    row: row + 1,
                    dst_len,
                },
            );
            self.rows.merge_prefix(row, consumed);
            let terminator = self.rows.get(row + 1).map_or(Terminator::None, Row::terminator);
            if let Some(r) = self.rows.get_mut(row) {
                r.terminator = terminator;
            }
            self.update_row_size(row);
            self.invalidate_row(row, 0, None);
            self.rows.remove_row(row + 1);
            self.caret = adjust_caret(self.caret, RowEdit::Remove { row: row + 1 });
        }
        Ok(())
    }

    /// Re-wrap every row from `start` to the end, invalidating the
    /// before and after rectangles of the touched range.
    fn typeset_from(&mut self, start: usize) -> Result<(), LayerError> {
        trace!(start, "typeset");
        let start = start.min(self.rows.len() - 1);
        self.invalidate_rows(start, None);
        let mut row = start;
        while row < self.rows.len() {
            self.typeset_row(row)?;
            row += 1;
        }
        self.invalidate_rows(start, None);
        Ok(())
    }

    // =========================================================================
    // Update pass
    // =========================================================================

    /// Re-resolve every cell's glyph against the current base style and
    /// refresh all row metrics.
    fn reload_glyphs(&mut self) {
        let TextLayer {
            rows,
            style,
            style_cache,
            fonts,
            line_height,
            ..
        } = self;
        for row in 0..rows.len() {
            if let Some(r) = rows.get_mut(row) {
                for cell in &mut r.cells {
                    cell.resolve_glyph(style, style_cache, fonts.as_ref());
                }
                r.update_size(style.pixel_size, *line_height);
            }
        }
    }

    /// Apply pending work and drain the dirty rectangles.
    ///
    /// Order is load-bearing: (1) glyph reload, (2) typeset from the
    /// minimum dirty row, (3) layer width recomputation, (4) staged
    /// offset-change invalidation. Typesetting after a glyph reload
    /// ensures widths reflect the new glyphs before rewrap decisions.
    pub fn update(&mut self) -> Result<Vec<Rect>, LayerError> {
        if self.task.take_glyph_reload() {
            trace!("reload glyphs");
            self.invalidate_rows(0, None);
            self.reload_glyphs();
            self.invalidate_rows(0, None);
            self.task.request_full_redraw();
        }
        if let Some(start) = self.task.take_typeset() {
            self.typeset_from(start)?;
        }
        self.width = self.rows.iter().map(Row::width).max().unwrap_or(0);
        if self.new_offset != self.offset {
            self.invalidate_rows(0, None);
            self.offset = self.new_offset;
            self.invalidate_rows(0, None);
            self.task.request_full_redraw();
        }
        Ok(self.dirty.drain())
    }

    /// Whether a full repaint was requested since the last call; the
    /// flag is cleared by asking.
    pub fn take_redraw_all(&mut self) -> bool {
        self.task.take_full_redraw()
    }

    // =========================================================================
    // Invalidation
    // =========================================================================

    /// Alignment-dependent start offset of a row.
    fn row_start_x(&self, row: &Row) -> i32 {
        let width = if self.fixed_width > 0 {
            self.fixed_width
        } else {
            self.width
        };
        match self.align {
            TextAlign::Left => 0,
            TextAlign::Center => (width - row.width()) / 2,
            TextAlign::Right => width - row.width(),
        }
    }

    /// Pixel rectangle of a span of one row, offset-adjusted. `None`
    /// when out of bounds or the span has no area.
    fn row_rect(&self, row: usize, start_col: usize, end_col: Option<usize>) -> Option<Rect> {
        let r = self.rows.get(row)?;
        let mut y = self.offset.y;
        for i in 0..row {
            y += self.row_height(i);
        }
        let mut x = self.offset.x + self.row_start_x(r);
        let last = r.len().checked_sub(1)?;
        let end_col = end_col.map_or(last, |e| e.min(last));
        let width = if start_col == 0 && end_col == last {
            r.width()
        } else {
            for cell in &r.cells()[..start_col.min(r.len())] {
                x += cell.advance_x();
            }
            r.cells()[start_col.min(r.len())..=end_col]
                .iter()
                .map(CharCell::advance_x)
                .sum()
        };
        let rect = Rect::new(x, y, width, r.height());
        if rect.is_empty() {
            None
        } else {
            Some(rect)
        }
    }

    /// Record one row span as dirty.
    fn invalidate_row(&mut self, row: usize, start_col: usize, end_col: Option<usize>) {
        if let Some(rect) = self.row_rect(row, start_col, end_col) {
            self.dirty.add(rect);
        }
    }

    /// Record the rectangles of rows `start_row..=end_row` (default to
    /// the last row), skipping rows scrolled above the view and
    /// stopping past the configured maximum height.
    fn invalidate_rows(&mut self, start_row: usize, end_row: Option<usize>) {
        let last = self.rows.len() - 1;
        let end_row = end_row.map_or(last, |e| e.min(last));
        let limit = if self.max_height > 0 {
            self.max_height
        } else {
            i32::MAX
        };
        let mut y = self.offset.y;
        let mut row = 0;
        while row < self.rows.len() {
            let h = self.row_height(row);
            y += h;
            if row >= start_row && y >= 0 {
                y -= h;
                break;
            }
            row += 1;
        }
        while row <= end_row {
            if let Some(rect) = self.row_rect(row, 0, None) {
                self.dirty.add(rect);
            }
            y += self.row_height(row);
            if y >= limit {
                break;
            }
            row += 1;
        }
    }

    // =========================================================================
    // Drawing
    // =========================================================================

    /// Draw the rows intersecting `area` (layer-local pixels) onto a
    /// surface, translating by `origin`.
    ///
    /// Cells without a resolved glyph are skipped; each glyph is placed
    /// on the row baseline with its bearings applied and blended with
    /// its style's foreground color, falling back to the layer color.
    pub fn draw(&self, area: Rect, origin: Point, surface: &mut dyn Surface) {
        let width = if self.fixed_width > 0 {
            self.fixed_width
        } else {
            self.width
        };
        let height = if self.fixed_height > 0 {
            self.fixed_height
        } else {
            self.height()
        };
        let area = area.clamp_to(width, height);
        if area.is_empty() {
            return;
        }

        // Skip rows above the draw area.
        let mut y = self.offset.y;
        let mut first = self.rows.len();
        for (i, r) in self.rows.iter().enumerate() {
            y += r.height();
            if y > area.y {
                y -= r.height();
                first = i;
                break;
            }
        }

        for row in first..self.rows.len() {
            let r = match self.rows.get(row) {
                Some(r) => r,
                None => break,
            };
            let mut x = self.offset.x + self.row_start_x(r);
            // Skip cells left of the draw area.
            let mut start = r.len();
            for (col, cell) in r.cells().iter().enumerate() {
                let Some(glyph) = cell.glyph.as_ref() else {
                    continue;
                };
                x += glyph.advance_x;
                if x > area.x {
                    x -= glyph.advance_x;
                    start = col;
                    break;
                }
            }
            if start >= r.len() {
                y += r.height();
                continue;
            }
            for cell in &r.cells()[start..] {
                let Some(glyph) = cell.glyph.as_ref() else {
                    continue;
                };
                let pos = Point::new(
                    origin.x + x + glyph.bearing_left,
                    origin.y + y + r.text_height() * 4 / 5 + (r.height() - r.text_height()) / 2
                        - glyph.bearing_top,
                );
                x += glyph.advance_x;
                let color = cell
                    .style
                    .and_then(|id| self.style_cache.get(id))
                    .and_then(|s| s.color)
                    .unwrap_or(self.style.color);
                surface.blend(pos, glyph.as_ref(), color);
                if x > area.x + area.width {
                    break;
                }
            }
            y += r.height();
            if y > area.y + area.height {
                break;
            }
        }
    }
}

impl std::fmt::Debug for TextLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextLayer")
            .field("rows", &self.rows.len())
            .field("length", &self.length)
            .field("caret", &self.caret)
            .field("width", &self.width)
            .field("autowrap", &self.autowrap)
            .field("multiline", &self.multiline)
            .finish_non_exhaustive()
    }
}
