//! Font collaborator interface and glyph metrics.
//!
//! The engine never rasterizes text itself. A [`FontSource`] hands out
//! shared, immutable [`Glyph`]s; a cell that gets no glyph is still a
//! valid logical column, it just contributes zero width and is skipped
//! when drawing.

use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex};
use unicode_width::UnicodeWidthChar;

/// Identifier of a loaded font face, assigned by the font collaborator.
pub type FontId = i32;

/// Pseudo font ID meaning "use any available font".
pub const ANY_FONT: FontId = -1;

/// A rasterized glyph: metrics plus an 8-bit alpha coverage bitmap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glyph {
    /// Horizontal pen advance in pixels.
    pub advance_x: i32,
    /// Vertical extent used for line metrics, in pixels.
    pub advance_y: i32,
    /// Horizontal offset from the pen position to the bitmap's left edge.
    pub bearing_left: i32,
    /// Vertical offset from the baseline up to the bitmap's top edge.
    pub bearing_top: i32,
    /// Bitmap width in pixels.
    pub width: i32,
    /// Bitmap height in pixels.
    pub height: i32,
    /// Row-major alpha coverage, `width * height` bytes.
    pub buffer: Vec<u8>,
}

/// Source of rasterized glyphs.
///
/// `font_id` of [`ANY_FONT`] means any available face may satisfy the
/// request. Returning `None` is not an error; the cell keeps its code
/// point and occupies a column with zero width.
pub trait FontSource {
    /// Resolve a glyph for one code point at the given pixel size.
    fn glyph(&self, code_point: char, font_id: FontId, pixel_size: i32) -> Option<Arc<Glyph>>;
}

/// Deterministic monospace font source used by tests, benches, and demos.
///
/// Every printable code point gets a glyph whose advance is
/// `unicode_width(c) * pixel_size / 2`, so a size-20 font yields a
/// 10px-advance character grid. Zero-width and control characters
/// resolve to no glyph, which exercises the glyphless-cell paths.
#[derive(Debug, Default)]
pub struct MonoFonts {
    cache: Mutex<FxHashMap<(char, i32), Arc<Glyph>>>,
}

impl MonoFonts {
    /// Create a new source with an empty glyph cache.
    pub fn new() -> Self {
        Self::default()
    }
}

impl FontSource for MonoFonts {
    fn glyph(&self, code_point: char, _font_id: FontId, pixel_size: i32) -> Option<Arc<Glyph>> {
        if pixel_size <= 0 {
            return None;
        }
        let cols = UnicodeWidthChar::width(code_point)?;
        if cols == 0 {
            return None;
        }
        let mut cache = self.cache.lock().ok()?;
        let glyph = cache
            .entry((code_point, pixel_size))
            .or_insert_with(|| {
                let advance_x = cols as i32 * pixel_size / 2;
                let coverage = if code_point.is_whitespace() { 0x00 } else { 0xFF };
                Arc::new(Glyph {
                    advance_x,
                    advance_y: pixel_size,
                    bearing_left: 0,
                    bearing_top: pixel_size * 4 / 5,
                    width: advance_x,
                    height: pixel_size,
                    buffer: vec![coverage; (advance_x * pixel_size).max(0) as usize],
                })
            })
            .clone();
        Some(glyph)
    }
}
