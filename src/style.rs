//! Text styles, the inline style cache, and the markup-tag seam.

use crate::font::FontId;
use smallvec::SmallVec;

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    /// Red component (0-255).
    pub r: u8,
    /// Green component (0-255).
    pub g: u8,
    /// Blue component (0-255).
    pub b: u8,
    /// Alpha component (0-255).
    pub a: u8,
}

impl Color {
    /// Opaque black.
    pub const BLACK: Self = Self::new(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::new(255, 255, 255);

    /// Create an opaque color from RGB components.
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

/// Short inline list of font IDs, tried in order when resolving a glyph.
pub type FontIds = SmallVec<[FontId; 4]>;

/// The layer's base text style: every field is concrete.
///
/// Inline overrides from markup are layered on top of this per cell;
/// see [`StyleOverride`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextStyle {
    /// Font faces to try in order. Empty means "any available font".
    pub font_ids: FontIds,
    /// Base glyph pixel size; also the floor for empty-row text height.
    pub pixel_size: i32,
    /// Foreground color used when a cell has no color override.
    pub color: Color,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_ids: FontIds::new(),
            pixel_size: 14,
            color: Color::BLACK,
        }
    }
}

/// A resolved inline style produced while scanning markup tags.
///
/// Only the overridden fields are set; everything else falls back to
/// the layer's [`TextStyle`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleOverride {
    /// Font family override.
    pub font_ids: Option<FontIds>,
    /// Pixel size override.
    pub pixel_size: Option<i32>,
    /// Foreground color override.
    pub color: Option<Color>,
}

/// Index of an entry in a [`StyleCache`].
///
/// Cells hold a `StyleId` instead of a reference so the cache can be
/// cleared or reallocated without dangling access; a stale id after a
/// clear simply resolves to no entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StyleId(u32);

/// Owned collection of resolved inline styles.
///
/// Entries are appended while scanning markup and freed only when the
/// layer is cleared or dropped; they are not individually collected.
/// Tags opened and never closed therefore accumulate entries for the
/// session, which is an accepted trade-off.
#[derive(Debug, Default)]
pub struct StyleCache {
    entries: Vec<StyleOverride>,
}

impl StyleCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resolved style, returning its id.
    pub fn push(&mut self, style: StyleOverride) -> StyleId {
        let id = StyleId(self.entries.len() as u32);
        self.entries.push(style);
        id
    }

    /// Look up a style by id. Stale ids (from before a clear) return `None`.
    pub fn get(&self, id: StyleId) -> Option<&StyleOverride> {
        self.entries.get(id.0 as usize)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry, invalidating all outstanding ids.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Markup-tag recognition collaborator.
///
/// The engine only asks where tags begin and end and what style is in
/// effect after each one; tag syntax and tag-to-style resolution live
/// behind this trait. Both scan methods receive the full code-point
/// sequence and the current scan position and return the position just
/// past the tag on a match.
pub trait TagScanner {
    /// Try to consume a closing tag at `pos`.
    fn scan_closing_tag(&mut self, input: &[char], pos: usize) -> Option<usize>;

    /// Try to consume an opening tag at `pos`.
    fn scan_opening_tag(&mut self, input: &[char], pos: usize) -> Option<usize>;

    /// The style resolved from the currently open tags.
    fn current_style(&self) -> StyleOverride;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn cache_push_assigns_sequential_ids() {
        let mut cache = StyleCache::new();
        let a = cache.push(StyleOverride::default());
        let b = cache.push(StyleOverride {
            pixel_size: Some(24),
            ..StyleOverride::default()
        });
        assert_ne!(a, b);
        assert_eq!(cache.get(b).unwrap().pixel_size, Some(24));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn clear_invalidates_ids() {
        let mut cache = StyleCache::new();
        let id = cache.push(StyleOverride {
            color: Some(Color::WHITE),
            ..StyleOverride::default()
        });
        cache.clear();
        assert!(cache.get(id).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn default_style_has_any_font_fallback() {
        let style = TextStyle::default();
        assert!(style.font_ids.is_empty());
        assert!(style.pixel_size > 0);
    }
}
