//! One styled code point and its resolved glyph reference.

use crate::font::{FontSource, Glyph, ANY_FONT};
use crate::style::{StyleCache, StyleId, TextStyle};
use std::sync::Arc;

/// A single character cell: code point, optional inline-style reference,
/// and the shared glyph resolved for it.
///
/// The cell never owns its glyph bitmap; the font collaborator manages
/// glyph lifetime and the cell holds a shared handle. A cell without a
/// glyph is valid: it contributes zero width and is skipped by metrics
/// and drawing, but still occupies a logical column.
#[derive(Debug, Clone)]
pub struct CharCell {
    /// The Unicode code point this cell renders.
    pub code_point: char,
    /// Inline style reference into the layer's style cache, if any.
    pub style: Option<StyleId>,
    /// Resolved glyph, shared with the font collaborator's cache.
    pub glyph: Option<Arc<Glyph>>,
}

impl CharCell {
    /// Create an unresolved cell.
    pub fn new(code_point: char, style: Option<StyleId>) -> Self {
        Self {
            code_point,
            style,
            glyph: None,
        }
    }

    /// Horizontal advance; zero when no glyph is resolved.
    #[inline]
    pub fn advance_x(&self) -> i32 {
        self.glyph.as_ref().map_or(0, |g| g.advance_x)
    }

    /// Vertical advance; zero when no glyph is resolved.
    #[inline]
    pub fn advance_y(&self) -> i32 {
        self.glyph.as_ref().map_or(0, |g| g.advance_y)
    }

    /// (Re-)resolve this cell's glyph.
    ///
    /// The cell's style override supplies the font list and pixel size
    /// when present, else the layer's base style does. Each listed font
    /// is tried in order, then [`ANY_FONT`] as the last resort.
    pub(crate) fn resolve_glyph(
        &mut self,
        base: &TextStyle,
        styles: &StyleCache,
        fonts: &dyn FontSource,
    ) {
        let mut font_ids = base.font_ids.as_slice();
        let mut size = base.pixel_size;
        if let Some(style) = self.style.and_then(|id| styles.get(id)) {
            if let Some(ids) = &style.font_ids {
                font_ids = ids.as_slice();
            }
            if let Some(px) = style.pixel_size {
                size = px;
            }
        }
        for &id in font_ids {
            if let Some(glyph) = fonts.glyph(self.code_point, id, size) {
                self.glyph = Some(glyph);
                return;
            }
        }
        self.glyph = fonts.glyph(self.code_point, ANY_FONT, size);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::font::FontId;
    use crate::style::{FontIds, StyleOverride};
    use std::sync::Mutex;

    /// Records every (font_id, pixel_size) request; only `serves` succeeds.
    struct Probe {
        serves: FontId,
        requests: Mutex<Vec<(FontId, i32)>>,
    }

    impl Probe {
        fn new(serves: FontId) -> Self {
            Self {
                serves,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    impl FontSource for Probe {
        fn glyph(&self, _c: char, font_id: FontId, pixel_size: i32) -> Option<Arc<Glyph>> {
            self.requests.lock().unwrap().push((font_id, pixel_size));
            if font_id != self.serves {
                return None;
            }
            Some(Arc::new(Glyph {
                advance_x: 8,
                advance_y: pixel_size,
                bearing_left: 0,
                bearing_top: pixel_size * 4 / 5,
                width: 8,
                height: pixel_size,
                buffer: vec![0xFF; 8 * pixel_size as usize],
            }))
        }
    }

    #[test]
    fn resolve_tries_base_fonts_then_any() {
        let fonts = Probe::new(ANY_FONT);
        let mut base = TextStyle::default();
        base.font_ids = FontIds::from_slice(&[3, 7]);
        base.pixel_size = 16;
        let styles = StyleCache::new();

        let mut cell = CharCell::new('x', None);
        cell.resolve_glyph(&base, &styles, &fonts);

        assert!(cell.glyph.is_some());
        let requests = fonts.requests.lock().unwrap();
        assert_eq!(requests.as_slice(), &[(3, 16), (7, 16), (ANY_FONT, 16)]);
    }

    #[test]
    fn resolve_stops_at_first_hit() {
        let fonts = Probe::new(7);
        let mut base = TextStyle::default();
        base.font_ids = FontIds::from_slice(&[3, 7, 9]);
        let styles = StyleCache::new();

        let mut cell = CharCell::new('x', None);
        cell.resolve_glyph(&base, &styles, &fonts);

        let requests = fonts.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].0, 7);
    }

    #[test]
    fn style_override_replaces_fonts_and_size() {
        let fonts = Probe::new(5);
        let base = TextStyle::default();
        let mut styles = StyleCache::new();
        let id = styles.push(StyleOverride {
            font_ids: Some(FontIds::from_slice(&[5])),
            pixel_size: Some(32),
            color: None,
        });

        let mut cell = CharCell::new('x', Some(id));
        cell.resolve_glyph(&base, &styles, &fonts);

        assert!(cell.glyph.is_some());
        let requests = fonts.requests.lock().unwrap();
        assert_eq!(requests.as_slice(), &[(5, 32)]);
    }

    #[test]
    fn unresolved_cell_has_zero_advance() {
        let cell = CharCell::new('x', None);
        assert_eq!(cell.advance_x(), 0);
        assert_eq!(cell.advance_y(), 0);
    }
}
