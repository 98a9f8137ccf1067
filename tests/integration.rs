//! End-to-end scenarios exercising the public surface: text editing,
//! reflow, markup tags, and drawing through the collaborator traits.

#![allow(clippy::unwrap_used)]

use glyphline::{
    AlphaSurface, Caret, Color, LineHeight, MonoFonts, Point, Rect, StyleOverride, TagScanner,
    Terminator, TextLayer, TextStyle,
};
use std::sync::Arc;

/// 10px-advance grid: MonoFonts at 20px yields advance 10 per narrow
/// glyph.
fn grid_layer() -> TextLayer {
    let mut layer = TextLayer::new(Arc::new(MonoFonts::new()));
    layer.set_style(TextStyle {
        pixel_size: 20,
        ..TextStyle::default()
    });
    layer.set_line_height(LineHeight::Px(24));
    layer
}

#[test]
fn append_with_explicit_newline_produces_two_rows() {
    let mut layer = grid_layer();
    layer.append_text("Hello\nWorld", None).unwrap();
    let dirty = layer.update().unwrap();

    assert_eq!(layer.row_count(), 2);
    assert_eq!(layer.len(), 11);
    assert_eq!(layer.row(0).unwrap().terminator(), Terminator::Lf);
    assert_eq!(layer.row(1).unwrap().terminator(), Terminator::None);
    assert_eq!(layer.get_text(0, 11), "HelloWorld");
    assert!(!dirty.is_empty());
}

#[test]
fn twelve_glyphs_wrap_into_five_five_two() {
    let mut layer = grid_layer();
    layer.set_multiline(true);
    layer.set_autowrap(true);
    layer.set_fixed_size(50, 0);
    layer.append_text("AAAAAAAAAAAA", None).unwrap();
    layer.update().unwrap();

    let lens: Vec<usize> = (0..layer.row_count())
        .map(|i| layer.row_len(i).unwrap())
        .collect();
    assert_eq!(lens, vec![5, 5, 2]);
}

#[test]
fn editing_session_stays_consistent_across_updates() {
    let mut layer = grid_layer();
    layer.set_multiline(true);
    layer.set_autowrap(true);
    layer.set_fixed_size(60, 0);

    layer.insert_text("one two three four", None).unwrap();
    layer.update().unwrap();
    assert!(layer.row_count() > 1);

    layer.backspace(5).unwrap();
    layer.update().unwrap();
    layer.insert_text("5!", None).unwrap();
    layer.update().unwrap();

    assert_eq!(layer.len(), 15);
    for i in 0..layer.row_count() {
        assert!(layer.row(i).unwrap().width() <= 60);
    }
    // Logical content survives the reflows
    assert_eq!(layer.get_text(0, layer.len()), "one two three5!");
}

/// Minimal `[red]...[/red]` markup recognizer.
struct BracketTags {
    depth: usize,
}

impl TagScanner for BracketTags {
    fn scan_closing_tag(&mut self, input: &[char], pos: usize) -> Option<usize> {
        if input[pos..].starts_with(&['[', '/', 'r', 'e', 'd', ']']) {
            self.depth = self.depth.saturating_sub(1);
            Some(pos + 6)
        } else {
            None
        }
    }

    fn scan_opening_tag(&mut self, input: &[char], pos: usize) -> Option<usize> {
        if input[pos..].starts_with(&['[', 'r', 'e', 'd', ']']) {
            self.depth += 1;
            Some(pos + 5)
        } else {
            None
        }
    }

    fn current_style(&self) -> StyleOverride {
        if self.depth > 0 {
            StyleOverride {
                color: Some(Color::new(255, 0, 0)),
                ..StyleOverride::default()
            }
        } else {
            StyleOverride::default()
        }
    }
}

#[test]
fn markup_tags_style_cells_without_emitting_characters() {
    let mut layer = grid_layer();
    layer.set_style_tags_enabled(true);
    let mut tags = BracketTags { depth: 0 };
    layer.append_text("a[red]b[/red]c", Some(&mut tags)).unwrap();

    assert_eq!(layer.len(), 3);
    let row = layer.row(0).unwrap();
    assert_eq!(row.len(), 3);

    let cells = row.cells();
    assert!(cells[0].style.is_none());
    let red = cells[1].style.expect("styled cell");
    assert_eq!(
        layer.style_cache().get(red).unwrap().color,
        Some(Color::new(255, 0, 0))
    );
    let plain = cells[2].style.expect("re-resolved after close");
    assert_eq!(layer.style_cache().get(plain).unwrap().color, None);
}

#[test]
fn tags_are_plain_text_when_disabled() {
    let mut layer = grid_layer();
    let mut tags = BracketTags { depth: 0 };
    layer.append_text("[red]x", Some(&mut tags)).unwrap();
    assert_eq!(layer.len(), 6);
    assert_eq!(layer.get_text(0, 6), "[red]x");
}

#[test]
fn clear_invalidates_style_ids() {
    let mut layer = grid_layer();
    layer.set_style_tags_enabled(true);
    let mut tags = BracketTags { depth: 0 };
    layer.append_text("[red]x", Some(&mut tags)).unwrap();
    let id = layer.row(0).unwrap().cells()[0].style.unwrap();

    layer.clear_text();
    assert!(layer.style_cache().get(id).is_none());
}

#[test]
fn draw_places_glyphs_on_the_baseline() {
    let mut layer = grid_layer();
    layer.set_fixed_size(100, 50);
    layer.append_text("A B", None).unwrap();
    layer.update().unwrap();

    let mut surface = AlphaSurface::new(100, 50);
    layer.draw(Rect::new(0, 0, 100, 50), Point::new(0, 0), &mut surface);

    // 20px glyph centered in a 24px row: bitmap spans y = 2..22
    assert_eq!(surface.alpha_at(0, 2), 0xFF);
    assert_eq!(surface.alpha_at(9, 21), 0xFF);
    assert_eq!(surface.alpha_at(0, 0), 0);
    // The space advances the pen but paints nothing
    assert!(!surface.any_coverage(Rect::new(10, 0, 10, 50)));
    assert!(surface.any_coverage(Rect::new(20, 0, 10, 50)));
    assert_eq!(surface.color_at(0, 2), Some(Color::BLACK));
}

#[test]
fn draw_clips_to_the_requested_area() {
    let mut layer = grid_layer();
    layer.set_fixed_size(100, 50);
    layer.append_text("AAAAAAAAAA", None).unwrap();
    layer.update().unwrap();

    let mut surface = AlphaSurface::new(100, 50);
    layer.draw(Rect::new(0, 0, 35, 50), Point::new(0, 0), &mut surface);

    assert!(surface.any_coverage(Rect::new(0, 0, 35, 50)));
    // Drawing stops shortly past the area's right edge
    assert!(!surface.any_coverage(Rect::new(50, 0, 50, 50)));
}

#[test]
fn caret_round_trips_through_pixel_space() {
    let mut layer = grid_layer();
    layer.append_text("abc\ndefg", None).unwrap();
    layer.update().unwrap();

    layer.set_caret(1, 2);
    let pos = layer.caret_pixel_pos();
    layer.set_caret(0, 0);
    layer.set_caret_by_pixel(pos.x + 1, pos.y + 1);
    assert_eq!(layer.caret(), Caret { row: 1, col: 2 });
}
