//! Rendering seam: the surface a layer draws onto.
//!
//! The engine computes glyph placement; compositing lives behind
//! [`Surface`]. Hosts with a real framebuffer implement the trait;
//! [`AlphaSurface`] is a self-contained implementation for tests and
//! headless use.

use crate::font::Glyph;
use crate::geometry::{Point, Rect};
use crate::style::Color;

/// A pixel target for glyph compositing.
pub trait Surface {
    /// Blend one glyph's coverage bitmap at `pos` (its top-left corner)
    /// with the given foreground color. Implementations clip.
    fn blend(&mut self, pos: Point, glyph: &Glyph, color: Color);

    /// Fill a rectangle with a solid color. Implementations clip.
    fn fill(&mut self, rect: Rect, color: Color);
}

/// An owned RGBA buffer with max-coverage alpha blending.
///
/// Blending keeps the higher coverage value per pixel and writes the
/// foreground color wherever the incoming coverage wins, which is
/// enough to assert glyph placement and clipping in tests.
#[derive(Debug, Clone)]
pub struct AlphaSurface {
    width: i32,
    height: i32,
    pixels: Vec<(Color, u8)>,
}

impl AlphaSurface {
    /// Create a transparent surface of the given size.
    pub fn new(width: i32, height: i32) -> Self {
        let len = (width.max(0) * height.max(0)) as usize;
        Self {
            width: width.max(0),
            height: height.max(0),
            pixels: vec![(Color::BLACK, 0); len],
        }
    }

    /// Surface width in pixels.
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Surface height in pixels.
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Coverage at a pixel; zero outside the surface.
    pub fn alpha_at(&self, x: i32, y: i32) -> u8 {
        self.index(x, y).map_or(0, |i| self.pixels[i].1)
    }

    /// Color at a pixel, if it has any coverage.
    pub fn color_at(&self, x: i32, y: i32) -> Option<Color> {
        let i = self.index(x, y)?;
        let (color, alpha) = self.pixels[i];
        (alpha > 0).then_some(color)
    }

    /// Whether any pixel inside `rect` has coverage.
    pub fn any_coverage(&self, rect: Rect) -> bool {
        for y in rect.y..rect.y + rect.height {
            for x in rect.x..rect.x + rect.width {
                if self.alpha_at(x, y) > 0 {
                    return true;
                }
            }
        }
        false
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        Some((y * self.width + x) as usize)
    }
}

impl Surface for AlphaSurface {
    fn blend(&mut self, pos: Point, glyph: &Glyph, color: Color) {
        for row in 0..glyph.height {
            for col in 0..glyph.width {
                let coverage = glyph
                    .buffer
                    .get((row * glyph.width + col) as usize)
                    .copied()
                    .unwrap_or(0);
                if coverage == 0 {
                    continue;
                }
                if let Some(i) = self.index(pos.x + col, pos.y + row) {
                    let (_, existing) = self.pixels[i];
                    if coverage >= existing {
                        self.pixels[i] = (color, coverage);
                    }
                }
            }
        }
    }

    fn fill(&mut self, rect: Rect, color: Color) {
        let rect = rect.clamp_to(self.width, self.height);
        for y in rect.y..rect.y + rect.height {
            for x in rect.x..rect.x + rect.width {
                if let Some(i) = self.index(x, y) {
                    self.pixels[i] = (color, color.a);
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn solid_glyph(size: i32) -> Glyph {
        Glyph {
            advance_x: size,
            advance_y: size,
            bearing_left: 0,
            bearing_top: size,
            width: size,
            height: size,
            buffer: vec![0xFF; (size * size) as usize],
        }
    }

    #[test]
    fn blend_writes_color_and_coverage() {
        let mut surface = AlphaSurface::new(16, 16);
        surface.blend(Point::new(2, 3), &solid_glyph(4), Color::WHITE);

        assert_eq!(surface.alpha_at(2, 3), 0xFF);
        assert_eq!(surface.alpha_at(5, 6), 0xFF);
        assert_eq!(surface.alpha_at(6, 3), 0);
        assert_eq!(surface.color_at(3, 4), Some(Color::WHITE));
    }

    #[test]
    fn blend_clips_at_surface_edges() {
        let mut surface = AlphaSurface::new(8, 8);
        surface.blend(Point::new(-2, -2), &solid_glyph(4), Color::WHITE);
        surface.blend(Point::new(6, 6), &solid_glyph(4), Color::WHITE);

        assert_eq!(surface.alpha_at(0, 0), 0xFF);
        assert_eq!(surface.alpha_at(7, 7), 0xFF);
        assert_eq!(surface.alpha_at(4, 4), 0);
    }

    #[test]
    fn fill_covers_clamped_rect() {
        let mut surface = AlphaSurface::new(8, 8);
        surface.fill(Rect::new(6, 6, 10, 10), Color::new(9, 9, 9));

        assert_eq!(surface.color_at(7, 7), Some(Color::new(9, 9, 9)));
        assert_eq!(surface.alpha_at(5, 5), 0);
    }

    #[test]
    fn zero_coverage_pixels_stay_transparent() {
        let mut surface = AlphaSurface::new(8, 8);
        let mut glyph = solid_glyph(2);
        glyph.buffer = vec![0x00; 4];
        surface.blend(Point::new(1, 1), &glyph, Color::WHITE);
        assert!(!surface.any_coverage(Rect::new(0, 0, 8, 8)));
    }
}
