//! Pixel-space geometry primitives and dirty-region accumulation.

/// A point in layer-local pixel space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Point {
    /// Horizontal position in pixels.
    pub x: i32,
    /// Vertical position in pixels.
    pub y: i32,
}

impl Point {
    /// Create a new point.
    #[inline]
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle in layer-local pixel space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    /// Left edge in pixels.
    pub x: i32,
    /// Top edge in pixels.
    pub y: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

impl Rect {
    /// Create a new rectangle.
    #[inline]
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the rectangle has zero (or negative) area.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Whether `other` lies entirely within this rectangle.
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.x + other.width <= self.x + self.width
            && other.y + other.height <= self.y + self.height
    }

    /// Clamp this rectangle to the area `(0, 0, width, height)`.
    ///
    /// Used to restrict a caller-supplied draw area to the layer's
    /// actual content bounds.
    pub fn clamp_to(&self, width: i32, height: i32) -> Rect {
        let x = self.x.max(0);
        let y = self.y.max(0);
        let right = (self.x + self.width).min(width);
        let bottom = (self.y + self.height).min(height);
        Rect::new(x, y, (right - x).max(0), (bottom - y).max(0))
    }
}

/// Accumulator for invalidated screen regions.
///
/// Rectangles are appended as mutations invalidate row geometry and
/// drained by the caller once per update cycle. The set is unordered;
/// rectangles fully covered by an already-recorded one are dropped,
/// and recording a rectangle drops any previous entries it covers.
#[derive(Debug, Default)]
pub struct DirtyRegions {
    rects: Vec<Rect>,
}

impl DirtyRegions {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an invalidated rectangle. Empty rectangles are ignored.
    pub fn add(&mut self, rect: Rect) {
        if rect.is_empty() {
            return;
        }
        if self.rects.iter().any(|r| r.contains(&rect)) {
            return;
        }
        self.rects.retain(|r| !rect.contains(r));
        self.rects.push(rect);
    }

    /// Number of recorded rectangles.
    pub fn len(&self) -> usize {
        self.rects.len()
    }

    /// Whether no rectangles are recorded.
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Take all recorded rectangles, leaving the accumulator empty.
    pub fn drain(&mut self) -> Vec<Rect> {
        std::mem::take(&mut self.rects)
    }
}

/// Horizontal alignment of rows within the layer width.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextAlign {
    /// Rows start at x = 0.
    #[default]
    Left,
    /// Rows are centered within the layer width.
    Center,
    /// Rows end at the layer's right edge.
    Right,
}
