//! Incremental styled text layout and reflow.
//!
//! `glyphline` keeps a mutable, styled text buffer laid out as rows and
//! re-typesets it incrementally: edits touch only the rows they change,
//! a coalesced update pass re-wraps from the first dirty row, and every
//! geometry change is tracked as dirty pixel rectangles for minimal
//! repaints. Glyph rasterization, markup-tag syntax, and final
//! compositing live behind the [`FontSource`], [`TagScanner`], and
//! [`Surface`] traits.
//!
//! # Example
//!
//! ```
//! use glyphline::{LineHeight, MonoFonts, TextLayer};
//! use std::sync::Arc;
//!
//! let mut layer = TextLayer::new(Arc::new(MonoFonts::new()));
//! layer.set_multiline(true);
//! layer.set_autowrap(true);
//! layer.set_fixed_size(50, 100);
//! layer.set_line_height(LineHeight::Px(16));
//!
//! layer.append_text("Hello\nWorld", None).unwrap();
//! let dirty = layer.update().unwrap();
//!
//! assert_eq!(layer.row_count(), 2);
//! assert_eq!(layer.len(), 11);
//! assert!(!dirty.is_empty());
//! ```

pub mod cell;
pub mod draw;
pub mod font;
pub mod geometry;
pub mod layer;
pub mod row;
pub mod style;
pub mod task;

pub use cell::CharCell;
pub use draw::{AlphaSurface, Surface};
pub use font::{FontId, FontSource, Glyph, MonoFonts, ANY_FONT};
pub use geometry::{DirtyRegions, Point, Rect, TextAlign};
pub use layer::{Caret, LayerError, TextLayer};
pub use row::{LineHeight, Row, RowList, Terminator};
pub use style::{Color, FontIds, StyleCache, StyleId, StyleOverride, TagScanner, TextStyle};
pub use task::{PendingWork, TaskFlags};
