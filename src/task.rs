//! Coalesced pending-work record for the update pass.
//!
//! The layer never queues work; it records at most one instance of each
//! task kind per cycle. Requesting the same kind twice has no effect
//! beyond lowering the typeset start row to the minimum requested.

bitflags::bitflags! {
    /// Kinds of work pending for the next update pass.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct TaskFlags: u8 {
        /// Re-run the typesetter from [`PendingWork::take_typeset`]'s row.
        const TYPESET       = 0b001;
        /// Re-resolve every cell's glyph against the current base style.
        const RELOAD_GLYPHS = 0b010;
        /// The whole layer must be repainted.
        const REDRAW_ALL    = 0b100;
    }
}

/// Pending work, merged by a well-defined combine rule: boolean OR on the
/// flags, minimum over requested rows for the typeset start.
#[derive(Debug, Default)]
pub struct PendingWork {
    flags: TaskFlags,
    typeset_from: usize,
}

impl PendingWork {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a typeset pass starting at `row`.
    pub fn request_typeset(&mut self, row: usize) {
        if !self.flags.contains(TaskFlags::TYPESET) || row < self.typeset_from {
            self.typeset_from = row;
        }
        self.flags.insert(TaskFlags::TYPESET);
    }

    /// Request re-resolution of all glyphs.
    pub fn request_glyph_reload(&mut self) {
        self.flags.insert(TaskFlags::RELOAD_GLYPHS);
    }

    /// Request a full repaint.
    pub fn request_full_redraw(&mut self) {
        self.flags.insert(TaskFlags::REDRAW_ALL);
    }

    /// Whether a typeset pass is pending.
    pub fn typeset_needed(&self) -> bool {
        self.flags.contains(TaskFlags::TYPESET)
    }

    /// Whether a glyph reload is pending.
    pub fn glyph_reload_needed(&self) -> bool {
        self.flags.contains(TaskFlags::RELOAD_GLYPHS)
    }

    /// Clear the typeset request and return its start row, if one was pending.
    pub fn take_typeset(&mut self) -> Option<usize> {
        if !self.flags.contains(TaskFlags::TYPESET) {
            return None;
        }
        self.flags.remove(TaskFlags::TYPESET);
        let row = self.typeset_from;
        self.typeset_from = 0;
        Some(row)
    }

    /// Clear the glyph-reload request, returning whether one was pending.
    pub fn take_glyph_reload(&mut self) -> bool {
        let pending = self.flags.contains(TaskFlags::RELOAD_GLYPHS);
        self.flags.remove(TaskFlags::RELOAD_GLYPHS);
        pending
    }

    /// Clear the full-redraw request, returning whether one was pending.
    pub fn take_full_redraw(&mut self) -> bool {
        let pending = self.flags.contains(TaskFlags::REDRAW_ALL);
        self.flags.remove(TaskFlags::REDRAW_ALL);
        pending
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn typeset_requests_coalesce_to_minimum_row() {
        let mut work = PendingWork::new();
        work.request_typeset(7);
        work.request_typeset(3);
        work.request_typeset(12);
        assert_eq!(work.take_typeset(), Some(3));
        assert_eq!(work.take_typeset(), None);
    }

    #[test]
    fn typeset_row_resets_after_take() {
        let mut work = PendingWork::new();
        work.request_typeset(5);
        assert_eq!(work.take_typeset(), Some(5));
        // A fresh request after draining must not remember the old minimum.
        work.request_typeset(9);
        assert_eq!(work.take_typeset(), Some(9));
    }

    #[test]
    fn flags_are_independent() {
        let mut work = PendingWork::new();
        work.request_glyph_reload();
        work.request_full_redraw();
        assert!(!work.typeset_needed());
        assert!(work.take_glyph_reload());
        assert!(!work.take_glyph_reload());
        assert!(work.take_full_redraw());
        assert!(!work.take_full_redraw());
    }
}
