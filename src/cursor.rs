//! The movable window cursor over the logical (filtered) stream.

use std::ops::Range;

/// Maintains the visible slice boundaries and decides when more data is
/// needed.
///
/// `position` counts events back from the newest edge of the stream: at 0
/// the window shows the most recent page, and advancing "older" moves it
/// toward the oldest cached event. The cache itself stores events oldest to
/// newest, so the visible range is computed from the cache's tail.
#[derive(Debug)]
pub struct WindowCursor {
    cursor: usize,
    page_size: usize,
    prefetch_pages: usize,
}

impl WindowCursor {
    /// Creates a cursor anchored at the newest edge.
    pub fn new(page_size: usize, prefetch_pages: usize) -> Self {
        Self {
            cursor: 0,
            page_size,
            prefetch_pages,
        }
    }

    /// Offset of the window from the newest edge, in events.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// The constant page size.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns `true` when the window is within the look-ahead margin of the
    /// cache's trailing (oldest) edge: `cursor >= cache_len - prefetch_pages
    /// * page_size`. The margin exists to hide fetch latency by prefetching
    /// before the edge is visually reached.
    pub fn needs_backfill(&self, cache_len: usize) -> bool {
        self.cursor + self.prefetch_pages * self.page_size >= cache_len
    }

    /// Moves the window one page toward older events, clamped so the visible
    /// slice never becomes empty. When the remaining tail is shorter than a
    /// page the slice simply returns the remainder. Returns `true` if the
    /// cursor moved.
    pub fn advance_older(&mut self, cache_len: usize) -> bool {
        let next = self.cursor + self.page_size;
        if next < cache_len {
            self.cursor = next;
            true
        } else {
            false
        }
    }

    /// Moves the window one page back toward the newest edge, saturating at
    /// 0. Returns `true` if the cursor moved; `false` means the window is
    /// already at the leading edge and newer data must be fetched instead.
    pub fn advance_newer(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor = self.cursor.saturating_sub(self.page_size);
        true
    }

    /// The cache index range currently visible, oldest to newest.
    pub fn visible_range(&self, cache_len: usize) -> Range<usize> {
        let end = cache_len.saturating_sub(self.cursor);
        let start = end.saturating_sub(self.page_size);
        start..end
    }

    /// Re-anchors the window at the newest edge. Called when the active term
    /// changes.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backfill_triggers_exactly_at_the_margin() {
        let page = 20;
        let mut cursor = WindowCursor::new(page, 2);
        let len = 100;
        // needs_backfill <=> cursor >= len - 2 * page.
        for position in [0, 20, 40, 59] {
            cursor.cursor = position;
            assert_eq!(cursor.needs_backfill(len), position >= len - 2 * page);
        }
        cursor.cursor = 60;
        assert!(cursor.needs_backfill(len));
    }

    #[test]
    fn backfill_margin_respects_prefetch_pages() {
        let mut cursor = WindowCursor::new(10, 3);
        cursor.cursor = 9;
        assert!(!cursor.needs_backfill(40));
        cursor.cursor = 10;
        assert!(cursor.needs_backfill(40));
    }

    #[test]
    fn advance_older_clamps_at_the_cache_tail() {
        let mut cursor = WindowCursor::new(20, 2);
        assert!(cursor.advance_older(50));
        assert_eq!(cursor.position(), 20);
        assert!(cursor.advance_older(50));
        assert_eq!(cursor.position(), 40);
        // Only 10 events remain beyond the window; no further advance.
        assert!(!cursor.advance_older(50));
        assert_eq!(cursor.position(), 40);
        assert_eq!(cursor.visible_range(50), 0..10);
    }

    #[test]
    fn advance_older_on_short_cache_shows_remainder() {
        let mut cursor = WindowCursor::new(20, 2);
        assert!(!cursor.advance_older(15));
        assert_eq!(cursor.visible_range(15), 0..15);
    }

    #[test]
    fn advance_newer_saturates_at_the_leading_edge() {
        let mut cursor = WindowCursor::new(20, 2);
        cursor.advance_older(100);
        cursor.advance_older(100);
        assert_eq!(cursor.position(), 40);
        assert!(cursor.advance_newer());
        assert!(cursor.advance_newer());
        assert_eq!(cursor.position(), 0);
        assert!(!cursor.advance_newer());
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn visible_range_tracks_the_newest_edge() {
        let mut cursor = WindowCursor::new(20, 2);
        assert_eq!(cursor.visible_range(100), 80..100);
        cursor.advance_older(100);
        assert_eq!(cursor.visible_range(100), 60..80);
        // A newer-page merge growing the cache shifts the same window.
        assert_eq!(cursor.visible_range(120), 80..100);
    }

    #[test]
    fn reset_reanchors_at_newest() {
        let mut cursor = WindowCursor::new(20, 2);
        cursor.advance_older(100);
        cursor.reset();
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.visible_range(100), 80..100);
    }

    #[test]
    fn empty_cache_yields_empty_range() {
        let cursor = WindowCursor::new(20, 2);
        assert_eq!(cursor.visible_range(0), 0..0);
        assert!(cursor.needs_backfill(0));
    }
}
