//! An ordered, deduplicated local store of fetched events.

use std::collections::HashSet;

use alloy::primitives::B256;

use crate::models::TransferEvent;

/// Holds one contiguous, gap-free ordered run of events for the current
/// active term.
///
/// Events are kept in non-decreasing timestamp order; ties keep
/// first-insertion order, with a merged page's internal order preserved.
/// Identity is the event hash, so re-fetching an overlapping range never
/// duplicates an event.
#[derive(Debug, Default)]
pub struct StreamCache {
    events: Vec<TransferEvent>,
    seen: HashSet<B256>,
}

impl StreamCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of cached events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if no events are cached.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Merges a fetched page into the cache, returning the number of events
    /// actually inserted.
    ///
    /// Idempotent: events whose hash is already cached are dropped. The page
    /// may arrive in either direction; it is sorted (stably) before merging
    /// so equal-timestamp events keep the page's own order and land after
    /// already-cached events with the same timestamp.
    pub fn merge(&mut self, page: Vec<TransferEvent>) -> usize {
        let mut fresh: Vec<TransferEvent> = Vec::with_capacity(page.len());
        for event in page {
            if self.seen.insert(event.hash) {
                fresh.push(event);
            }
        }
        if fresh.is_empty() {
            return 0;
        }
        fresh.sort_by_key(|event| event.timestamp);

        let inserted = fresh.len();
        let mut merged = Vec::with_capacity(self.events.len() + fresh.len());
        let mut existing = std::mem::take(&mut self.events).into_iter().peekable();
        let mut incoming = fresh.into_iter().peekable();
        loop {
            match (existing.peek(), incoming.peek()) {
                (Some(old), Some(new)) => {
                    // `<=` keeps cached events ahead of incoming ties.
                    if old.timestamp <= new.timestamp {
                        merged.push(existing.next().unwrap());
                    } else {
                        merged.push(incoming.next().unwrap());
                    }
                }
                (Some(_), None) => merged.push(existing.next().unwrap()),
                (None, Some(_)) => merged.push(incoming.next().unwrap()),
                (None, None) => break,
            }
        }
        self.events = merged;
        inserted
    }

    /// Returns the cached events at `[offset, offset + count)`, intersected
    /// with available data. Out-of-range input yields a shorter or empty
    /// slice, never a panic.
    pub fn slice(&self, offset: usize, count: usize) -> &[TransferEvent] {
        let start = offset.min(self.events.len());
        let end = offset.saturating_add(count).min(self.events.len());
        &self.events[start..end]
    }

    /// Timestamp of the oldest cached event, if any.
    pub fn oldest_timestamp(&self) -> Option<i64> {
        self.events.first().map(|event| event.timestamp)
    }

    /// Timestamp of the newest cached event, if any.
    pub fn newest_timestamp(&self) -> Option<i64> {
        self.events.last().map(|event| event.timestamp)
    }

    /// Drops all cached events. Called when the active term changes.
    pub fn reset(&mut self) {
        self.events.clear();
        self.seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::EventBuilder;

    fn events(timestamps: &[i64]) -> Vec<TransferEvent> {
        timestamps
            .iter()
            .enumerate()
            .map(|(i, &ts)| EventBuilder::new().seed(i as u64 + 1).timestamp(ts).build())
            .collect()
    }

    #[test]
    fn merge_keeps_slices_in_non_decreasing_order() {
        let mut cache = StreamCache::new();
        cache.merge(events(&[30, 10, 20]));
        cache.merge(
            (0..3)
                .map(|i| {
                    EventBuilder::new()
                        .seed(100 + i)
                        .timestamp(15 + i as i64 * 10)
                        .build()
                })
                .collect(),
        );

        for offset in 0..=cache.len() {
            for count in 0..=cache.len() + 2 {
                let slice = cache.slice(offset, count);
                assert!(
                    slice.windows(2).all(|w| w[0].timestamp <= w[1].timestamp),
                    "slice({offset}, {count}) out of order"
                );
            }
        }
    }

    #[test]
    fn merge_deduplicates_by_hash() {
        let mut cache = StreamCache::new();
        let page = events(&[10, 20, 30]);
        assert_eq!(cache.merge(page.clone()), 3);
        // Overlapping re-fetch: two old events plus one new.
        let mut overlap = page[1..].to_vec();
        overlap.push(EventBuilder::new().seed(99).timestamp(40).build());
        assert_eq!(cache.merge(overlap), 1);
        assert_eq!(cache.len(), 4);
    }

    #[test]
    fn merge_is_idempotent() {
        let mut cache = StreamCache::new();
        let page = events(&[10, 20]);
        cache.merge(page.clone());
        let before: Vec<_> = cache.slice(0, cache.len()).to_vec();
        assert_eq!(cache.merge(page), 0);
        assert_eq!(cache.slice(0, cache.len()), &before[..]);
    }

    #[test]
    fn equal_timestamps_keep_first_insertion_order() {
        let mut cache = StreamCache::new();
        let first = EventBuilder::new().seed(1).timestamp(10).build();
        let second = EventBuilder::new().seed(2).timestamp(10).build();
        cache.merge(vec![first.clone()]);
        cache.merge(vec![second.clone()]);
        assert_eq!(cache.slice(0, 2), &[first, second]);
    }

    #[test]
    fn slice_never_panics_on_out_of_range_input() {
        let mut cache = StreamCache::new();
        cache.merge(events(&[10, 20]));
        assert!(cache.slice(5, 10).is_empty());
        assert_eq!(cache.slice(1, usize::MAX).len(), 1);
        assert!(StreamCache::new().slice(0, 1).is_empty());
    }

    #[test]
    fn reset_forgets_hashes_too() {
        let mut cache = StreamCache::new();
        let page = events(&[10]);
        cache.merge(page.clone());
        cache.reset();
        assert_eq!(cache.len(), 0);
        // After a reset the same events are insertable again.
        assert_eq!(cache.merge(page), 1);
    }

    #[test]
    fn edge_timestamps_track_the_cached_run() {
        let mut cache = StreamCache::new();
        assert_eq!(cache.oldest_timestamp(), None);
        cache.merge(events(&[20, 10, 30]));
        assert_eq!(cache.oldest_timestamp(), Some(10));
        assert_eq!(cache.newest_timestamp(), Some(30));
    }
}
