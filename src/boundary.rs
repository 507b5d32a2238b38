//! Tracks the known extent of the event stream for the active filter term.

use serde::{Deserialize, Serialize};

/// The known edges of the addressable stream for one filter term.
///
/// `start_time` and `end_time` are the absolute outer bounds (chain genesis
/// and "now") anchoring the very first fetch. `previous_event_time` and
/// `next_event_time` mark whether at least one more older/newer event exists
/// beyond the current cache; their presence is the sole "more data" signal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamBoundary {
    /// Oldest addressable time for the stream, if established.
    pub start_time: Option<i64>,
    /// Newest addressable time for the stream, if established.
    pub end_time: Option<i64>,
    /// Timestamp of the first event older than the cache, if one exists.
    pub previous_event_time: Option<i64>,
    /// Timestamp of the first event newer than the cache, if one exists.
    pub next_event_time: Option<i64>,
}

/// Maintains the [`StreamBoundary`] from default anchors and adjacency
/// probe observations.
#[derive(Debug, Default)]
pub struct BoundaryTracker {
    boundary: StreamBoundary,
}

impl BoundaryTracker {
    /// Creates a tracker with no boundary known.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once the outer anchors have been established.
    pub fn is_established(&self) -> bool {
        self.boundary.start_time.is_some() && self.boundary.end_time.is_some()
    }

    /// Establishes the outer fetch anchors. Applies only while neither end
    /// is known; later calls leave the boundary untouched.
    pub fn set_default(&mut self, genesis: i64, now: i64) -> &StreamBoundary {
        if self.boundary.start_time.is_none() && self.boundary.end_time.is_none() {
            self.boundary.start_time = Some(genesis);
            self.boundary.end_time = Some(now);
            tracing::debug!(genesis, now, "Established default stream boundary.");
        }
        &self.boundary
    }

    /// Records the result of an older-side adjacency probe. `None` is the
    /// terminal condition for "no older events".
    pub fn observe_previous(&mut self, timestamp: Option<i64>) {
        self.boundary.previous_event_time = timestamp;
    }

    /// Records the result of a newer-side adjacency probe.
    pub fn observe_next(&mut self, timestamp: Option<i64>) {
        self.boundary.next_event_time = timestamp;
    }

    /// Returns `true` if at least one event older than the cache exists.
    pub fn has_older(&self) -> bool {
        self.boundary.previous_event_time.is_some()
    }

    /// Returns `true` if at least one event newer than the cache exists.
    pub fn has_newer(&self) -> bool {
        self.boundary.next_event_time.is_some()
    }

    /// The current boundary snapshot.
    pub fn boundary(&self) -> &StreamBoundary {
        &self.boundary
    }

    /// Clears all knowledge of the stream extent. Called when the active
    /// term changes.
    pub fn reset(&mut self) {
        self.boundary = StreamBoundary::default();
    }
}
