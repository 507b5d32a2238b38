//! The stream window manager.
//!
//! [`StreamWindow`] composes the filter model, boundary tracker, stream
//! cache, window cursor, and fetch coordinator behind the view-facing
//! interface. All mutation happens through `&mut self` methods on one
//! logical thread; only data-source calls suspend. Callers driving the
//! window from parallel threads must wrap it in a mutex (single-writer
//! discipline).

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use crate::boundary::BoundaryTracker;
use crate::cache::StreamCache;
use crate::config::WindowConfig;
use crate::coordinator::{AdjacentOutcome, FetchCoordinator, FetchOutcome};
use crate::cursor::WindowCursor;
use crate::models::filter::{FilterError, FilterId, FilterPredicate, FilterSet, PredicateUpdate};
use crate::models::TransferEvent;
use crate::providers::traits::{
    DataSource, DataSourceError, FetchDirection, SubscriptionRegistry,
};

/// Lifecycle of the window, driven by explicit events rather than
/// incidental recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPhase {
    /// No boundary known yet; nothing fetched.
    Uninitialized,
    /// Outer anchors established; initial fetch not yet complete.
    BoundaryEstablished,
    /// Initial page and adjacency probes have been reconciled.
    Initialized,
}

/// Errors surfaced by window commands.
#[derive(Debug, Error)]
pub enum StreamWindowError {
    /// The draft filter set failed validation; the draft is retained for
    /// correction.
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// A fetch failed. Recoverable: no data was mutated and the command can
    /// be re-triggered.
    #[error("Data source error: {0}")]
    Source(#[from] DataSourceError),

    /// A navigation command was issued before `initialize` completed.
    #[error("The stream window has not been initialized")]
    NotInitialized,
}

/// Snapshot handed to the view layer.
#[derive(Debug, Clone)]
pub struct StreamView {
    /// The events in the visible window, newest first.
    pub visible_events: Vec<TransferEvent>,
    /// `true` while the initial page fetch is in flight.
    pub is_loading_initial: bool,
    /// `true` while an older/newer page fetch is in flight.
    pub is_loading_more: bool,
    /// `true` if at least one event older than the cache exists.
    pub has_older: bool,
    /// `true` if at least one event newer than the cache exists.
    pub has_newer: bool,
    /// The compiled term of the active filter set.
    pub active_filter_term: String,
}

/// Keeps a bounded, contiguous slice of the event stream synchronized with
/// a movable cursor.
///
/// The active filter set is a constructor input, threaded explicitly rather
/// than read from ambient state. The active set, boundary, and cache are
/// kept mutually consistent: any active-term change resets the boundary,
/// cache, cursor, and fetch bookkeeping before a new fetch is issued.
pub struct StreamWindow<D: DataSource + ?Sized> {
    config: WindowConfig,
    active: FilterSet,
    draft: FilterSet,
    term: String,
    phase: WindowPhase,
    boundary: BoundaryTracker,
    cache: StreamCache,
    cursor: WindowCursor,
    coordinator: FetchCoordinator<D>,
}

impl<D: DataSource + ?Sized> StreamWindow<D> {
    /// Creates a window over `source` governed by the given active filter
    /// set. The draft starts as a copy of the active set.
    pub fn new(source: Arc<D>, config: WindowConfig, active: FilterSet) -> Self {
        let term = active.compile();
        let cursor = WindowCursor::new(config.page_size, config.prefetch_pages);
        let coordinator = FetchCoordinator::new(source, config.page_size);
        Self {
            draft: active.clone(),
            active,
            term,
            phase: WindowPhase::Uninitialized,
            boundary: BoundaryTracker::new(),
            cache: StreamCache::new(),
            cursor,
            coordinator,
            config,
        }
    }

    /// The current lifecycle phase.
    pub fn phase(&self) -> WindowPhase {
        self.phase
    }

    /// The compiled term of the active filter set.
    pub fn active_term(&self) -> &str {
        &self.term
    }

    /// The draft filter set under edit.
    pub fn draft(&self) -> &FilterSet {
        &self.draft
    }

    /// Establishes the default boundary and performs the initial fetch and
    /// adjacency probes. Idempotent once initialized.
    pub async fn initialize(&mut self) -> Result<(), StreamWindowError> {
        if self.phase == WindowPhase::Initialized {
            return Ok(());
        }
        if !self.boundary.is_established() {
            let now = self
                .config
                .default_end_time
                .unwrap_or_else(|| Utc::now().timestamp());
            self.boundary.set_default(self.config.genesis_time, now);
            self.phase = WindowPhase::BoundaryEstablished;
        }
        let end = self.end_anchor();
        let term = self.term.clone();
        let outcome = self.coordinator.fetch_initial(&term, end).await?;
        self.reconcile_page(outcome);
        self.refresh_probes().await?;
        self.phase = WindowPhase::Initialized;
        Ok(())
    }

    /// Validates the draft and promotes it to the active set, resetting the
    /// window for the new term. On validation failure the draft is retained
    /// and nothing else changes.
    pub async fn submit_filter(&mut self) -> Result<(), StreamWindowError> {
        self.draft.validate()?;
        self.active = self.draft.clone();
        let term = self.active.compile();
        self.apply_term(term).await
    }

    /// Removes a predicate from the active set and immediately resubmits the
    /// recompiled term. The removal is mirrored into the draft. Unknown ids
    /// are ignored.
    pub async fn remove_active_filter(&mut self, id: FilterId) -> Result<(), StreamWindowError> {
        if self.active.remove(id).is_none() {
            return Ok(());
        }
        self.draft.remove(id);
        let term = self.active.compile();
        self.apply_term(term).await
    }

    /// Moves the window one page toward older events, backfilling the cache
    /// once the look-ahead margin is reached. A no-op when no older events
    /// exist beyond the cache and the cached tail is already visible.
    pub async fn request_older(&mut self) -> Result<(), StreamWindowError> {
        if self.phase != WindowPhase::Initialized {
            return Err(StreamWindowError::NotInitialized);
        }
        self.cursor.advance_older(self.cache.len());
        if !self.cursor.needs_backfill(self.cache.len()) {
            return Ok(());
        }
        if !self.boundary.has_older() {
            tracing::debug!("No events older than the cache; skipping backfill.");
            return Ok(());
        }
        let anchor = self.cache.oldest_timestamp().unwrap_or(self.end_anchor());
        let term = self.term.clone();
        if let Some(outcome) = self.coordinator.fetch_older_page(&term, anchor).await? {
            self.reconcile_page(outcome);
            // The merge may have moved the trailing edge; re-probe it.
            let probe_anchor = self.cache.oldest_timestamp().unwrap_or(anchor);
            let probe = self
                .coordinator
                .fetch_adjacent(&term, probe_anchor, FetchDirection::Older)
                .await?;
            self.reconcile_probe(probe, FetchDirection::Older);
        }
        Ok(())
    }

    /// Moves the window one page toward newer events. At the leading edge
    /// this fetches events immediately after the newest cached one;
    /// idempotent when no newer events exist.
    pub async fn request_newer(&mut self) -> Result<(), StreamWindowError> {
        if self.phase != WindowPhase::Initialized {
            return Err(StreamWindowError::NotInitialized);
        }
        if self.cursor.advance_newer() {
            return Ok(());
        }
        if !self.boundary.has_newer() {
            return Ok(());
        }
        let anchor = self.cache.newest_timestamp().unwrap_or(self.end_anchor());
        let term = self.term.clone();
        if let Some(outcome) = self.coordinator.fetch_newer_page(&term, anchor).await? {
            self.reconcile_page(outcome);
            let probe_anchor = self.cache.newest_timestamp().unwrap_or(anchor);
            let probe = self
                .coordinator
                .fetch_adjacent(&term, probe_anchor, FetchDirection::Newer)
                .await?;
            self.reconcile_probe(probe, FetchDirection::Newer);
        }
        Ok(())
    }

    /// Appends a predicate to the draft, returning its stable id. No
    /// external effect until [`Self::submit_filter`].
    pub fn add_draft_predicate(&mut self, predicate: FilterPredicate) -> FilterId {
        self.draft.add(predicate)
    }

    /// Removes a predicate from the draft.
    pub fn remove_draft_predicate(&mut self, id: FilterId) {
        self.draft.remove(id);
    }

    /// Applies a partial update to a draft predicate.
    pub fn update_draft_predicate(&mut self, id: FilterId, update: PredicateUpdate) -> bool {
        self.draft.update(id, update)
    }

    /// Seeds the draft's first empty predicate value from the subscription
    /// registry. Registry failures are logged and ignored; they must never
    /// block the stream. Returns `true` if a value was seeded.
    pub async fn seed_draft_default<R>(&mut self, registry: &R) -> bool
    where
        R: SubscriptionRegistry + ?Sized,
    {
        match registry.list_known_addresses().await {
            Ok(known) => self.draft.seed_default(&known),
            Err(e) => {
                tracing::warn!(error = %e, "Subscription registry unavailable; skipping default seeding.");
                false
            }
        }
    }

    /// The snapshot the view layer renders from.
    pub fn view(&self) -> StreamView {
        let range = self.cursor.visible_range(self.cache.len());
        let mut visible = self
            .cache
            .slice(range.start, range.end - range.start)
            .to_vec();
        visible.reverse();
        StreamView {
            visible_events: visible,
            is_loading_initial: self.coordinator.is_loading_initial(),
            is_loading_more: self.coordinator.is_loading_more(),
            has_older: self.boundary.has_older(),
            has_newer: self.boundary.has_newer(),
            active_filter_term: self.term.clone(),
        }
    }

    /// Installs `term` as the active term: resets cache, boundary, cursor,
    /// and fetch bookkeeping, then re-initializes. The reset lands before
    /// any fetch for the new term, and the generation bump guarantees that
    /// in-flight results for the old term can never merge.
    async fn apply_term(&mut self, term: String) -> Result<(), StreamWindowError> {
        tracing::info!(term = %term, "Applying new active filter term.");
        self.term = term;
        self.cache.reset();
        self.boundary.reset();
        self.cursor.reset();
        self.coordinator.begin_term(&self.term);
        self.phase = WindowPhase::Uninitialized;
        self.initialize().await
    }

    /// Merges a fetched page, unless it is stale (issued under a previous
    /// term). Stale outcomes are dropped silently; they never reach the
    /// view.
    fn reconcile_page(&mut self, outcome: FetchOutcome) {
        if outcome.generation != self.coordinator.generation() {
            tracing::debug!(
                stale_generation = outcome.generation,
                active_generation = self.coordinator.generation(),
                "Discarding stale page fetch."
            );
            return;
        }
        let inserted = self.cache.merge(outcome.events);
        tracing::debug!(inserted, cache_len = self.cache.len(), "Merged page into stream cache.");
    }

    /// Applies an adjacency probe to the boundary, unless stale. Probes are
    /// reconciled only after the page merge they describe.
    fn reconcile_probe(&mut self, outcome: AdjacentOutcome, direction: FetchDirection) {
        if outcome.generation != self.coordinator.generation() {
            tracing::debug!(
                stale_generation = outcome.generation,
                "Discarding stale adjacency probe."
            );
            return;
        }
        let timestamp = outcome.event.map(|event| event.timestamp);
        match direction {
            FetchDirection::Older => self.boundary.observe_previous(timestamp),
            FetchDirection::Newer => self.boundary.observe_next(timestamp),
        }
    }

    /// Re-issues both adjacency probes against the cache's current edges.
    async fn refresh_probes(&mut self) -> Result<(), StreamWindowError> {
        let end = self.end_anchor();
        let older_anchor = self.cache.oldest_timestamp().unwrap_or(end);
        let newer_anchor = self.cache.newest_timestamp().unwrap_or(end);
        let term = self.term.clone();
        let previous = self
            .coordinator
            .fetch_adjacent(&term, older_anchor, FetchDirection::Older)
            .await?;
        self.reconcile_probe(previous, FetchDirection::Older);
        let next = self
            .coordinator
            .fetch_adjacent(&term, newer_anchor, FetchDirection::Newer)
            .await?;
        self.reconcile_probe(next, FetchDirection::Newer);
        Ok(())
    }

    fn end_anchor(&self) -> i64 {
        self.boundary
            .boundary()
            .end_time
            .unwrap_or(self.config.genesis_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{event_series, InMemoryStreamSource};

    fn window_over(
        events: Vec<TransferEvent>,
        config: WindowConfig,
    ) -> StreamWindow<InMemoryStreamSource> {
        StreamWindow::new(
            Arc::new(InMemoryStreamSource::new(events)),
            config,
            FilterSet::new(),
        )
    }

    fn small_config() -> WindowConfig {
        WindowConfig {
            page_size: 5,
            prefetch_pages: 2,
            genesis_time: 0,
            default_end_time: Some(10_000),
            ..WindowConfig::default()
        }
    }

    #[tokio::test]
    async fn stale_page_outcome_never_merges_into_a_new_term() {
        let mut window = window_over(event_series(100, 10, 30), small_config());
        window.initialize().await.unwrap();
        assert_eq!(window.cache.len(), 5);

        // Issue a fetch for the current term, then change the term before
        // the outcome is reconciled.
        let term = window.term.clone();
        let anchor = window.cache.oldest_timestamp().unwrap();
        let stale = window
            .coordinator
            .fetch_older_page(&term, anchor)
            .await
            .unwrap()
            .unwrap();

        window
            .apply_term("from:0x0000000000000000000000000000000000000000".to_string())
            .await
            .unwrap();
        let len_after_reset = window.cache.len();
        assert_eq!(len_after_reset, 0, "no events match the new term");

        window.reconcile_page(stale);
        assert_eq!(window.cache.len(), len_after_reset, "stale page was merged");
    }

    #[tokio::test]
    async fn stale_probe_never_moves_the_boundary() {
        let mut window = window_over(event_series(100, 10, 30), small_config());
        window.initialize().await.unwrap();

        let term = window.term.clone();
        let stale = window
            .coordinator
            .fetch_adjacent(&term, 10_000, FetchDirection::Older)
            .await
            .unwrap();
        assert!(stale.event.is_some());

        window
            .apply_term("from:0x0000000000000000000000000000000000000000".to_string())
            .await
            .unwrap();
        assert!(!window.boundary.has_older());

        window.reconcile_probe(stale, FetchDirection::Older);
        assert!(
            !window.boundary.has_older(),
            "stale probe reported older data for the wrong term"
        );
    }

    #[tokio::test]
    async fn term_change_resets_cache_boundary_and_cursor() {
        let mut window = window_over(event_series(100, 10, 30), small_config());
        window.initialize().await.unwrap();
        window.request_older().await.unwrap();
        assert!(window.cursor.position() > 0 || window.cache.len() > 5);

        let generation_before = window.coordinator.generation();
        window.apply_term(String::new()).await.unwrap();
        assert_eq!(window.cursor.position(), 0);
        assert!(window.coordinator.generation() > generation_before);
        // Freshly re-initialized for the (re-)applied term.
        assert_eq!(window.phase(), WindowPhase::Initialized);
        assert_eq!(window.cache.len(), 5);
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let mut window = window_over(event_series(100, 10, 8), small_config());
        window.initialize().await.unwrap();
        let calls_after_first = window.coordinator_source().page_calls().len();
        window.initialize().await.unwrap();
        assert_eq!(window.coordinator_source().page_calls().len(), calls_after_first);
    }
}

#[cfg(test)]
impl StreamWindow<crate::test_helpers::InMemoryStreamSource> {
    fn coordinator_source(&self) -> Arc<crate::test_helpers::InMemoryStreamSource> {
        self.coordinator.source_for_tests()
    }
}
