//! Issues and deduplicates asynchronous page fetches against the data
//! source.
//!
//! Every page fetch is identified by a structured [`FetchKey`]; a key
//! already issued for the current term is never fetched twice. A term change
//! bumps a generation counter and clears the issued keys, and every outcome
//! carries the generation it was issued under so stale results can be
//! discarded before they merge.

use std::collections::HashSet;
use std::sync::Arc;

use crate::models::TransferEvent;
use crate::providers::traits::{DataSource, DataSourceError, FetchDirection};

/// Canonical identity of one page fetch: term, direction, and time anchor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchKey {
    /// The compiled filter term the fetch was issued for.
    pub term: String,
    /// The direction walked from the anchor.
    pub direction: FetchDirection,
    /// The time anchor of the fetch.
    pub anchor: i64,
}

/// A fetched page plus the term generation it was issued under.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// Generation counter value at issue time.
    pub generation: u64,
    /// The fetched events, in the order the backend returned them.
    pub events: Vec<TransferEvent>,
}

/// An adjacency probe result plus the term generation it was issued under.
#[derive(Debug, Clone)]
pub struct AdjacentOutcome {
    /// Generation counter value at issue time.
    pub generation: u64,
    /// The event just beyond the probed edge, if one exists.
    pub event: Option<TransferEvent>,
}

/// Coordinates fetches for one stream window.
pub struct FetchCoordinator<D: DataSource + ?Sized> {
    source: Arc<D>,
    page_size: usize,
    generation: u64,
    issued: HashSet<FetchKey>,
    is_loading_initial: bool,
    is_loading_more: bool,
}

impl<D: DataSource + ?Sized> FetchCoordinator<D> {
    /// Creates a coordinator over the given data source.
    pub fn new(source: Arc<D>, page_size: usize) -> Self {
        Self {
            source,
            page_size,
            generation: 0,
            issued: HashSet::new(),
            is_loading_initial: false,
            is_loading_more: false,
        }
    }

    /// The current term generation. Outcomes whose generation no longer
    /// matches are stale and must be discarded.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns `true` while the initial page fetch is in flight.
    pub fn is_loading_initial(&self) -> bool {
        self.is_loading_initial
    }

    /// Returns `true` while an older/newer page fetch is in flight.
    pub fn is_loading_more(&self) -> bool {
        self.is_loading_more
    }

    /// Starts a new term: bumps the generation and forgets issued keys so
    /// every anchor is fetchable again under the new term.
    pub fn begin_term(&mut self, term: &str) -> u64 {
        self.generation += 1;
        self.issued.clear();
        self.is_loading_initial = false;
        self.is_loading_more = false;
        tracing::debug!(term, generation = self.generation, "Beginning new fetch term.");
        self.generation
    }

    /// Fetches the most recent page at the newest boundary anchor.
    pub async fn fetch_initial(
        &mut self,
        term: &str,
        end_time: i64,
    ) -> Result<FetchOutcome, DataSourceError> {
        let generation = self.generation;
        self.issued.insert(FetchKey {
            term: term.to_string(),
            direction: FetchDirection::Older,
            anchor: end_time,
        });
        self.is_loading_initial = true;
        let result = self
            .source
            .fetch_page(term, end_time, FetchDirection::Older, self.page_size)
            .await;
        self.is_loading_initial = false;
        match result {
            Ok(events) => {
                tracing::debug!(term, end_time, count = events.len(), "Initial page fetched.");
                Ok(FetchOutcome { generation, events })
            }
            Err(e) => {
                tracing::warn!(error = %e, term, end_time, "Initial page fetch failed.");
                self.release(term, FetchDirection::Older, end_time);
                Err(e)
            }
        }
    }

    /// Fetches the page of events just older than `before`. Returns
    /// `Ok(None)` without touching the data source if the same key was
    /// already issued for the current term.
    pub async fn fetch_older_page(
        &mut self,
        term: &str,
        before: i64,
    ) -> Result<Option<FetchOutcome>, DataSourceError> {
        self.fetch_page(term, before, FetchDirection::Older).await
    }

    /// Fetches the page of events just newer than `after`, with the same
    /// key deduplication as [`Self::fetch_older_page`].
    pub async fn fetch_newer_page(
        &mut self,
        term: &str,
        after: i64,
    ) -> Result<Option<FetchOutcome>, DataSourceError> {
        self.fetch_page(term, after, FetchDirection::Newer).await
    }

    async fn fetch_page(
        &mut self,
        term: &str,
        anchor: i64,
        direction: FetchDirection,
    ) -> Result<Option<FetchOutcome>, DataSourceError> {
        let key = FetchKey {
            term: term.to_string(),
            direction,
            anchor,
        };
        if !self.issued.insert(key) {
            tracing::debug!(term, anchor, direction = direction.as_str(), "Fetch already issued; skipping.");
            return Ok(None);
        }
        let generation = self.generation;
        self.is_loading_more = true;
        let result = self
            .source
            .fetch_page(term, anchor, direction, self.page_size)
            .await;
        self.is_loading_more = false;
        match result {
            Ok(events) => {
                tracing::debug!(
                    term,
                    anchor,
                    direction = direction.as_str(),
                    count = events.len(),
                    "Page fetched."
                );
                Ok(Some(FetchOutcome { generation, events }))
            }
            Err(e) => {
                tracing::warn!(error = %e, term, anchor, direction = direction.as_str(), "Page fetch failed.");
                // Release the key so the caller can re-trigger the fetch.
                self.release(term, direction, anchor);
                Err(e)
            }
        }
    }

    /// Issues an adjacency probe: a single-event lookup just beyond
    /// `anchor`. Probes are re-issued whenever the window's edge moves, so
    /// they are not key-deduplicated.
    pub async fn fetch_adjacent(
        &mut self,
        term: &str,
        anchor: i64,
        direction: FetchDirection,
    ) -> Result<AdjacentOutcome, DataSourceError> {
        let generation = self.generation;
        let event = self
            .source
            .fetch_adjacent_event(term, anchor, direction)
            .await?;
        Ok(AdjacentOutcome { generation, event })
    }

    /// The underlying data source, for test assertions.
    #[cfg(test)]
    pub(crate) fn source_for_tests(&self) -> Arc<D> {
        Arc::clone(&self.source)
    }

    fn release(&mut self, term: &str, direction: FetchDirection, anchor: i64) {
        self.issued.remove(&FetchKey {
            term: term.to_string(),
            direction,
            anchor,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::traits::MockDataSource;
    use crate::test_helpers::EventBuilder;
    use mockall::predicate::eq;

    fn one_event_page() -> Vec<TransferEvent> {
        vec![EventBuilder::new().seed(1).timestamp(100).build()]
    }

    #[tokio::test]
    async fn identical_keys_hit_the_source_once() {
        let mut source = MockDataSource::new();
        source
            .expect_fetch_page()
            .with(eq("from:0xaa"), eq(100), eq(FetchDirection::Older), eq(20))
            .times(1)
            .returning(|_, _, _, _| Ok(vec![]));
        let mut coordinator = FetchCoordinator::new(Arc::new(source), 20);

        let first = coordinator.fetch_older_page("from:0xaa", 100).await.unwrap();
        assert!(first.is_some());
        let second = coordinator.fetch_older_page("from:0xaa", 100).await.unwrap();
        assert!(second.is_none(), "duplicate key must not be re-fetched");
    }

    #[tokio::test]
    async fn distinct_anchors_are_separate_fetches() {
        let mut source = MockDataSource::new();
        source
            .expect_fetch_page()
            .times(2)
            .returning(|_, _, _, _| Ok(vec![]));
        let mut coordinator = FetchCoordinator::new(Arc::new(source), 20);

        assert!(coordinator.fetch_older_page("", 100).await.unwrap().is_some());
        assert!(coordinator.fetch_older_page("", 50).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn begin_term_clears_issued_keys_and_bumps_generation() {
        let mut source = MockDataSource::new();
        source
            .expect_fetch_page()
            .times(2)
            .returning(|_, _, _, _| Ok(vec![]));
        let mut coordinator = FetchCoordinator::new(Arc::new(source), 20);

        let outcome = coordinator.fetch_older_page("a", 100).await.unwrap().unwrap();
        assert_eq!(outcome.generation, 0);

        coordinator.begin_term("b");
        assert_eq!(coordinator.generation(), 1);

        // Same anchor is fetchable again under the new term.
        let outcome = coordinator.fetch_older_page("a", 100).await.unwrap().unwrap();
        assert_eq!(outcome.generation, 1);
    }

    #[tokio::test]
    async fn failure_releases_the_key_for_retry() {
        let mut source = MockDataSource::new();
        let mut failed = true;
        source.expect_fetch_page().times(2).returning(move |_, _, _, _| {
            if std::mem::take(&mut failed) {
                Err(DataSourceError::UnexpectedStatus(503))
            } else {
                Ok(vec![])
            }
        });
        let mut coordinator = FetchCoordinator::new(Arc::new(source), 20);

        let err = coordinator.fetch_older_page("", 100).await;
        assert!(err.is_err());
        assert!(!coordinator.is_loading_more(), "flag clears on failure");

        // The same key is retriggerable after a failure.
        let retry = coordinator.fetch_older_page("", 100).await.unwrap();
        assert!(retry.is_some());
    }

    #[tokio::test]
    async fn initial_fetch_returns_the_newest_page() {
        let mut source = MockDataSource::new();
        source
            .expect_fetch_page()
            .with(eq(""), eq(1_000), eq(FetchDirection::Older), eq(20))
            .times(1)
            .returning(|_, _, _, _| Ok(one_event_page()));
        let mut coordinator = FetchCoordinator::new(Arc::new(source), 20);

        let outcome = coordinator.fetch_initial("", 1_000).await.unwrap();
        assert_eq!(outcome.events.len(), 1);
        assert!(!coordinator.is_loading_initial());
    }

    #[tokio::test]
    async fn probes_are_not_deduplicated() {
        let mut source = MockDataSource::new();
        source
            .expect_fetch_adjacent_event()
            .times(2)
            .returning(|_, _, _| Ok(None));
        let mut coordinator = FetchCoordinator::new(Arc::new(source), 20);

        let first = coordinator
            .fetch_adjacent("", 100, FetchDirection::Older)
            .await
            .unwrap();
        assert!(first.event.is_none());
        coordinator
            .fetch_adjacent("", 100, FetchDirection::Older)
            .await
            .unwrap();
    }
}
