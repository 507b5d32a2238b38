//! An in-memory `DataSource` over a fixed stream, for integration tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::coordinator::FetchKey;
use crate::models::TransferEvent;
use crate::providers::traits::{DataSource, DataSourceError, FetchDirection};

/// A `DataSource` backed by a fixed in-memory stream.
///
/// Understands the `from:`/`to:` segments of compiled filter terms, records
/// every page fetch for call-count assertions, and can be told to fail the
/// next page fetch to exercise error recovery.
pub struct InMemoryStreamSource {
    events: Vec<TransferEvent>,
    page_calls: Mutex<Vec<FetchKey>>,
    fail_next: AtomicBool,
}

impl InMemoryStreamSource {
    /// Creates a source over the given events, sorted by timestamp.
    pub fn new(mut events: Vec<TransferEvent>) -> Self {
        events.sort_by_key(|event| event.timestamp);
        Self {
            events,
            page_calls: Mutex::new(Vec::new()),
            fail_next: AtomicBool::new(false),
        }
    }

    /// Every page fetch issued so far, in order.
    pub fn page_calls(&self) -> Vec<FetchKey> {
        self.page_calls.lock().unwrap().clone()
    }

    /// Makes the next `fetch_page` call fail with a transport-style error.
    pub fn fail_next_fetch(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    fn matches(event: &TransferEvent, term: &str) -> bool {
        if term.is_empty() {
            return true;
        }
        term.split('+').all(|segment| {
            let Some((direction, value)) = segment.split_once(':') else {
                return false;
            };
            let wanted = value.to_lowercase();
            match direction {
                "from" => format!("{:#x}", event.from) == wanted,
                "to" => event
                    .to
                    .map(|to| format!("{to:#x}") == wanted)
                    .unwrap_or(false),
                _ => false,
            }
        })
    }

    fn matching<'a>(&'a self, term: &'a str) -> impl Iterator<Item = &'a TransferEvent> + 'a {
        self.events
            .iter()
            .filter(move |event| Self::matches(event, term))
    }
}

#[async_trait]
impl DataSource for InMemoryStreamSource {
    async fn fetch_page(
        &self,
        term: &str,
        anchor: i64,
        direction: FetchDirection,
        limit: usize,
    ) -> Result<Vec<TransferEvent>, DataSourceError> {
        self.page_calls.lock().unwrap().push(FetchKey {
            term: term.to_string(),
            direction,
            anchor,
        });
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(DataSourceError::UnexpectedStatus(503));
        }
        let page = match direction {
            FetchDirection::Older => {
                let older: Vec<_> = self
                    .matching(term)
                    .filter(|event| event.timestamp < anchor)
                    .cloned()
                    .collect();
                let skip = older.len().saturating_sub(limit);
                older.into_iter().skip(skip).collect()
            }
            FetchDirection::Newer => self
                .matching(term)
                .filter(|event| event.timestamp > anchor)
                .take(limit)
                .cloned()
                .collect(),
        };
        Ok(page)
    }

    async fn fetch_adjacent_event(
        &self,
        term: &str,
        anchor: i64,
        direction: FetchDirection,
    ) -> Result<Option<TransferEvent>, DataSourceError> {
        let event = match direction {
            FetchDirection::Older => self
                .matching(term)
                .filter(|event| event.timestamp < anchor)
                .last()
                .cloned(),
            FetchDirection::Newer => self
                .matching(term)
                .find(|event| event.timestamp > anchor)
                .cloned(),
        };
        Ok(event)
    }
}
