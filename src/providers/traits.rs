//! This module defines the interfaces for fetching stream data and listing
//! subscribed addresses.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{KnownAddress, TransferEvent};

/// Which side of an anchor a fetch walks toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchDirection {
    /// Toward events that happened before the anchor.
    Older,
    /// Toward events that happened after the anchor.
    Newer,
}

impl FetchDirection {
    /// The wire representation of the direction.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Older => "older",
            Self::Newer => "newer",
        }
    }
}

/// Custom error type for data source operations.
///
/// All variants are recoverable: a failed fetch mutates nothing and the
/// operation can be re-triggered by the caller.
#[derive(Error, Debug)]
pub enum DataSourceError {
    /// Error when building the stream URL.
    #[error("Failed to parse stream URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Error from the HTTP middleware stack (retries exhausted included).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest_middleware::Error),

    /// Error from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Error when decoding a stream response body.
    #[error("Failed to decode stream response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The stream backend answered with an unexpected status code.
    #[error("Stream backend returned status {0}")]
    UnexpectedStatus(u16),
}

/// A data source that can fetch pages of the event stream.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetches up to `limit` events adjacent to `anchor`, walking
    /// `direction`, that match `term`. An empty result is a legitimate
    /// terminal condition, not an error.
    async fn fetch_page(
        &self,
        term: &str,
        anchor: i64,
        direction: FetchDirection,
        limit: usize,
    ) -> Result<Vec<TransferEvent>, DataSourceError>;

    /// Fetches the single event just beyond `anchor` in `direction`, if any.
    /// Used as an adjacency probe to learn whether more data exists.
    async fn fetch_adjacent_event(
        &self,
        term: &str,
        anchor: i64,
        direction: FetchDirection,
    ) -> Result<Option<TransferEvent>, DataSourceError>;
}

/// A read-only registry of addresses the user is subscribed to.
///
/// Consulted only to seed default filter values; its absence or failure
/// must never block the stream itself.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SubscriptionRegistry: Send + Sync {
    /// Lists the known addresses, in subscription order.
    async fn list_known_addresses(&self) -> Result<Vec<KnownAddress>, DataSourceError>;
}
