//! A `DataSource` implementation that fetches stream pages from an HTTP
//! streams backend.

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use url::Url;

use super::traits::{DataSource, DataSourceError, FetchDirection};
use crate::config::HttpRetryConfig;
use crate::http_client::create_retryable_http_client;
use crate::models::TransferEvent;

/// Wire shape of a page response from the streams backend.
#[derive(Debug, Deserialize)]
struct EventsPage {
    events: Vec<TransferEvent>,
}

/// Wire shape of an adjacency probe response.
#[derive(Debug, Deserialize)]
struct AdjacentEvent {
    event: Option<TransferEvent>,
}

/// Fetches stream pages and adjacency probes over HTTP, with transient
/// errors retried by the middleware stack.
pub struct HttpStreamSource {
    client: ClientWithMiddleware,
    base_url: Url,
}

impl HttpStreamSource {
    /// Creates a new source against `base_url` with the given retry policy.
    pub fn new(base_url: Url, retry_config: &HttpRetryConfig) -> Self {
        let client = create_retryable_http_client(retry_config, reqwest::Client::new());
        Self { client, base_url }
    }

    /// Creates a source over an already-built middleware client.
    pub fn with_client(base_url: Url, client: ClientWithMiddleware) -> Self {
        Self { client, base_url }
    }

    fn endpoint(
        &self,
        path: &str,
        term: &str,
        anchor: i64,
        direction: FetchDirection,
    ) -> Result<Url, DataSourceError> {
        let mut url = self.base_url.join(path)?;
        url.query_pairs_mut()
            .append_pair("q", term)
            .append_pair("anchor", &anchor.to_string())
            .append_pair("direction", direction.as_str());
        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
    ) -> Result<T, DataSourceError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DataSourceError::UnexpectedStatus(status.as_u16()));
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl DataSource for HttpStreamSource {
    #[tracing::instrument(skip(self), level = "debug")]
    async fn fetch_page(
        &self,
        term: &str,
        anchor: i64,
        direction: FetchDirection,
        limit: usize,
    ) -> Result<Vec<TransferEvent>, DataSourceError> {
        let mut url = self.endpoint("streams/events", term, anchor, direction)?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        let page: EventsPage = self.get_json(url).await?;
        tracing::debug!(count = page.events.len(), "Fetched stream page.");
        Ok(page.events)
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn fetch_adjacent_event(
        &self,
        term: &str,
        anchor: i64,
        direction: FetchDirection,
    ) -> Result<Option<TransferEvent>, DataSourceError> {
        let url = self.endpoint("streams/adjacent", term, anchor, direction)?;
        let adjacent: AdjacentEvent = self.get_json(url).await?;
        Ok(adjacent.event)
    }
}
