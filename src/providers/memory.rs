//! An in-memory subscription registry.

use async_trait::async_trait;

use super::traits::{DataSourceError, SubscriptionRegistry};
use crate::models::KnownAddress;

/// A `SubscriptionRegistry` backed by a fixed, in-memory address list.
#[derive(Debug, Clone, Default)]
pub struct StaticSubscriptionRegistry {
    entries: Vec<KnownAddress>,
}

impl StaticSubscriptionRegistry {
    /// Creates a registry over the given addresses.
    pub fn new(entries: Vec<KnownAddress>) -> Self {
        Self { entries }
    }
}

#[async_trait]
impl SubscriptionRegistry for StaticSubscriptionRegistry {
    async fn list_known_addresses(&self) -> Result<Vec<KnownAddress>, DataSourceError> {
        Ok(self.entries.clone())
    }
}
