//! Transfer event data structures.

use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// A single observed transfer on the stream.
///
/// Events are immutable once ingested. Identity is the transaction `hash`;
/// ordering is by `timestamp`, with ties broken by first-insertion order
/// within the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEvent {
    /// Transaction hash identifying the event.
    pub hash: B256,
    /// Unix timestamp (seconds) at which the event was observed.
    pub timestamp: i64,
    /// Sender address.
    pub from: Address,
    /// Recipient address, or `None` for a contract creation.
    pub to: Option<Address>,
    /// Value transferred.
    pub value: U256,
    /// Gas limit of the transaction.
    pub gas: u64,
    /// Gas price of the transaction.
    pub gas_price: u128,
}

impl TransferEvent {
    /// Returns `true` if the event is a contract creation.
    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }
}
