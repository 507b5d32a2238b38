//! Builder for `TransferEvent` test fixtures.

use alloy::primitives::{Address, B256, U256};

use crate::models::TransferEvent;

/// A builder for creating `TransferEvent` instances for testing.
#[derive(Debug, Clone)]
pub struct EventBuilder {
    event: TransferEvent,
}

impl Default for EventBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBuilder {
    /// Creates a builder with placeholder fields.
    pub fn new() -> Self {
        Self {
            event: TransferEvent {
                hash: B256::repeat_byte(0x11),
                timestamp: 0,
                from: Address::repeat_byte(0xaa),
                to: Some(Address::repeat_byte(0xbb)),
                value: U256::from(1_000_000u64),
                gas: 21_000,
                gas_price: 30_000_000_000,
            },
        }
    }

    /// Derives a unique hash from `seed`.
    pub fn seed(mut self, seed: u64) -> Self {
        self.event.hash = B256::from(U256::from(seed));
        self
    }

    /// Sets the event timestamp.
    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.event.timestamp = timestamp;
        self
    }

    /// Sets the sender address.
    pub fn from(mut self, from: Address) -> Self {
        self.event.from = from;
        self
    }

    /// Sets the recipient address.
    pub fn to(mut self, to: Address) -> Self {
        self.event.to = Some(to);
        self
    }

    /// Marks the event as a contract creation (no recipient).
    pub fn contract_creation(mut self) -> Self {
        self.event.to = None;
        self
    }

    /// Sets the transferred value.
    pub fn value(mut self, value: U256) -> Self {
        self.event.value = value;
        self
    }

    /// Sets the gas limit.
    pub fn gas(mut self, gas: u64) -> Self {
        self.event.gas = gas;
        self
    }

    /// Sets the gas price.
    pub fn gas_price(mut self, gas_price: u128) -> Self {
        self.event.gas_price = gas_price;
        self
    }

    /// Builds the event.
    pub fn build(self) -> TransferEvent {
        self.event
    }
}

/// Builds `count` events with distinct hashes and timestamps
/// `start, start + step, ...`, all from the default sender.
pub fn event_series(start: i64, step: i64, count: usize) -> Vec<TransferEvent> {
    (0..count)
        .map(|i| {
            EventBuilder::new()
                .seed(i as u64 + 1)
                .timestamp(start + step * i as i64)
                .build()
        })
        .collect()
}
