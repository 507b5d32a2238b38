//! Subscription registry entries.

use serde::{Deserialize, Serialize};

/// An address the user is subscribed to, as reported by the subscription
/// registry. Used only to seed default filter values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownAddress {
    /// The subscribed address, in `0x`-prefixed hex form.
    pub address: String,
    /// Human-readable label attached to the subscription.
    pub label: String,
}
