//! Filter predicates and their compilation into a stream query term.
//!
//! A [`FilterSet`] is an ordered list of predicates combined conjunctively
//! into one query term of the form `direction:value[+direction:value...]`.
//! Two sets exist at any time: a *draft* under edit and the *active* set that
//! governs the current fetch term. Predicates are addressed by a stable
//! [`FilterId`] rather than a list index, so removing one entry never shifts
//! the identity of its neighbors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::subscription::KnownAddress;

/// The event field a predicate applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// Match on a source or destination address.
    Address,
    /// Match on the gas limit.
    Gas,
    /// Match on the gas price.
    GasPrice,
    /// Match on the transferred amount.
    Amount,
    /// Match on the transaction hash.
    Hash,
    /// Present but inactive. Skipped by compilation and rendering; removal
    /// is a separate, explicit list operation.
    Disabled,
}

impl FilterKind {
    /// Returns `true` for kinds whose value is a non-negative number.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Gas | Self::GasPrice | Self::Amount)
    }
}

/// Which side of a transfer an address predicate matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterDirection {
    /// The sending side of the transfer.
    Source,
    /// The receiving side of the transfer.
    Destination,
}

impl FilterDirection {
    /// The query-term segment prefix for this direction.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Source => "from",
            Self::Destination => "to",
        }
    }
}

/// The comparison a predicate applies to its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterCondition {
    /// Exact match.
    Equal,
    /// Exact mismatch.
    NotEqual,
    /// Substring match.
    Contains,
    /// Strictly less than.
    Less,
    /// Less than or equal.
    LessEqual,
    /// Strictly greater than.
    Greater,
    /// Greater than or equal.
    GreaterEqual,
}

impl FilterCondition {
    /// Returns `true` for conditions that require a numeric comparison.
    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            Self::Less | Self::LessEqual | Self::Greater | Self::GreaterEqual
        )
    }
}

/// Stable identifier of a predicate within its owning [`FilterSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterId(u64);

/// One filter predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPredicate {
    /// The field this predicate applies to.
    pub kind: FilterKind,
    /// The transfer side the predicate matches.
    pub direction: FilterDirection,
    /// The comparison applied to the value.
    pub condition: FilterCondition,
    /// The comparison value, or `None` if not yet entered.
    pub value: Option<String>,
}

impl FilterPredicate {
    /// Convenience constructor for an address predicate.
    pub fn address(
        direction: FilterDirection,
        condition: FilterCondition,
        value: Option<String>,
    ) -> Self {
        Self {
            kind: FilterKind::Address,
            direction,
            condition,
            value,
        }
    }

    /// Returns `true` if the predicate is marked present-but-inactive.
    pub fn is_disabled(&self) -> bool {
        self.kind == FilterKind::Disabled
    }
}

/// A partial update applied to an existing predicate. `None` fields are left
/// untouched.
#[derive(Debug, Clone, Default)]
pub struct PredicateUpdate {
    /// New direction, if changed.
    pub direction: Option<FilterDirection>,
    /// New condition, if changed.
    pub condition: Option<FilterCondition>,
    /// New value, if changed.
    pub value: Option<String>,
}

/// An error produced while validating a filter set at submit time.
///
/// Validation failures reject the submit; the draft is retained so the user
/// can correct it.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    /// An enabled predicate has no value.
    #[error("Filter predicate has no value")]
    MissingValue {
        /// The id of the offending predicate.
        id: FilterId,
    },

    /// A numeric predicate has a value that does not parse as a
    /// non-negative number.
    #[error("Invalid numeric value '{value}' for {kind:?} filter")]
    InvalidNumericValue {
        /// The predicate kind requiring a numeric value.
        kind: FilterKind,
        /// The rejected value.
        value: String,
    },

    /// An address predicate under an exact-match condition has a value that
    /// is not a `0x`-prefixed 20-byte hex string.
    #[error("Invalid address '{value}' for address filter")]
    InvalidAddress {
        /// The rejected value.
        value: String,
    },

    /// A hash predicate under an exact-match condition has a value that is
    /// not a `0x`-prefixed 32-byte hex string.
    #[error("Invalid transaction hash '{value}' for hash filter")]
    InvalidHash {
        /// The rejected value.
        value: String,
    },
}

/// An ordered set of filter predicates, conjunctively combined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    entries: Vec<(FilterId, FilterPredicate)>,
    next_id: u64,
    seeded: bool,
}

impl FilterSet {
    /// Creates an empty filter set. An empty set compiles to the empty term,
    /// meaning "no filter".
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set from an ordered list of predicates.
    pub fn from_predicates(predicates: impl IntoIterator<Item = FilterPredicate>) -> Self {
        let mut set = Self::new();
        for predicate in predicates {
            set.add(predicate);
        }
        set
    }

    /// Appends a predicate and returns its stable id.
    pub fn add(&mut self, predicate: FilterPredicate) -> FilterId {
        let id = FilterId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, predicate));
        id
    }

    /// Removes the predicate with the given id, returning it if present.
    pub fn remove(&mut self, id: FilterId) -> Option<FilterPredicate> {
        let position = self.entries.iter().position(|(entry_id, _)| *entry_id == id)?;
        Some(self.entries.remove(position).1)
    }

    /// Applies a partial update to the predicate with the given id. Returns
    /// `false` if no such predicate exists.
    pub fn update(&mut self, id: FilterId, update: PredicateUpdate) -> bool {
        let Some((_, predicate)) = self.entries.iter_mut().find(|(entry_id, _)| *entry_id == id)
        else {
            return false;
        };
        if let Some(direction) = update.direction {
            predicate.direction = direction;
        }
        if let Some(condition) = update.condition {
            predicate.condition = condition;
        }
        if let Some(value) = update.value {
            predicate.value = Some(value);
        }
        true
    }

    /// Returns the predicate with the given id, if present.
    pub fn get(&self, id: FilterId) -> Option<&FilterPredicate> {
        self.entries
            .iter()
            .find(|(entry_id, _)| *entry_id == id)
            .map(|(_, predicate)| predicate)
    }

    /// Iterates over `(id, predicate)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (FilterId, &FilterPredicate)> + '_ {
        self.entries.iter().map(|(id, predicate)| (*id, predicate))
    }

    /// The number of predicates, including disabled ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the set holds no predicates.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compiles the set into the canonical query term.
    ///
    /// Disabled predicates and predicates without a value are skipped; the
    /// remaining ones are joined as `"{direction}:{value}"` segments with
    /// `+`. An empty set compiles to the empty term.
    pub fn compile(&self) -> String {
        self.entries
            .iter()
            .filter(|(_, predicate)| !predicate.is_disabled())
            .filter_map(|(_, predicate)| {
                predicate
                    .value
                    .as_deref()
                    .map(|value| format!("{}:{}", predicate.direction.as_str(), value))
            })
            .collect::<Vec<_>>()
            .join("+")
    }

    /// Validates every enabled predicate against the shape its kind and
    /// condition expect. Called at submit time; a failure leaves the set
    /// untouched for correction.
    pub fn validate(&self) -> Result<(), FilterError> {
        for (id, predicate) in self.iter() {
            if predicate.is_disabled() {
                continue;
            }
            let Some(value) = predicate.value.as_deref() else {
                return Err(FilterError::MissingValue { id });
            };
            if predicate.kind.is_numeric()
                && (predicate.condition.is_ordering()
                    || matches!(
                        predicate.condition,
                        FilterCondition::Equal | FilterCondition::NotEqual
                    ))
                && value.parse::<u128>().is_err()
            {
                return Err(FilterError::InvalidNumericValue {
                    kind: predicate.kind,
                    value: value.to_string(),
                });
            }
            let exact = matches!(
                predicate.condition,
                FilterCondition::Equal | FilterCondition::NotEqual
            );
            if predicate.kind == FilterKind::Address && exact && !is_hex_bytes(value, 20) {
                return Err(FilterError::InvalidAddress {
                    value: value.to_string(),
                });
            }
            if predicate.kind == FilterKind::Hash && exact && !is_hex_bytes(value, 32) {
                return Err(FilterError::InvalidHash {
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Seeds the first predicate's value from the subscription registry.
    ///
    /// Applies at most once per set, only when the first predicate has no
    /// value yet and the registry is non-empty. Never overrides a
    /// user-entered value. Returns `true` if a value was seeded.
    pub fn seed_default(&mut self, known: &[KnownAddress]) -> bool {
        if self.seeded {
            return false;
        }
        let Some(first) = known.first() else {
            return false;
        };
        let Some((_, predicate)) = self.entries.first_mut() else {
            return false;
        };
        if predicate.value.is_some() {
            return false;
        }
        predicate.value = Some(first.address.clone());
        self.seeded = true;
        true
    }
}

/// Checks for a `0x`-prefixed hex string encoding exactly `bytes` bytes.
fn is_hex_bytes(value: &str, bytes: usize) -> bool {
    value
        .strip_prefix("0x")
        .map(|hex| hex.len() == bytes * 2 && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false)
}
