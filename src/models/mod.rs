//! This module contains the data models for the event stream window.

pub mod event;
pub mod filter;
pub mod subscription;

pub use event::TransferEvent;
pub use filter::{
    FilterCondition, FilterDirection, FilterError, FilterId, FilterKind, FilterPredicate,
    FilterSet, PredicateUpdate,
};
pub use subscription::KnownAddress;
