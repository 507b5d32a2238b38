#![warn(missing_docs)]
//! Eventscope keeps a bounded, navigable window over an unbounded,
//! time-ordered stream of blockchain transfer events. It fetches pages
//! incrementally from a backend, merges them into a stable local cache, and
//! re-derives the visible slice whenever the active filter term changes.

pub mod boundary;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod cursor;
pub mod http_client;
pub mod models;
pub mod providers;
pub mod test_helpers;
pub mod window;
