//! A set of helpers for testing

mod event;
mod source;

pub use event::{event_series, EventBuilder};
pub use source::InMemoryStreamSource;
