//! Data source and subscription registry interfaces and implementations.

pub mod http;
pub mod memory;
pub mod traits;

pub use http::HttpStreamSource;
pub use memory::StaticSubscriptionRegistry;
pub use traits::{DataSource, DataSourceError, FetchDirection, SubscriptionRegistry};
