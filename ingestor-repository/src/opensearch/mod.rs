//! OpenSearch backend implementation.

pub mod index_config;
mod provider;

pub use index_config::{IndexConfig, DEFAULT_INDEX_NAME};
pub use provider::OpenSearchProvider;
