//! Interface definitions for the ingestor repository.

mod search_index_provider;

pub use search_index_provider::SearchIndexProvider;
