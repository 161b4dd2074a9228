//! Error types for the ingestor repository.

mod search_index_error;

pub use search_index_error::SearchIndexError;
