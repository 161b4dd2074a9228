//! # Ingestor Repository
//!
//! This crate provides traits and implementations for the bulk ingestor's
//! write sink. It includes definitions for errors, the provider interface,
//! and a concrete implementation for OpenSearch covering the index-template,
//! index-create/settings, and bulk-write APIs.

pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod types;

pub use errors::SearchIndexError;
pub use interfaces::SearchIndexProvider;
pub use opensearch::{IndexConfig, OpenSearchProvider, DEFAULT_INDEX_NAME};
pub use types::{BulkItemFailure, BulkWriteSummary};
