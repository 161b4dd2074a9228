//! Search index provider trait definition.
//!
//! This module defines the abstract interface for the ingestor's write sink,
//! allowing for different backend implementations (OpenSearch, Elasticsearch,
//! etc.) and mock providers in tests.

use async_trait::async_trait;

use crate::errors::SearchIndexError;
use crate::types::BulkWriteSummary;
use ingestor_shared::{DocumentIdentity, PersonDocument};

/// Abstracts the underlying search index implementation.
///
/// The ingestion pipeline treats the search engine purely as a write sink:
/// an index-template API, an index-create/settings API, and a bulk-write API.
/// Implementations are injected into the loader to enable dependency
/// injection and easy testing with mocks.
///
/// # Index lifecycle
///
/// Call order during a run is `ping` → `apply_template` → `create_index`
/// (write-optimized settings) → repeated `bulk_upsert` → `restore_settings`
/// (read-optimized settings).
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Check that the backend is reachable.
    ///
    /// Called once before ingestion starts; a failure here aborts the run
    /// before any records are processed.
    async fn ping(&self) -> Result<(), SearchIndexError>;

    /// Apply the index template for the person document mapping.
    async fn apply_template(&self) -> Result<(), SearchIndexError>;

    /// Create the index with write-optimized settings.
    ///
    /// Idempotent: an "already exists" response from the backend is success,
    /// not failure, so interrupted runs can be resumed against the same
    /// index.
    async fn create_index(&self) -> Result<(), SearchIndexError>;

    /// Submit one batch of documents as a single bulk request.
    ///
    /// Each document becomes one upsert-by-id action keyed by its
    /// deterministic identity. Returns a per-item summary; a transport-level
    /// failure is returned as `Err` instead.
    ///
    /// # Arguments
    ///
    /// * `batch` - Identity/document pairs to write
    async fn bulk_upsert(
        &self,
        batch: &[(DocumentIdentity, PersonDocument)],
    ) -> Result<BulkWriteSummary, SearchIndexError>;

    /// Restore read-optimized index settings after bulk load completes.
    async fn restore_settings(&self) -> Result<(), SearchIndexError>;
}
