//! Error types for the ingestion pipeline.
//!
//! Fatal startup errors (`SourceUnavailable`, `SchemaValidation`) abort before
//! any records are processed. `TruncatedInput` and `BulkWrite` are
//! pipeline-fatal once processing has started. Per-record errors (malformed
//! JSON, bad CSV rows) never appear here - they are counted, logged, and
//! skipped inside the decoders.

use thiserror::Error;

/// Errors that can occur in the ingestion pipeline.
#[derive(Error, Debug)]
pub enum IngestError {
    /// The source could not be opened: missing path, failed storage fetch,
    /// or malformed storage URI.
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// CSV header validation failed (a required column is missing).
    #[error("Schema validation error: {0}")]
    SchemaValidation(String),

    /// The input ended before its framing was complete (e.g. a JSON array
    /// without its closing bracket).
    #[error("Truncated input: {0}")]
    TruncatedInput(String),

    /// A fatal read error while decoding the stream.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Channel communication error.
    #[error("Channel error: {0}")]
    Channel(String),

    /// A bulk write failed after all retry attempts were exhausted.
    #[error("Bulk write error: {0}")]
    BulkWrite(String),
}

impl IngestError {
    /// Create a source-unavailable error.
    pub fn source_unavailable(msg: impl Into<String>) -> Self {
        Self::SourceUnavailable(msg.into())
    }

    /// Create a schema validation error.
    pub fn schema_validation(msg: impl Into<String>) -> Self {
        Self::SchemaValidation(msg.into())
    }

    /// Create a truncated-input error.
    pub fn truncated_input(msg: impl Into<String>) -> Self {
        Self::TruncatedInput(msg.into())
    }

    /// Create a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a channel error.
    pub fn channel(msg: impl Into<String>) -> Self {
        Self::Channel(msg.into())
    }

    /// Create a bulk write error.
    pub fn bulk_write(msg: impl Into<String>) -> Self {
        Self::BulkWrite(msg.into())
    }
}
