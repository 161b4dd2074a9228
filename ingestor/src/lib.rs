//! # Ingestor
//!
//! Bulk ingestion pipeline for semi-structured person records - streams
//! heterogeneous sources (JSON arrays, bare object streams, CSV) into an
//! OpenSearch index at sustained high throughput.
//!
//! ## Architecture
//!
//! The ingestor follows a producer / worker-pool / loader pattern:
//!
//! 1. **Source**: Turns a source descriptor into one sequential byte stream
//! 2. **Decoder**: Sniffs the framing and lazily yields raw records
//! 3. **Transform**: Maps raw records into canonical person documents
//! 4. **Loader**: Batches documents and submits retrying bulk upserts
//! 5. **Pipeline**: Bounded queue, worker pool, cancellation, progress
//!
//! ## Modules
//!
//! - [`cli`]: Command-line interface definition
//! - [`config`]: Configuration from environment and flags
//! - [`counters`]: Shared atomic run counters
//! - [`decoder`]: Format sniffer and streaming record decoders
//! - [`errors`]: Error types for the ingestion pipeline
//! - [`loader`]: Batching and retrying bulk submission
//! - [`pipeline`]: Worker pool, scheduling, and progress reporting
//! - [`source`]: Source descriptor parsing and byte-stream opening
//! - [`transform`]: Raw record to canonical document transformation

pub mod cli;
pub mod config;
pub mod counters;
pub mod decoder;
pub mod errors;
pub mod loader;
pub mod pipeline;
pub mod source;
pub mod transform;

pub use config::IngestorConfig;
pub use errors::IngestError;

use ingestor_repository::SearchIndexError;
use thiserror::Error;

/// Errors that can occur during ingestor initialization or execution.
#[derive(Error, Debug)]
pub enum IngestorError {
    /// Index lifecycle error (template, creation, or settings).
    #[error("Index error: {0}")]
    IndexError(#[from] SearchIndexError),

    /// Ingest error.
    #[error("Ingest error: {0}")]
    IngestError(#[from] IngestError),
}
