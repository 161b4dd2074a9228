//! Streaming record decoders.
//!
//! Turns one sequential byte stream into a lazy, finite, non-restartable
//! sequence of raw records. Three input families are supported: JSON arrays,
//! bare top-level object streams, and delimited CSV with header-driven column
//! mapping. Per-record decode failures are counted and skipped here; they
//! never escape as errors.

pub mod csv_records;
pub mod object_scanner;
pub mod sniff;

pub use csv_records::{CsvRecordDecoder, REQUIRED_COLUMNS};
pub use object_scanner::ObjectScanner;
pub use sniff::{sniff_framing, Framing};

use std::sync::Arc;
use tokio::io::BufReader;

use crate::counters::RunCounters;
use crate::errors::IngestError;
use crate::source::SourceStream;
use ingestor_shared::RawRecord;

/// Buffer capacity for the decoder's buffered reader.
const READ_BUFFER_CAPACITY: usize = 1 << 20;

/// A streaming decoder over one opened source.
///
/// Restart is achieved only by re-running the pipeline with an explicit
/// resume offset, never by replaying this value.
pub enum RecordDecoder {
    /// JSON framing (array or bare object stream), selected by the sniffer.
    Json(ObjectScanner),
    /// Delimited CSV with header-driven column mapping.
    Csv(CsvRecordDecoder),
}

impl RecordDecoder {
    /// Sniff a JSON source's framing and build the matching decoder.
    ///
    /// Returns `Ok(None)` on empty or whitespace-only input - the benign
    /// "no data" condition; the caller should complete successfully with
    /// zero processed records.
    pub async fn from_json_source(
        stream: SourceStream,
        counters: Arc<RunCounters>,
    ) -> Result<Option<Self>, IngestError> {
        let mut reader = BufReader::with_capacity(READ_BUFFER_CAPACITY, stream);
        match sniff_framing(&mut reader).await? {
            None => Ok(None),
            Some(framing) => Ok(Some(Self::Json(ObjectScanner::new(
                reader, framing, counters,
            )))),
        }
    }

    /// Build a CSV decoder, validating required header columns up front.
    pub async fn from_csv_source(
        stream: SourceStream,
        counters: Arc<RunCounters>,
    ) -> Result<Self, IngestError> {
        Ok(Self::Csv(CsvRecordDecoder::new(stream, counters).await?))
    }

    /// Decode the next raw record, or `None` at end of input.
    pub async fn next(&mut self) -> Result<Option<RawRecord>, IngestError> {
        match self {
            Self::Json(scanner) => scanner.next().await,
            Self::Csv(csv) => csv.next().await,
        }
    }
}
