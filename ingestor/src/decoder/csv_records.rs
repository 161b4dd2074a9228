//! CSV record decoding with header-driven column mapping.
//!
//! The header row is validated up front: a missing required column aborts the
//! run before any record is processed. Individual rows that fail to parse or
//! carry an empty required value are counted and skipped.

use std::sync::Arc;

use csv_async::{AsyncReader, AsyncReaderBuilder, StringRecord};
use serde_json::Value;
use tracing::{info, warn};

use crate::counters::RunCounters;
use crate::errors::IngestError;
use crate::source::SourceStream;
use ingestor_shared::RawRecord;

/// Columns every CSV source must declare in its header row.
pub const REQUIRED_COLUMNS: [&str; 5] = ["mobile", "name", "fname", "address", "id"];

/// Streaming CSV decoder producing one raw record per valid row.
pub struct CsvRecordDecoder {
    reader: AsyncReader<SourceStream>,
    headers: Vec<String>,
    required_indices: Vec<usize>,
    counters: Arc<RunCounters>,
    row_number: u64,
}

impl CsvRecordDecoder {
    /// Read and validate the header row, then build the decoder.
    ///
    /// # Returns
    ///
    /// * `Err(IngestError::SchemaValidation)` - A required column is missing
    ///   from the header; the error names the first missing column
    pub async fn new(
        stream: SourceStream,
        counters: Arc<RunCounters>,
    ) -> Result<Self, IngestError> {
        let mut reader = AsyncReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .buffer_capacity(1 << 20)
            .create_reader(stream);

        let headers: Vec<String> = reader
            .headers()
            .await
            .map_err(|e| IngestError::decode(format!("cannot read CSV header: {}", e)))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let required_indices = REQUIRED_COLUMNS
            .iter()
            .map(|required| {
                headers
                    .iter()
                    .position(|header| header == required)
                    .ok_or_else(|| {
                        IngestError::schema_validation(format!(
                            "required column '{}' is missing from the CSV header",
                            required
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!(columns = headers.len(), "Validated CSV header");
        Ok(Self {
            reader,
            headers,
            required_indices,
            counters,
            row_number: 0,
        })
    }

    /// Decode the next valid row, or `None` at end of input.
    ///
    /// Rows with an empty required value and rows the CSV parser rejects are
    /// counted as malformed and skipped. Row numbering is absolute from the
    /// start of the file, so the synthetic `internalId` a row receives does
    /// not change across resumed runs.
    pub async fn next(&mut self) -> Result<Option<RawRecord>, IngestError> {
        let mut row = StringRecord::new();
        loop {
            match self.reader.read_record(&mut row).await {
                Ok(false) => return Ok(None),
                Ok(true) => {
                    self.row_number += 1;
                    if let Some(position) = self.first_empty_required(&row) {
                        self.counters.record_malformed();
                        warn!(
                            row = self.row_number,
                            column = REQUIRED_COLUMNS[position],
                            "Skipping CSV row with an empty required value"
                        );
                        continue;
                    }
                    return Ok(Some(self.to_raw_record(&row)));
                }
                Err(e) => {
                    self.row_number += 1;
                    self.counters.record_malformed();
                    warn!(row = self.row_number, error = %e, "Skipping unparseable CSV row");
                }
            }
        }
    }

    fn first_empty_required(&self, row: &StringRecord) -> Option<usize> {
        self.required_indices
            .iter()
            .position(|&index| row.get(index).map_or(true, |value| value.trim().is_empty()))
    }

    fn to_raw_record(&self, row: &StringRecord) -> RawRecord {
        let mut raw = RawRecord::new();
        for (index, header) in self.headers.iter().enumerate() {
            if let Some(value) = row.get(index) {
                raw.insert(header.clone(), Value::String(value.to_string()));
            }
        }
        raw.insert(
            "internalId".to_string(),
            Value::String(self.row_number.to_string()),
        );
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn decoder(input: &str) -> Result<(CsvRecordDecoder, Arc<RunCounters>), IngestError> {
        let counters = Arc::new(RunCounters::new());
        let stream: SourceStream = Box::new(std::io::Cursor::new(input.as_bytes().to_vec()));
        let decoder = CsvRecordDecoder::new(stream, Arc::clone(&counters)).await?;
        Ok((decoder, counters))
    }

    #[tokio::test]
    async fn test_decodes_rows_with_extra_columns() {
        let input = "mobile,name,fname,address,id,email\n\
                     9000000001,Asha,Ravi,12 Main St,ID1,asha@example.com\n\
                     9000000002,Dev,Kumar,34 Side St,ID2,\n";
        let (mut decoder, counters) = decoder(input).await.unwrap();

        let first = decoder.next().await.unwrap().unwrap();
        assert_eq!(first["mobile"], "9000000001");
        assert_eq!(first["email"], "asha@example.com");
        assert_eq!(first["internalId"], "1");

        let second = decoder.next().await.unwrap().unwrap();
        assert_eq!(second["id"], "ID2");
        assert_eq!(second["internalId"], "2");

        assert!(decoder.next().await.unwrap().is_none());
        assert_eq!(counters.skipped_malformed(), 0);
    }

    #[tokio::test]
    async fn test_missing_required_column_is_schema_validation() {
        let input = "mobile,name,address,id\n9000000001,Asha,12 Main St,ID1\n";
        match decoder(input).await {
            Err(IngestError::SchemaValidation(msg)) => {
                assert!(msg.contains("fname"), "unexpected message: {}", msg);
            }
            other => panic!("expected schema validation error, got {:?}", other.is_ok()),
        }
    }

    #[tokio::test]
    async fn test_empty_required_value_is_skipped() {
        let input = "mobile,name,fname,address,id\n\
                     9000000001,Asha,Ravi,12 Main St,ID1\n\
                     ,Dev,Kumar,34 Side St,ID2\n\
                     9000000003,Mira,Sen,56 Hill Rd,ID3\n";
        let (mut decoder, counters) = decoder(input).await.unwrap();

        let first = decoder.next().await.unwrap().unwrap();
        assert_eq!(first["id"], "ID1");
        let next = decoder.next().await.unwrap().unwrap();
        assert_eq!(next["id"], "ID3");
        // Row numbering stays absolute across the skipped row.
        assert_eq!(next["internalId"], "3");
        assert!(decoder.next().await.unwrap().is_none());
        assert_eq!(counters.skipped_malformed(), 1);
    }
}
