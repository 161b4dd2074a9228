//! Brace-depth scanner for JSON object streams.
//!
//! Scans the byte stream for balanced top-level `{ ... }` spans without
//! building a document tree, so memory stays bounded by the largest single
//! record rather than the input size. The scanner is string-literal aware:
//! braces and brackets inside quoted values, including escaped quotes, do not
//! affect the depth count.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use super::sniff::Framing;
use crate::counters::RunCounters;
use crate::errors::IngestError;
use crate::source::SourceStream;
use ingestor_shared::RawRecord;

/// Streaming scanner producing one raw record per balanced top-level object.
///
/// In array framing the enclosing `[` and `]` plus element separators are
/// consumed as framing; in bare framing any bytes between objects are treated
/// as separators. A captured span that fails to parse as a JSON object is
/// counted as malformed and skipped.
pub struct ObjectScanner {
    reader: BufReader<SourceStream>,
    framing: Framing,
    counters: Arc<RunCounters>,
    // Bracket nesting outside objects; nonzero at end of input means the
    // enclosing array was never closed.
    array_depth: u32,
    // Capture state persists across buffer refills so a record may span
    // arbitrarily many read chunks.
    capture: Vec<u8>,
    in_object: bool,
    depth: u32,
    in_string: bool,
    escaped: bool,
}

impl ObjectScanner {
    pub fn new(
        reader: BufReader<SourceStream>,
        framing: Framing,
        counters: Arc<RunCounters>,
    ) -> Self {
        Self {
            reader,
            framing,
            counters,
            array_depth: 0,
            capture: Vec::new(),
            in_object: false,
            depth: 0,
            in_string: false,
            escaped: false,
        }
    }

    /// Scan forward to the next complete top-level object.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(record))` - The next successfully parsed record
    /// * `Ok(None)` - End of input
    /// * `Err(IngestError::TruncatedInput)` - Array framing ended without
    ///   its closing bracket
    pub async fn next(&mut self) -> Result<Option<RawRecord>, IngestError> {
        loop {
            let buf = self
                .reader
                .fill_buf()
                .await
                .map_err(|e| IngestError::decode(e.to_string()))?;

            if buf.is_empty() {
                if self.framing == Framing::JsonArray && self.array_depth > 0 {
                    return Err(IngestError::truncated_input(
                        "input ended before the enclosing JSON array was closed",
                    ));
                }
                if self.in_object {
                    self.in_object = false;
                    self.capture.clear();
                    self.counters.record_malformed();
                    warn!("Input ended inside an object; skipping partial record");
                }
                return Ok(None);
            }

            let mut consumed = buf.len();
            let mut completed: Option<Vec<u8>> = None;

            for (i, &byte) in buf.iter().enumerate() {
                if !self.in_object {
                    match byte {
                        b'{' => {
                            self.in_object = true;
                            self.depth = 1;
                            self.in_string = false;
                            self.escaped = false;
                            self.capture.clear();
                            self.capture.push(byte);
                        }
                        b'[' if self.framing == Framing::JsonArray => {
                            self.array_depth += 1;
                        }
                        b']' if self.framing == Framing::JsonArray => {
                            self.array_depth = self.array_depth.saturating_sub(1);
                        }
                        // Whitespace, commas and any non-object array
                        // elements are separators.
                        _ => {}
                    }
                    continue;
                }

                self.capture.push(byte);
                if self.in_string {
                    if self.escaped {
                        self.escaped = false;
                    } else if byte == b'\\' {
                        self.escaped = true;
                    } else if byte == b'"' {
                        self.in_string = false;
                    }
                    continue;
                }
                match byte {
                    b'"' => self.in_string = true,
                    b'{' => self.depth += 1,
                    b'}' => {
                        self.depth -= 1;
                        if self.depth == 0 {
                            self.in_object = false;
                            completed = Some(std::mem::take(&mut self.capture));
                            consumed = i + 1;
                            break;
                        }
                    }
                    _ => {}
                }
            }

            self.reader.consume(consumed);

            if let Some(span) = completed {
                match serde_json::from_slice::<Map<String, Value>>(&span) {
                    Ok(record) => return Ok(Some(record)),
                    Err(e) => {
                        self.counters.record_malformed();
                        warn!(error = %e, "Skipping malformed record");
                    }
                }
            }
        }
    }
}
