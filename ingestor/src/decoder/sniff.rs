//! Input framing detection.
//!
//! Peeks the first byte of the stream that is not ASCII whitespace, after
//! transparently consuming one leading UTF-8 byte-order mark, and decides
//! between JSON-array and bare-object-stream framing. The significant byte is
//! left unconsumed for the downstream decoder.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::errors::IngestError;

/// UTF-8 byte-order mark.
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Detected input framing for a JSON source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// The records are elements of one enclosing JSON array.
    JsonArray,
    /// The records are consecutive bare top-level JSON objects.
    ObjectStream,
}

/// Sniff the framing of a JSON source.
///
/// Consumes a leading BOM and any whitespace, then peeks the first
/// significant byte without consuming it: `[` means JSON-array framing,
/// anything else means a bare object stream.
///
/// # Returns
///
/// * `Ok(Some(Framing))` - Detected framing; the significant byte is still
///   in the reader for the decoder
/// * `Ok(None)` - Empty or whitespace-only input (benign "no data")
/// * `Err(IngestError)` - On a read failure
pub async fn sniff_framing<R>(reader: &mut R) -> Result<Option<Framing>, IngestError>
where
    R: AsyncBufRead + Unpin,
{
    // Match the BOM byte by byte so a short first read (slow stdin or a
    // trickling network stream) cannot split the mark. Bytes consumed from a
    // partial match cannot occur in well-formed input; the scanner would have
    // ignored them as separators anyway.
    let mut bom_matched = 0;
    while bom_matched < UTF8_BOM.len() {
        let buf = reader
            .fill_buf()
            .await
            .map_err(|e| IngestError::decode(e.to_string()))?;
        if buf.is_empty() {
            return Ok(None);
        }
        if buf[0] != UTF8_BOM[bom_matched] {
            break;
        }
        reader.consume(1);
        bom_matched += 1;
    }

    loop {
        let buf = reader
            .fill_buf()
            .await
            .map_err(|e| IngestError::decode(e.to_string()))?;
        if buf.is_empty() {
            return Ok(None);
        }

        let mut skip = 0;
        while skip < buf.len() && buf[skip].is_ascii_whitespace() {
            skip += 1;
        }

        if skip < buf.len() {
            let framing = if buf[skip] == b'[' {
                Framing::JsonArray
            } else {
                Framing::ObjectStream
            };
            reader.consume(skip);
            return Ok(Some(framing));
        }

        let len = buf.len();
        reader.consume(len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, BufReader};

    async fn sniff(input: &[u8]) -> (Option<Framing>, Vec<u8>) {
        let mut reader = BufReader::new(std::io::Cursor::new(input.to_vec()));
        let framing = sniff_framing(&mut reader).await.unwrap();
        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).await.unwrap();
        (framing, rest)
    }

    #[tokio::test]
    async fn test_sniffs_json_array() {
        let (framing, rest) = sniff(b"[{\"a\":1}]").await;
        assert_eq!(framing, Some(Framing::JsonArray));
        // The peeked byte is not consumed.
        assert_eq!(rest, b"[{\"a\":1}]");
    }

    #[tokio::test]
    async fn test_sniffs_object_stream() {
        let (framing, rest) = sniff(b"  \n{\"a\":1}").await;
        assert_eq!(framing, Some(Framing::ObjectStream));
        assert_eq!(rest, b"{\"a\":1}");
    }

    #[tokio::test]
    async fn test_skips_bom() {
        let mut input = UTF8_BOM.to_vec();
        input.extend_from_slice(b"[1]");
        let (framing, rest) = sniff(&input).await;
        assert_eq!(framing, Some(Framing::JsonArray));
        assert_eq!(rest, b"[1]");
    }

    #[tokio::test]
    async fn test_empty_input_is_no_data() {
        let (framing, _) = sniff(b"").await;
        assert_eq!(framing, None);
    }

    #[tokio::test]
    async fn test_whitespace_only_input_is_no_data() {
        let (framing, _) = sniff(b"  \n\t \r\n ").await;
        assert_eq!(framing, None);
    }

    #[tokio::test]
    async fn test_bom_only_input_is_no_data() {
        let (framing, _) = sniff(&UTF8_BOM).await;
        assert_eq!(framing, None);
    }

    #[tokio::test]
    async fn test_bom_split_across_short_reads() {
        let mut input = UTF8_BOM.to_vec();
        input.extend_from_slice(b"[1]");
        // A one-byte buffer forces every fill to return a single byte, so
        // the mark is never visible in one read.
        let mut reader = BufReader::with_capacity(1, std::io::Cursor::new(input));
        let framing = sniff_framing(&mut reader).await.unwrap();
        assert_eq!(framing, Some(Framing::JsonArray));

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, b"[1]");
    }
}
