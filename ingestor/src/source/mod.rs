//! Source descriptor parsing and byte-stream opening.
//!
//! A source descriptor is `-` for standard input, `scheme://bucket/key` for
//! an object-storage location, or a filesystem path. Every variant opens into
//! one sequential byte stream; release happens through `Drop` on every exit
//! path.

use std::path::PathBuf;
use tokio::io::AsyncRead;
use tracing::info;

use crate::errors::IngestError;

/// One sequential byte stream from an opened source.
pub type SourceStream = Box<dyn AsyncRead + Unpin + Send>;

/// Parsed form of a source descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// Read from standard input (`-`).
    Stdin,
    /// Read from a local filesystem path.
    Path(PathBuf),
    /// Fetch an object from object storage.
    ObjectStore { bucket: String, key: String },
}

impl SourceSpec {
    /// Parse a source descriptor.
    ///
    /// A storage URI missing either the bucket or the key segment is a
    /// startup-time `SourceUnavailable` error, not a per-record error.
    pub fn parse(descriptor: &str) -> Result<Self, IngestError> {
        if descriptor == "-" {
            return Ok(Self::Stdin);
        }

        if let Some((_scheme, rest)) = descriptor.split_once("://") {
            let (bucket, key) = rest.split_once('/').ok_or_else(|| {
                IngestError::source_unavailable(format!(
                    "storage URI '{}' is missing a key segment",
                    descriptor
                ))
            })?;
            if bucket.is_empty() {
                return Err(IngestError::source_unavailable(format!(
                    "storage URI '{}' is missing a bucket segment",
                    descriptor
                )));
            }
            if key.is_empty() {
                return Err(IngestError::source_unavailable(format!(
                    "storage URI '{}' is missing a key segment",
                    descriptor
                )));
            }
            return Ok(Self::ObjectStore {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }

        Ok(Self::Path(PathBuf::from(descriptor)))
    }

    /// Open the source into one sequential byte stream.
    pub async fn open(&self) -> Result<SourceStream, IngestError> {
        match self {
            Self::Stdin => {
                info!("Reading from standard input");
                Ok(Box::new(tokio::io::stdin()))
            }
            Self::Path(path) => {
                let file = tokio::fs::File::open(path).await.map_err(|e| {
                    IngestError::source_unavailable(format!(
                        "cannot open '{}': {}",
                        path.display(),
                        e
                    ))
                })?;
                info!(path = %path.display(), "Opened local source");
                Ok(Box::new(file))
            }
            Self::ObjectStore { bucket, key } => {
                let sdk_config =
                    aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
                let client = aws_sdk_s3::Client::new(&sdk_config);

                let object = client
                    .get_object()
                    .bucket(bucket)
                    .key(key)
                    .send()
                    .await
                    .map_err(|e| {
                        IngestError::source_unavailable(format!(
                            "cannot fetch object '{}/{}': {}",
                            bucket, key, e
                        ))
                    })?;

                info!(bucket = %bucket, key = %key, "Opened object-storage source");
                Ok(Box::new(object.body.into_async_read()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stdin() {
        assert_eq!(SourceSpec::parse("-").unwrap(), SourceSpec::Stdin);
    }

    #[test]
    fn test_parse_local_path() {
        assert_eq!(
            SourceSpec::parse("/data/persons.json").unwrap(),
            SourceSpec::Path(PathBuf::from("/data/persons.json"))
        );
    }

    #[test]
    fn test_parse_storage_uri() {
        assert_eq!(
            SourceSpec::parse("s3://dumps/persons/part-0001.json").unwrap(),
            SourceSpec::ObjectStore {
                bucket: "dumps".to_string(),
                key: "persons/part-0001.json".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_storage_uri_missing_key() {
        assert!(matches!(
            SourceSpec::parse("s3://dumps"),
            Err(IngestError::SourceUnavailable(_))
        ));
        assert!(matches!(
            SourceSpec::parse("s3://dumps/"),
            Err(IngestError::SourceUnavailable(_))
        ));
    }

    #[test]
    fn test_parse_storage_uri_missing_bucket() {
        assert!(matches!(
            SourceSpec::parse("s3:///persons.json"),
            Err(IngestError::SourceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_open_missing_path_is_source_unavailable() {
        let spec = SourceSpec::parse("/definitely/not/a/real/path.json").unwrap();
        assert!(matches!(
            spec.open().await,
            Err(IngestError::SourceUnavailable(_))
        ));
    }
}
