//! Command-line interface definition.

use clap::{Parser, Subcommand};

/// Bulk person-record ingestor.
#[derive(Debug, Parser)]
#[command(name = "ingestor", version, about = "Streams person records from heterogeneous sources into a search index")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Ingest a JSON source (array or bare object stream)
    Ingest {
        /// Source descriptor: `-` for stdin, a filesystem path, or
        /// `scheme://bucket/key` for object storage
        source: String,

        /// Number of already-ingested records to discard before processing
        #[arg(long, default_value_t = 0)]
        resume: u64,

        /// Documents per bulk request (overrides INGEST_BATCH_SIZE)
        #[arg(long = "batch")]
        batch_size: Option<usize>,

        /// Worker multiplier over available parallelism (overrides
        /// INGEST_WORKERS_MULTIPLIER)
        #[arg(long = "workers-multiplier")]
        workers_multiplier: Option<usize>,

        /// Target index name (overrides PERSONS_INDEX)
        #[arg(long)]
        index: Option<String>,
    },

    /// Ingest a delimited CSV source with header validation
    IngestCsv {
        /// CSV source descriptor: `-` for stdin, a filesystem path, or
        /// `scheme://bucket/key` for object storage
        #[arg(long = "file")]
        file: String,

        /// Region stamped on records that carry none (overrides
        /// DEFAULT_REGION)
        #[arg(long)]
        region: Option<String>,

        /// Number of already-ingested records to discard before processing
        #[arg(long, default_value_t = 0)]
        resume: u64,

        /// Documents per bulk request (overrides INGEST_BATCH_SIZE)
        #[arg(long = "batch")]
        batch_size: Option<usize>,

        /// Worker multiplier over available parallelism (overrides
        /// INGEST_WORKERS_MULTIPLIER)
        #[arg(long = "workers-multiplier")]
        workers_multiplier: Option<usize>,

        /// Target index name (overrides PERSONS_INDEX)
        #[arg(long)]
        index: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_ingest_command() {
        let cli = Cli::try_parse_from([
            "ingestor",
            "ingest",
            "s3://dumps/persons.json",
            "--resume",
            "500000",
            "--batch",
            "1000",
        ])
        .unwrap();
        match cli.command {
            Commands::Ingest {
                source,
                resume,
                batch_size,
                ..
            } => {
                assert_eq!(source, "s3://dumps/persons.json");
                assert_eq!(resume, 500_000);
                assert_eq!(batch_size, Some(1000));
            }
            _ => panic!("expected ingest command"),
        }
    }

    #[test]
    fn test_parses_ingest_csv_command() {
        let cli = Cli::try_parse_from([
            "ingestor",
            "ingest-csv",
            "--file",
            "/data/persons.csv",
            "--region",
            "south",
        ])
        .unwrap();
        match cli.command {
            Commands::IngestCsv { file, region, .. } => {
                assert_eq!(file, "/data/persons.csv");
                assert_eq!(region.as_deref(), Some("south"));
            }
            _ => panic!("expected ingest-csv command"),
        }
    }

    #[test]
    fn test_source_is_required() {
        assert!(Cli::try_parse_from(["ingestor", "ingest"]).is_err());
        assert!(Cli::try_parse_from(["ingestor", "ingest-csv"]).is_err());
    }
}
