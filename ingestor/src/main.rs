//! Ingestor Main Entry Point
//!
//! This is the main binary for the bulk person-record ingestor. It streams
//! records from a source descriptor (stdin, local file, or object storage)
//! into an OpenSearch index via batched bulk upserts.

use std::env;
use std::process;
use std::sync::Arc;

use clap::Parser;
use dotenv::dotenv;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ingestor::cli::{Cli, Commands};
use ingestor::counters::RunCounters;
use ingestor::decoder::RecordDecoder;
use ingestor::pipeline::IngestionPipeline;
use ingestor::source::SourceSpec;
use ingestor::transform::RecordTransformer;
use ingestor::{IngestorConfig, IngestorError};
use ingestor_repository::{IndexConfig, OpenSearchProvider, SearchIndexProvider};

/// Initialize tracing/logging.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ingestor=info,ingestor_repository=info"));

    if env::var("LOG_JSON").is_ok() {
        // JSON format for structured log shipping
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .init();

        info!(
            service_name = "ingestor",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with JSON format"
        );
    } else {
        // Pretty console output for interactive runs
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .init();

        info!(
            service_name = "ingestor",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with console output"
        );
    }
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();
    init_tracing();

    if let Err(e) = run(cli).await {
        error!(error = %e, "Ingestion failed");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), IngestorError> {
    let mut config = IngestorConfig::from_env();

    let (source, resume, csv_region) = match &cli.command {
        Commands::Ingest {
            source,
            resume,
            batch_size,
            workers_multiplier,
            index,
        } => {
            apply_overrides(&mut config, batch_size, workers_multiplier, index);
            (source.clone(), *resume, None)
        }
        Commands::IngestCsv {
            file,
            region,
            resume,
            batch_size,
            workers_multiplier,
            index,
        } => {
            apply_overrides(&mut config, batch_size, workers_multiplier, index);
            (file.clone(), *resume, Some(region.clone()))
        }
    };

    let spec = SourceSpec::parse(&source).map_err(IngestorError::from)?;
    if let Some(Some(region)) = &csv_region {
        config.default_region = region.clone();
    }

    let provider = Arc::new(OpenSearchProvider::new(
        &config.opensearch_url,
        IndexConfig::new(&config.index_name),
    )?);

    // Bootstrap the write sink before touching the source.
    provider.ping().await?;
    provider.apply_template().await?;
    provider.create_index().await?;

    let counters = Arc::new(RunCounters::new());
    let stream = spec.open().await.map_err(IngestorError::from)?;

    let decoder = if csv_region.is_some() {
        Some(RecordDecoder::from_csv_source(stream, Arc::clone(&counters)).await?)
    } else {
        RecordDecoder::from_json_source(stream, Arc::clone(&counters)).await?
    };

    let result = match decoder {
        None => {
            info!("Source contains no data; nothing to ingest");
            Ok(())
        }
        Some(decoder) => {
            let pipeline = IngestionPipeline::new(
                Arc::clone(&provider) as Arc<dyn SearchIndexProvider>,
                RecordTransformer::new(config.transform_config()),
                config.loader_config(),
                config.pipeline_config(),
                Arc::clone(&counters),
            );
            pipeline.run(decoder, resume).await.map(|_| ())
        }
    };

    // Put the index back into a read-optimized state even after a failed run;
    // the documents already committed stay searchable.
    if let Err(e) = provider.restore_settings().await {
        warn!(error = %e, "Failed to restore index settings");
    }

    result.map_err(IngestorError::from)
}

fn apply_overrides(
    config: &mut IngestorConfig,
    batch_size: &Option<usize>,
    workers_multiplier: &Option<usize>,
    index: &Option<String>,
) {
    if let Some(batch_size) = batch_size {
        config.batch_size = *batch_size;
    }
    if let Some(multiplier) = workers_multiplier {
        config.workers_multiplier = *multiplier;
    }
    if let Some(index) = index {
        config.index_name = index.clone();
    }
}
