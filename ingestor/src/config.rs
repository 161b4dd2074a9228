//! Run configuration from environment variables.
//!
//! Every knob has a default suited to a single-node deployment; CLI flags
//! may override a subset after loading. Unparseable values fall back to the
//! default with a warning rather than aborting.

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::loader::{
    LoaderConfig, DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_JITTER, DEFAULT_BATCH_SIZE,
    DEFAULT_MAX_ATTEMPTS,
};
use crate::pipeline::{default_worker_count, PipelineConfig, DEFAULT_QUEUE_CAPACITY};
use crate::transform::{TransformConfig, DEFAULT_REGION};
use ingestor_repository::DEFAULT_INDEX_NAME;

/// Default search index endpoint.
pub const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";
/// Default multiplier applied to available parallelism for the worker count.
pub const DEFAULT_WORKERS_MULTIPLIER: usize = 1;

/// Complete configuration for one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestorConfig {
    pub opensearch_url: String,
    pub index_name: String,
    pub default_region: String,
    pub batch_size: usize,
    pub queue_capacity: usize,
    pub workers_multiplier: usize,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_jitter_ms: u64,
}

impl Default for IngestorConfig {
    fn default() -> Self {
        Self {
            opensearch_url: DEFAULT_OPENSEARCH_URL.to_string(),
            index_name: DEFAULT_INDEX_NAME.to_string(),
            default_region: DEFAULT_REGION.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            workers_multiplier: DEFAULT_WORKERS_MULTIPLIER,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base_ms: DEFAULT_BACKOFF_BASE.as_millis() as u64,
            backoff_jitter_ms: DEFAULT_BACKOFF_JITTER.as_millis() as u64,
        }
    }
}

impl IngestorConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            opensearch_url: env_string("OPENSEARCH_URL", &defaults.opensearch_url),
            index_name: env_string("PERSONS_INDEX", &defaults.index_name),
            default_region: env_string("DEFAULT_REGION", &defaults.default_region),
            batch_size: env_parse("INGEST_BATCH_SIZE", defaults.batch_size),
            queue_capacity: env_parse("INGEST_QUEUE_CAPACITY", defaults.queue_capacity),
            workers_multiplier: env_parse(
                "INGEST_WORKERS_MULTIPLIER",
                defaults.workers_multiplier,
            ),
            max_attempts: env_parse("BULK_MAX_ATTEMPTS", defaults.max_attempts),
            backoff_base_ms: env_parse("BULK_BACKOFF_BASE_MS", defaults.backoff_base_ms),
            backoff_jitter_ms: env_parse("BULK_BACKOFF_JITTER_MS", defaults.backoff_jitter_ms),
        }
    }

    /// Worker count for this run, derived from available parallelism.
    pub fn worker_count(&self) -> usize {
        default_worker_count(self.workers_multiplier)
    }

    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            batch_size: self.batch_size.max(1),
            max_attempts: self.max_attempts.max(1),
            backoff_base: Duration::from_millis(self.backoff_base_ms),
            backoff_jitter: Duration::from_millis(self.backoff_jitter_ms),
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            workers: self.worker_count(),
            queue_capacity: self.queue_capacity.max(1),
        }
    }

    pub fn transform_config(&self) -> TransformConfig {
        TransformConfig {
            default_region: self.default_region.clone(),
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr + Copy>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            warn!(key, value = %value, "Unparseable environment value; using default");
            default
        }),
        Err(_) => default,
    }
}
