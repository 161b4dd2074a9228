//! Batch accumulation and bulk submission with retry.
//!
//! Each worker owns one `BatchLoader`. Documents accumulate until the batch
//! size is reached, then the whole batch is submitted as one bulk upsert.
//! Failed submissions are retried with capped exponential backoff and jitter;
//! exhausting the attempts is a pipeline-fatal error.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::errors::IngestError;
use ingestor_repository::{BulkWriteSummary, SearchIndexProvider};
use ingestor_shared::{DocumentIdentity, PersonDocument};

/// Default number of documents per bulk request.
pub const DEFAULT_BATCH_SIZE: usize = 2000;
/// Default number of submission attempts per batch.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Default base delay for the exponential backoff.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(500);
/// Default upper bound for the random jitter added to each delay.
pub const DEFAULT_BACKOFF_JITTER: Duration = Duration::from_millis(250);

/// Batching and retry settings for one ingestion run.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub batch_size: usize,
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_jitter: Duration,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF_BASE,
            backoff_jitter: DEFAULT_BACKOFF_JITTER,
        }
    }
}

/// Accumulates documents and submits them in bulk.
pub struct BatchLoader {
    provider: Arc<dyn SearchIndexProvider>,
    config: LoaderConfig,
    pending: Vec<(DocumentIdentity, PersonDocument)>,
}

impl BatchLoader {
    pub fn new(provider: Arc<dyn SearchIndexProvider>, config: LoaderConfig) -> Self {
        let pending = Vec::with_capacity(config.batch_size);
        Self {
            provider,
            config,
            pending,
        }
    }

    /// Add one document, submitting the batch when it is full.
    ///
    /// # Returns
    ///
    /// * `Ok(count)` - Number of documents committed by this call (zero when
    ///   the batch is still accumulating)
    /// * `Err(IngestError::BulkWrite)` - All submission attempts exhausted
    pub async fn push(
        &mut self,
        identity: DocumentIdentity,
        document: PersonDocument,
    ) -> Result<usize, IngestError> {
        self.pending.push((identity, document));
        if self.pending.len() >= self.config.batch_size {
            return self.flush().await;
        }
        Ok(0)
    }

    /// Submit whatever is pending, if anything.
    pub async fn flush(&mut self) -> Result<usize, IngestError> {
        if self.pending.is_empty() {
            return Ok(0);
        }
        let batch = std::mem::replace(
            &mut self.pending,
            Vec::with_capacity(self.config.batch_size),
        );
        self.submit_with_retry(&batch).await?;
        Ok(batch.len())
    }

    /// Submit one batch, retrying with backoff until it succeeds or the
    /// attempt budget is exhausted. A response where every item failure is
    /// benign (a version conflict from a concurrent upsert of the same
    /// identity) counts as success.
    async fn submit_with_retry(
        &self,
        batch: &[(DocumentIdentity, PersonDocument)],
    ) -> Result<(), IngestError> {
        let mut last_error = String::new();

        for attempt in 1..=self.config.max_attempts {
            match self.provider.bulk_upsert(batch).await {
                Ok(summary) if summary.failed == 0 => {
                    debug!(batch_size = batch.len(), "Committed bulk batch");
                    return Ok(());
                }
                Ok(summary) if summary.all_failures_benign() => {
                    debug!(
                        batch_size = batch.len(),
                        conflicts = summary.failed,
                        "Committed bulk batch with benign version conflicts"
                    );
                    return Ok(());
                }
                Ok(summary) => {
                    last_error = describe_failures(&summary);
                    warn!(
                        attempt,
                        failed = summary.failed,
                        total = summary.total,
                        "Bulk batch partially failed"
                    );
                }
                Err(e) => {
                    last_error = e.to_string();
                    warn!(attempt, error = %e, "Bulk submission failed");
                }
            }

            if attempt < self.config.max_attempts {
                let delay = self.jittered(backoff_delay(self.config.backoff_base, attempt));
                debug!(attempt, delay_ms = delay.as_millis() as u64, "Backing off before retry");
                sleep(delay).await;
            }
        }

        Err(IngestError::bulk_write(format!(
            "batch of {} documents failed after {} attempts: {}",
            batch.len(),
            self.config.max_attempts,
            last_error
        )))
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if self.config.backoff_jitter.is_zero() {
            return delay;
        }
        let jitter_ms = self.config.backoff_jitter.as_millis() as u64;
        delay + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }
}

/// Exponential backoff delay for the given attempt number (1-based).
///
/// The shift is capped so large attempt counts cannot overflow the multiplier.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(20);
    base.saturating_mul(1u32 << exponent)
}

fn describe_failures(summary: &BulkWriteSummary) -> String {
    let detail = summary
        .failures
        .iter()
        .find(|failure| !failure.is_benign())
        .map(|failure| format!("{}: {}", failure.error_type, failure.reason))
        .unwrap_or_default();
    format!("{} of {} items failed ({})", summary.failed, summary.total, detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ingestor_repository::{BulkItemFailure, SearchIndexError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Provider that fails the first `failures` bulk calls, then succeeds.
    struct FlakyProvider {
        calls: AtomicUsize,
        failures: usize,
        batches: Mutex<Vec<usize>>,
    }

    impl FlakyProvider {
        fn new(failures: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failures,
                batches: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SearchIndexProvider for FlakyProvider {
        async fn ping(&self) -> Result<(), SearchIndexError> {
            Ok(())
        }

        async fn apply_template(&self) -> Result<(), SearchIndexError> {
            Ok(())
        }

        async fn create_index(&self) -> Result<(), SearchIndexError> {
            Ok(())
        }

        async fn bulk_upsert(
            &self,
            batch: &[(DocumentIdentity, PersonDocument)],
        ) -> Result<BulkWriteSummary, SearchIndexError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(SearchIndexError::bulk_write("transient transport failure"));
            }
            self.batches.lock().unwrap().push(batch.len());
            Ok(BulkWriteSummary::success(batch.len()))
        }

        async fn restore_settings(&self) -> Result<(), SearchIndexError> {
            Ok(())
        }
    }

    /// Provider whose responses always contain only version conflicts.
    struct ConflictProvider;

    #[async_trait]
    impl SearchIndexProvider for ConflictProvider {
        async fn ping(&self) -> Result<(), SearchIndexError> {
            Ok(())
        }

        async fn apply_template(&self) -> Result<(), SearchIndexError> {
            Ok(())
        }

        async fn create_index(&self) -> Result<(), SearchIndexError> {
            Ok(())
        }

        async fn bulk_upsert(
            &self,
            batch: &[(DocumentIdentity, PersonDocument)],
        ) -> Result<BulkWriteSummary, SearchIndexError> {
            let failures = batch
                .iter()
                .map(|(identity, _)| BulkItemFailure {
                    id: identity.clone(),
                    status: 409,
                    error_type: "version_conflict_engine_exception".to_string(),
                    reason: "version conflict".to_string(),
                })
                .collect::<Vec<_>>();
            Ok(BulkWriteSummary {
                total: batch.len(),
                succeeded: 0,
                failed: failures.len(),
                failures,
            })
        }

        async fn restore_settings(&self) -> Result<(), SearchIndexError> {
            Ok(())
        }
    }

    fn fast_config(batch_size: usize, max_attempts: u32) -> LoaderConfig {
        LoaderConfig {
            batch_size,
            max_attempts,
            backoff_base: Duration::ZERO,
            backoff_jitter: Duration::ZERO,
        }
    }

    fn document(id: &str) -> PersonDocument {
        PersonDocument {
            id: id.to_string(),
            ..PersonDocument::default()
        }
    }

    #[tokio::test]
    async fn test_push_flushes_on_batch_boundary() {
        let provider = Arc::new(FlakyProvider::new(0));
        let mut loader = BatchLoader::new(provider.clone(), fast_config(2, 1));

        assert_eq!(loader.push("a".into(), document("a")).await.unwrap(), 0);
        assert_eq!(loader.push("b".into(), document("b")).await.unwrap(), 2);
        assert_eq!(loader.push("c".into(), document("c")).await.unwrap(), 0);
        assert_eq!(loader.flush().await.unwrap(), 1);
        assert_eq!(loader.flush().await.unwrap(), 0);

        assert_eq!(*provider.batches.lock().unwrap(), vec![2, 1]);
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let provider = Arc::new(FlakyProvider::new(2));
        let mut loader = BatchLoader::new(provider.clone(), fast_config(1, 5));

        assert_eq!(loader.push("a".into(), document("a")).await.unwrap(), 1);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_attempts_is_fatal() {
        let provider = Arc::new(FlakyProvider::new(10));
        let mut loader = BatchLoader::new(provider, fast_config(1, 3));

        let result = loader.push("a".into(), document("a")).await;
        assert!(matches!(result, Err(IngestError::BulkWrite(_))));
    }

    #[tokio::test]
    async fn test_version_conflicts_are_benign() {
        let mut loader = BatchLoader::new(Arc::new(ConflictProvider), fast_config(1, 1));
        assert_eq!(loader.push("a".into(), document("a")).await.unwrap(), 1);
    }

    #[test]
    fn test_backoff_delays_are_monotonic() {
        let base = Duration::from_millis(500);
        let delays: Vec<_> = (1..=5).map(|attempt| backoff_delay(base, attempt)).collect();
        for pair in delays.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert_eq!(delays[0], base);
        assert_eq!(delays[4], base * 16);
    }

    #[test]
    fn test_backoff_shift_is_capped() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff_delay(base, 40), backoff_delay(base, 21));
    }
}
