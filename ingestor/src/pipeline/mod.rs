//! Bounded producer/worker pipeline.
//!
//! One producer task decodes records sequentially and feeds a bounded queue;
//! a pool of workers drains the queue, transforming and bulk-loading in
//! parallel. Backpressure comes from the queue bound alone. A broadcast
//! shutdown channel carries cooperative cancellation: a signal, a producer
//! failure, or an exhausted bulk retry all stop every task at its next
//! checkpoint.

pub mod progress;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, error, info};

use crate::counters::{crossed_milestone, RunCounters};
use crate::decoder::RecordDecoder;
use crate::errors::IngestError;
use crate::loader::{BatchLoader, LoaderConfig};
use crate::transform::RecordTransformer;
use ingestor_repository::SearchIndexProvider;
use ingestor_shared::RawRecord;

use progress::ProgressMonitor;

/// Default bound of the record queue between producer and workers.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Worker-pool and queue settings for one ingestion run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_worker_count(1),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Worker count derived from available parallelism, never below one.
pub fn default_worker_count(multiplier: usize) -> usize {
    let parallelism = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (parallelism * multiplier.max(1)).max(1)
}

/// Final accounting for one ingestion run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub processed: u64,
    pub skipped_malformed: u64,
    pub resume_skipped: u64,
    pub elapsed: Duration,
    pub throughput: f64,
}

/// Orchestrates one ingestion run end to end.
pub struct IngestionPipeline {
    provider: Arc<dyn SearchIndexProvider>,
    transformer: RecordTransformer,
    loader_config: LoaderConfig,
    config: PipelineConfig,
    counters: Arc<RunCounters>,
    shutdown_tx: broadcast::Sender<()>,
}

impl IngestionPipeline {
    pub fn new(
        provider: Arc<dyn SearchIndexProvider>,
        transformer: RecordTransformer,
        loader_config: LoaderConfig,
        config: PipelineConfig,
        counters: Arc<RunCounters>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            provider,
            transformer,
            loader_config,
            config,
            counters,
            shutdown_tx,
        }
    }

    /// Request cooperative cancellation of a running pipeline.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Run the pipeline to completion over one opened decoder.
    ///
    /// The first `resume` decoded records are discarded before transformation.
    /// Returns the run summary on success; a producer or worker failure
    /// cancels the whole pipeline and surfaces as the returned error.
    pub async fn run(
        &self,
        decoder: RecordDecoder,
        resume: u64,
    ) -> Result<RunSummary, IngestError> {
        let start = Instant::now();
        info!(
            workers = self.config.workers,
            queue_capacity = self.config.queue_capacity,
            batch_size = self.loader_config.batch_size,
            resume,
            "Starting ingestion pipeline"
        );

        let (tx, rx) = mpsc::channel::<RawRecord>(self.config.queue_capacity);
        let shared_rx = Arc::new(Mutex::new(rx));
        let queue_gauge = tx.downgrade();

        let producer = tokio::spawn(produce(
            decoder,
            resume,
            tx,
            Arc::clone(&self.counters),
            self.shutdown_tx.subscribe(),
            self.shutdown_tx.clone(),
        ));

        let mut workers = Vec::with_capacity(self.config.workers);
        for worker_id in 0..self.config.workers {
            let loader = BatchLoader::new(
                Arc::clone(&self.provider),
                self.loader_config.clone(),
            );
            workers.push(tokio::spawn(run_worker(
                worker_id,
                Arc::clone(&shared_rx),
                self.transformer.clone(),
                loader,
                Arc::clone(&self.counters),
                self.shutdown_tx.subscribe(),
                self.shutdown_tx.clone(),
            )));
        }

        let signal_shutdown = self.shutdown_tx.clone();
        let mut signal_done = self.shutdown_tx.subscribe();
        let signal_task = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal; stopping pipeline");
                    let _ = signal_shutdown.send(());
                }
                _ = signal_done.recv() => {}
            }
        });

        let monitor = ProgressMonitor::new(
            Arc::clone(&self.counters),
            queue_gauge,
            self.config.queue_capacity,
            start,
        );
        let monitor_task = tokio::spawn(monitor.run(self.shutdown_tx.subscribe()));

        let producer_result = producer
            .await
            .map_err(|e| IngestError::channel(e.to_string()))?;

        let mut first_error: Option<IngestError> = None;
        for handle in workers {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(IngestError::channel(e.to_string()));
                    }
                }
            }
        }

        // Stop the signal listener and progress monitor.
        let _ = self.shutdown_tx.send(());
        let _ = signal_task.await;
        let _ = monitor_task.await;

        // Counters stay accurate on failure: they cover exactly the batches
        // committed before the stop.
        if let Some(e) = first_error.or(producer_result.err()) {
            let summary = self.summary(start);
            error!(
                error = %e,
                processed = summary.processed,
                skipped_malformed = summary.skipped_malformed,
                "Pipeline stopped after unrecoverable failure"
            );
            return Err(e);
        }

        let summary = self.summary(start);
        info!(
            processed = summary.processed,
            skipped_malformed = summary.skipped_malformed,
            resume_skipped = summary.resume_skipped,
            elapsed_secs = summary.elapsed.as_secs_f64(),
            throughput = format!("{:.2}", summary.throughput),
            "Ingestion finished"
        );
        Ok(summary)
    }

    fn summary(&self, start: Instant) -> RunSummary {
        let elapsed = start.elapsed();
        let processed = self.counters.processed();
        let throughput = if elapsed.as_secs_f64() > 0.0 {
            processed as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };
        RunSummary {
            processed,
            skipped_malformed: self.counters.skipped_malformed(),
            resume_skipped: self.counters.resume_skipped(),
            elapsed,
            throughput,
        }
    }
}

/// Producer task: decode sequentially, apply the resume filter, feed the
/// queue. Dropping the sender on return is what closes the queue, so workers
/// only ever observe closure after end of input or cancellation.
async fn produce(
    mut decoder: RecordDecoder,
    resume: u64,
    tx: mpsc::Sender<RawRecord>,
    counters: Arc<RunCounters>,
    mut shutdown: broadcast::Receiver<()>,
    cancel: broadcast::Sender<()>,
) -> Result<(), IngestError> {
    let mut discarded = 0u64;
    loop {
        let next = tokio::select! {
            biased;
            _ = shutdown.recv() => {
                debug!("Producer stopping on shutdown signal");
                return Ok(());
            }
            next = decoder.next() => next,
        };

        let record = match next {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!("Input exhausted");
                return Ok(());
            }
            Err(e) => {
                error!(error = %e, "Decoder failed; cancelling pipeline");
                let _ = cancel.send(());
                return Err(e);
            }
        };

        if discarded < resume {
            discarded += 1;
            counters.record_resume_skip();
            if discarded == resume {
                info!(resume_skipped = discarded, "Resume offset reached");
            }
            continue;
        }

        tokio::select! {
            biased;
            _ = shutdown.recv() => {
                debug!("Producer stopping on shutdown signal");
                return Ok(());
            }
            sent = tx.send(record) => {
                if sent.is_err() {
                    return Err(IngestError::channel("record queue closed unexpectedly"));
                }
            }
        }
    }
}

/// Worker task: drain the shared queue, transform, and batch-load.
///
/// On queue closure (normal drain) the final partial batch is flushed; on a
/// shutdown signal the in-progress batch is abandoned so cancellation stays
/// prompt.
async fn run_worker(
    worker_id: usize,
    queue: Arc<Mutex<mpsc::Receiver<RawRecord>>>,
    transformer: RecordTransformer,
    mut loader: BatchLoader,
    counters: Arc<RunCounters>,
    mut shutdown: broadcast::Receiver<()>,
    cancel: broadcast::Sender<()>,
) -> Result<(), IngestError> {
    loop {
        let message = {
            let mut rx = queue.lock().await;
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    debug!(worker_id, "Worker stopping on shutdown signal");
                    return Ok(());
                }
                message = rx.recv() => message,
            }
        };

        match message {
            Some(raw) => {
                let document = transformer.transform(&raw);
                let identity = RecordTransformer::identity(&document);
                match loader.push(identity, document).await {
                    Ok(0) => {}
                    Ok(flushed) => {
                        let total = counters.add_processed(flushed as u64);
                        let previous = total - flushed as u64;
                        if crossed_milestone(previous, total) {
                            info!(processed = total, "Progress milestone");
                        }
                    }
                    Err(e) => {
                        error!(worker_id, error = %e, "Bulk write exhausted retries; cancelling pipeline");
                        let _ = cancel.send(());
                        return Err(e);
                    }
                }
            }
            None => {
                match loader.flush().await {
                    Ok(flushed) => {
                        if flushed > 0 {
                            counters.add_processed(flushed as u64);
                        }
                    }
                    Err(e) => {
                        error!(worker_id, error = %e, "Final flush failed; cancelling pipeline");
                        let _ = cancel.send(());
                        return Err(e);
                    }
                }
                debug!(worker_id, "Worker drained");
                return Ok(());
            }
        }
    }
}
