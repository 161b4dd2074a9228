//! Periodic progress reporting.
//!
//! A standalone task that logs throughput and queue depth at a fixed
//! interval. It holds only a weak handle to the queue sender, so it never
//! keeps the queue alive past the producer.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use crate::counters::RunCounters;
use ingestor_shared::RawRecord;

/// Interval between progress log lines.
pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(10);

/// Periodic reporter of processed counts, throughput and queue depth.
pub struct ProgressMonitor {
    counters: Arc<RunCounters>,
    queue: mpsc::WeakSender<RawRecord>,
    queue_capacity: usize,
    start: Instant,
}

impl ProgressMonitor {
    pub fn new(
        counters: Arc<RunCounters>,
        queue: mpsc::WeakSender<RawRecord>,
        queue_capacity: usize,
        start: Instant,
    ) -> Self {
        Self {
            counters,
            queue,
            queue_capacity,
            start,
        }
    }

    /// Log progress at a fixed interval until shutdown.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let mut timer = interval(PROGRESS_INTERVAL);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick fires immediately; skip it so the first report
        // carries a full interval of work.
        timer.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = timer.tick() => self.report(),
            }
        }
    }

    fn report(&self) {
        let processed = self.counters.processed();
        let elapsed = self.start.elapsed().as_secs_f64();
        let throughput = if elapsed > 0.0 {
            processed as f64 / elapsed
        } else {
            0.0
        };
        info!(
            processed,
            skipped_malformed = self.counters.skipped_malformed(),
            queue_depth = self.queue_depth(),
            elapsed_secs = elapsed as u64,
            throughput = format!("{:.2}", throughput),
            "Ingestion progress"
        );
    }

    /// Records currently waiting in the queue, or zero once the producer has
    /// dropped its sender.
    fn queue_depth(&self) -> usize {
        match self.queue.upgrade() {
            Some(sender) => self.queue_capacity.saturating_sub(sender.capacity()),
            None => 0,
        }
    }
}
