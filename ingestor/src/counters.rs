//! Shared atomic counters for one ingestion run.
//!
//! Counters are the only state mutated concurrently: workers increment them,
//! the progress monitor and final summary read them. Everything else in the
//! pipeline (batches, decoder cursor) is exclusively owned by one task.

use std::sync::atomic::{AtomicU64, Ordering};

/// Processed-count multiple at which workers emit a milestone log line.
pub const PROGRESS_MILESTONE: u64 = 100_000;

/// Process-wide counters for one ingestion run.
#[derive(Debug, Default)]
pub struct RunCounters {
    processed: AtomicU64,
    skipped_malformed: AtomicU64,
    resume_skipped: AtomicU64,
}

impl RunCounters {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add successfully committed documents; returns the new total.
    pub fn add_processed(&self, count: u64) -> u64 {
        self.processed.fetch_add(count, Ordering::Relaxed) + count
    }

    /// Record one malformed record that was skipped.
    pub fn record_malformed(&self) {
        self.skipped_malformed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one record discarded by the resume filter.
    pub fn record_resume_skip(&self) {
        self.resume_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Total documents committed to the index so far.
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Total malformed records skipped so far.
    pub fn skipped_malformed(&self) -> u64 {
        self.skipped_malformed.load(Ordering::Relaxed)
    }

    /// Total records discarded by the resume filter.
    pub fn resume_skipped(&self) -> u64 {
        self.resume_skipped.load(Ordering::Relaxed)
    }
}

/// Whether the processed counter crossed a milestone multiple between two
/// observed totals.
pub fn crossed_milestone(previous_total: u64, new_total: u64) -> bool {
    previous_total / PROGRESS_MILESTONE != new_total / PROGRESS_MILESTONE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_processed_returns_new_total() {
        let counters = RunCounters::new();
        assert_eq!(counters.add_processed(100), 100);
        assert_eq!(counters.add_processed(50), 150);
        assert_eq!(counters.processed(), 150);
    }

    #[test]
    fn test_malformed_and_resume_counts() {
        let counters = RunCounters::new();
        counters.record_malformed();
        counters.record_malformed();
        counters.record_resume_skip();
        assert_eq!(counters.skipped_malformed(), 2);
        assert_eq!(counters.resume_skipped(), 1);
    }

    #[test]
    fn test_crossed_milestone() {
        assert!(crossed_milestone(
            PROGRESS_MILESTONE - 1,
            PROGRESS_MILESTONE
        ));
        assert!(crossed_milestone(
            PROGRESS_MILESTONE - 1,
            PROGRESS_MILESTONE + 500
        ));
        assert!(!crossed_milestone(10, 20));
        assert!(!crossed_milestone(
            PROGRESS_MILESTONE,
            PROGRESS_MILESTONE + 1
        ));
    }
}
