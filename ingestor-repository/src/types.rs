//! Request and response types for bulk write operations.

/// One failed item from a bulk write response.
///
/// Carries enough of the backend's per-item error to let the submitter judge
/// whether the failure is transient (retry the batch) or benign (e.g. an
/// idempotent duplicate write that lost a version race).
#[derive(Debug, Clone)]
pub struct BulkItemFailure {
    /// The document identity the action targeted.
    pub id: String,
    /// HTTP-style status for the item.
    pub status: u16,
    /// Backend error type (e.g. "version_conflict_engine_exception").
    pub error_type: String,
    /// Human-readable reason from the backend.
    pub reason: String,
}

impl BulkItemFailure {
    /// Whether this item failure is benign for retry purposes.
    ///
    /// Upserts are keyed by deterministic identity, so a version conflict
    /// means the same document was already written (e.g. by a previous run
    /// that crashed after committing). Treating it as success keeps
    /// re-ingestion idempotent.
    pub fn is_benign(&self) -> bool {
        self.error_type == "version_conflict_engine_exception"
    }
}

/// Summary of one bulk write containing aggregate counts and item failures.
///
/// Successful items are only counted; failed items are reported individually
/// so callers can inspect them and decide whether the batch must be retried.
#[derive(Debug, Clone)]
pub struct BulkWriteSummary {
    /// Total number of actions in the bulk request.
    pub total: usize,
    /// Number of items the backend accepted.
    pub succeeded: usize,
    /// Number of items the backend rejected.
    pub failed: usize,
    /// Individual failures, empty when the whole batch succeeded.
    pub failures: Vec<BulkItemFailure>,
}

impl BulkWriteSummary {
    /// Summary for a fully successful batch of `total` items.
    pub fn success(total: usize) -> Self {
        Self {
            total,
            succeeded: total,
            failed: 0,
            failures: Vec::new(),
        }
    }

    /// Whether every reported failure is benign (see [`BulkItemFailure::is_benign`]).
    pub fn all_failures_benign(&self) -> bool {
        self.failures.iter().all(|f| f.is_benign())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_summary() {
        let summary = BulkWriteSummary::success(10);
        assert_eq!(summary.total, 10);
        assert_eq!(summary.succeeded, 10);
        assert_eq!(summary.failed, 0);
        assert!(summary.all_failures_benign());
    }

    #[test]
    fn test_version_conflict_is_benign() {
        let failure = BulkItemFailure {
            id: "abc".to_string(),
            status: 409,
            error_type: "version_conflict_engine_exception".to_string(),
            reason: "version conflict".to_string(),
        };
        assert!(failure.is_benign());
    }

    #[test]
    fn test_mapper_failure_is_not_benign() {
        let failure = BulkItemFailure {
            id: "abc".to_string(),
            status: 400,
            error_type: "mapper_parsing_exception".to_string(),
            reason: "failed to parse".to_string(),
        };
        assert!(!failure.is_benign());

        let summary = BulkWriteSummary {
            total: 2,
            succeeded: 1,
            failed: 1,
            failures: vec![failure],
        };
        assert!(!summary.all_failures_benign());
    }
}
