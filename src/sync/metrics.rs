//! Run-wide indexing counters.

use parking_lot::Mutex;
use serde::Serialize;

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncMetrics {
    /// Batches that were attempted (each counted once, however many retries it took)
    pub total_batches: usize,
    /// Batches that ended in terminal failure
    pub failed_batches: usize,
    /// Documents the sink reported as upserted
    pub successful_documents: usize,
}

/// Shared handle to [`SyncMetrics`]; every update takes the same lock.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    inner: Mutex<SyncMetrics>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_batch_started(&self) {
        self.inner.lock().total_batches += 1;
    }

    pub fn record_batch_failed(&self) {
        self.inner.lock().failed_batches += 1;
    }

    pub fn record_documents(&self, count: usize) {
        self.inner.lock().successful_documents += count;
    }

    pub fn snapshot(&self) -> SyncMetrics {
        *self.inner.lock()
    }
}
