#![forbid(unsafe_code)]

use gl_core::model::Column;
use std::thread::JoinHandle;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkGenerateRequest {
    pub table_id: String,
    /// Must be the table's current column set.
    pub columns: Vec<Column>,
    pub count: usize,
    pub batch_size: Option<usize>,
    pub parallelism: Option<usize>,
}

/// Result of a bulk job. Batches commit independently, so a failed job may
/// still have added rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BulkOutcome {
    Completed {
        rows_added: u64,
    },
    PartiallyCompleted {
        rows_added: u64,
        failed_batches: usize,
        skipped_batches: usize,
        first_error: String,
    },
}

impl BulkOutcome {
    /// Rows committed by this job as observed by its own writers. Concurrent
    /// writers are not reflected; re-query the row count for the table total.
    pub fn rows_added(&self) -> u64 {
        match self {
            BulkOutcome::Completed { rows_added } => *rows_added,
            BulkOutcome::PartiallyCompleted { rows_added, .. } => *rows_added,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, BulkOutcome::Completed { .. })
    }

    pub fn status(&self) -> &'static str {
        match self {
            BulkOutcome::Completed { .. } => "completed",
            BulkOutcome::PartiallyCompleted { .. } => "partially_completed",
        }
    }
}

#[derive(Debug)]
pub struct BulkGenerateReport {
    pub table_id: String,
    pub requested_count: usize,
    pub count: usize,
    pub outcome: BulkOutcome,
    pub batches_total: usize,
    pub batches_committed: usize,
    pub dropped_indexes: Vec<String>,
    /// Detached post-processing (search backfill, index rebuild, statistics).
    /// Dropping this leaves the pass running.
    pub background: Option<BackgroundPass>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BackgroundSummary {
    pub rows_backfilled: u64,
    pub indexes_rebuilt: usize,
    pub statistics_refreshed: bool,
    pub errors: Vec<String>,
}

#[derive(Debug)]
pub struct BackgroundPass {
    handle: JoinHandle<BackgroundSummary>,
}

impl BackgroundPass {
    pub(crate) fn new(handle: JoinHandle<BackgroundSummary>) -> Self {
        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Blocks until the pass finishes. `None` if the pass panicked.
    pub fn wait(self) -> Option<BackgroundSummary> {
        self.handle.join().ok()
    }
}
