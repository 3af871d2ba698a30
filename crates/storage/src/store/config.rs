#![forbid(unsafe_code)]

use std::time::Duration;

/// Caller-facing ceiling on rows per bulk request.
pub const MAX_BULK_ROWS: usize = 100_000;
pub const MAX_BATCH_SIZE: usize = 50_000;
pub const MAX_PARALLELISM: usize = 8;
pub const MAX_PAGE_LIMIT: usize = 100_000;

const MIN_BATCH_TIMEOUT_MS: u64 = 1_000;
const MAX_BATCH_TIMEOUT_MS: u64 = 600_000;

/// Tuning knobs for the bulk and pagination paths.
///
/// Values outside the hard ceilings are clamped by [`StoreConfig::normalized`],
/// which the store applies on open.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    pub batch_size: usize,
    pub parallelism: usize,
    pub batch_timeout: Duration,
    /// Projected `rows x columns` above which secondary row indexes are
    /// dropped for the duration of a bulk job.
    pub index_churn_threshold: u64,
    pub first_page_limit: usize,
    pub page_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            batch_size: 20_000,
            parallelism: 2,
            batch_timeout: Duration::from_secs(60),
            index_churn_threshold: 2_000_000,
            first_page_limit: 500,
            page_limit: 5_000,
        }
    }
}

impl StoreConfig {
    pub fn normalized(self) -> Self {
        let timeout_ms = (self.batch_timeout.as_millis().min(u64::MAX as u128) as u64)
            .clamp(MIN_BATCH_TIMEOUT_MS, MAX_BATCH_TIMEOUT_MS);
        Self {
            batch_size: self.batch_size.clamp(1, MAX_BATCH_SIZE),
            parallelism: self.parallelism.clamp(1, MAX_PARALLELISM),
            batch_timeout: Duration::from_millis(timeout_ms),
            index_churn_threshold: self.index_churn_threshold.max(1),
            first_page_limit: self.first_page_limit.clamp(1, MAX_PAGE_LIMIT),
            page_limit: self.page_limit.clamp(1, MAX_PAGE_LIMIT),
        }
    }
}
