#![forbid(unsafe_code)]

mod background;
mod indexes;
mod plan;
mod worker;

use super::lease::LeaseGuard;
use super::tables::{count_rows, load_columns, table_exists};
use super::*;
use gl_core::model::{Column, in_creation_order};
use gl_core::synth::table_seed;
use tracing::{info, warn};

const LEASE_TTL_FLOOR: Duration = Duration::from_secs(60);
const LEASE_TTL_CEILING: Duration = Duration::from_secs(60 * 60);
const LEASE_TTL_PER_ROW: Duration = Duration::from_millis(2);

/// Lease lifetime for a job of `count` rows: a one minute floor plus a small
/// per-row allowance, capped at one hour. Expiry is the backstop when a job
/// dies without releasing.
pub fn bulk_lease_ttl(count: usize) -> Duration {
    let rows = u32::try_from(count).unwrap_or(u32::MAX);
    LEASE_TTL_FLOOR
        .saturating_add(LEASE_TTL_PER_ROW.saturating_mul(rows))
        .min(LEASE_TTL_CEILING)
}

fn same_column_set(stored: &[Column], supplied: &[Column]) -> bool {
    stored.len() == supplied.len() && in_creation_order(stored) == in_creation_order(supplied)
}

impl SqliteStore {
    /// Caller-facing entry point: clamps `count` to [`MAX_BULK_ROWS`] and uses
    /// the table's current columns with the configured tuning.
    pub fn generate_bulk_rows_for_table(
        &mut self,
        table_id: &str,
        count: usize,
    ) -> Result<BulkGenerateReport, StoreError> {
        if count == 0 {
            return Err(StoreError::InvalidInput("count must be positive"));
        }
        let table = canonicalize_table(table_id)?;
        let columns = load_columns(&self.conn, &table)?;
        let clamped = count.min(MAX_BULK_ROWS);
        if clamped < count {
            info!(
                table_id = table.as_str(),
                requested = count,
                clamped,
                "bulk row count clamped"
            );
        }
        let mut report = self.generate_bulk_rows(BulkGenerateRequest {
            table_id: table.into_string(),
            columns,
            count: clamped,
            batch_size: None,
            parallelism: None,
        })?;
        report.requested_count = count;
        Ok(report)
    }

    /// Materializes `count` synthetic rows with parallel batched writers.
    ///
    /// Every validation runs before any write. Batches then commit on their
    /// own, so a job that fails midway still leaves the committed batches in
    /// place and reports [`BulkOutcome::PartiallyCompleted`]; the exact table
    /// size after such a job is only available from [`SqliteStore::rows_count`].
    ///
    /// The table's bulk lease is held while writers run and released on every
    /// exit path. The search backfill, index rebuild and statistics refresh
    /// run on a detached thread afterwards.
    pub fn generate_bulk_rows(
        &mut self,
        request: BulkGenerateRequest,
    ) -> Result<BulkGenerateReport, StoreError> {
        let table_id = canonicalize_table(&request.table_id)?;
        if request.count == 0 {
            return Err(StoreError::InvalidInput("count must be positive"));
        }
        if request.count > MAX_BULK_ROWS {
            return Err(StoreError::InvalidInput("count exceeds the bulk row ceiling"));
        }
        if request.columns.is_empty() {
            return Err(StoreError::InvalidInput("column set must not be empty"));
        }
        if !table_exists(&self.conn, &table_id)? {
            return Err(StoreError::UnknownTable);
        }
        let stored = load_columns(&self.conn, &table_id)?;
        if !same_column_set(&stored, &request.columns) {
            return Err(StoreError::ColumnSetMismatch {
                expected: stored.len(),
                supplied: request.columns.len(),
            });
        }

        let count = request.count;
        let batch_size = request
            .batch_size
            .unwrap_or(self.config.batch_size)
            .clamp(1, MAX_BATCH_SIZE);
        let parallelism = request
            .parallelism
            .unwrap_or(self.config.parallelism)
            .clamp(1, MAX_PARALLELISM);
        let columns = in_creation_order(&stored);

        let lease = LeaseGuard::acquire(&self.conn, &table_id, bulk_lease_ttl(count))?;
        let base_n = count_rows(&self.conn, &table_id)?;

        let projected_values = (count as u64).saturating_mul(columns.len() as u64);
        let dropped = if projected_values > self.config.index_churn_threshold {
            info!(
                table_id = table_id.as_str(),
                projected_values,
                threshold = self.config.index_churn_threshold,
                "dropping row indexes for bulk load"
            );
            indexes::drop_secondary_indexes(&self.conn)?
        } else {
            Vec::new()
        };

        let plan = plan::plan_batches(count, batch_size);
        let batches_total = plan.len();
        info!(
            table_id = table_id.as_str(),
            count, batch_size, parallelism, batches_total, "bulk job started"
        );

        let ctx = worker::WorkerContext {
            db_path: &self.db_path,
            table_id: &table_id,
            seed: table_seed(&table_id),
            columns: &columns,
            base_n,
            batch_timeout: self.config.batch_timeout,
        };
        let pool = worker::run_pool(&ctx, plan, parallelism);

        if let Err(err) = lease.release() {
            warn!(
                table_id = table_id.as_str(),
                error = %err,
                "bulk lease release failed; waiting for expiry"
            );
        }

        let failed_batches = pool.failures.len() + pool.panicked_writers;
        let outcome = if pool.batches_committed == batches_total {
            BulkOutcome::Completed {
                rows_added: pool.rows_added,
            }
        } else {
            let first_error = pool
                .failures
                .iter()
                .min_by_key(|failure| failure.batch_index)
                .map(|failure| failure.error.to_string())
                .or_else(|| pool.writer_errors.first().cloned())
                .unwrap_or_else(|| StoreError::WorkerPanicked.to_string());
            BulkOutcome::PartiallyCompleted {
                rows_added: pool.rows_added,
                failed_batches,
                skipped_batches: pool.skipped_batches,
                first_error,
            }
        };

        info!(
            table_id = table_id.as_str(),
            status = outcome.status(),
            rows_added = outcome.rows_added(),
            batches_committed = pool.batches_committed,
            batches_total,
            "bulk job finished"
        );

        let dropped_indexes = dropped.iter().map(|index| index.name.clone()).collect();
        let background = match background::spawn(background::BackgroundJob {
            db_path: self.db_path.clone(),
            table_id: table_id.clone(),
            dropped,
            busy_timeout: self.config.batch_timeout,
        }) {
            Ok(pass) => Some(pass),
            Err(err) => {
                warn!(table_id = table_id.as_str(), error = %err, "background pass failed to start");
                None
            }
        };

        Ok(BulkGenerateReport {
            table_id: table_id.into_string(),
            requested_count: count,
            count,
            outcome,
            batches_total,
            batches_committed: pool.batches_committed,
            dropped_indexes,
            background,
        })
    }

    /// Runs the search backfill for one table inline. Returns the number of
    /// rows whose `search` was filled.
    pub fn backfill_search(&mut self, table_id: &str) -> Result<u64, StoreError> {
        let table_id = canonicalize_table(table_id)?;
        let columns = load_columns(&self.conn, &table_id)?;
        background::backfill_search(&mut self.conn, &table_id, &columns)
    }

    pub fn refresh_statistics(&self) -> Result<(), StoreError> {
        background::refresh_statistics(&self.conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lease_ttl_has_floor_and_ceiling() {
        assert_eq!(bulk_lease_ttl(1), Duration::from_millis(60_002));
        assert_eq!(bulk_lease_ttl(100_000), Duration::from_secs(260));
        assert_eq!(bulk_lease_ttl(usize::MAX), LEASE_TTL_CEILING);
    }
}
