#![forbid(unsafe_code)]

use super::plan::BatchRange;
use crate::store::cells::cell_to_json;
use crate::store::{StoreError, now_ms, open_connection};
use gl_core::ids::TableId;
use gl_core::model::Column;
use gl_core::synth::synthetic_value;
use rusqlite::{Connection, ErrorCode, TransactionBehavior, params};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

/// VM instructions between deadline checks.
const PROGRESS_OPS: i32 = 1_000;

/// `?3` holds the row caches, `?4` the row ids; both arrays line up by index.
const INSERT_BATCH_SQL: &str = r#"
INSERT INTO table_rows(id, table_id, cache, search, created_at_ms)
SELECT ids.value, ?1, caches.value, NULL, ?2
FROM json_each(?3) AS caches
JOIN json_each(?4) AS ids ON ids.key = caches.key
ORDER BY caches.key
"#;

/// Everything a writer needs, shared read-only across the pool.
pub(super) struct WorkerContext<'a> {
    pub db_path: &'a Path,
    pub table_id: &'a TableId,
    pub seed: u64,
    /// Creation order; the position is the column index fed to the value rule.
    pub columns: &'a [Column],
    /// Sequence number of the job's first row.
    pub base_n: u64,
    pub batch_timeout: Duration,
}

#[derive(Debug)]
pub(super) struct BatchFailure {
    pub batch_index: usize,
    pub error: StoreError,
}

#[derive(Debug, Default)]
pub(super) struct PoolOutcome {
    pub rows_added: u64,
    pub batches_committed: usize,
    pub failures: Vec<BatchFailure>,
    /// Writers that never started (connection or thread spawn failure).
    pub writer_errors: Vec<String>,
    /// Batches still queued when the pool stopped.
    pub skipped_batches: usize,
    /// Batches lost with a panicked writer.
    pub panicked_writers: usize,
}

#[derive(Debug, Default)]
struct WorkerTally {
    rows_added: u64,
    batches_committed: usize,
    failures: Vec<BatchFailure>,
    start_error: Option<String>,
}

/// Runs up to `parallelism` writers over the shared batch queue. Writers pull
/// the next batch when they finish one, and stop pulling after any batch
/// fails.
pub(super) fn run_pool(
    ctx: &WorkerContext<'_>,
    plan: VecDeque<BatchRange>,
    parallelism: usize,
) -> PoolOutcome {
    let writers = parallelism.clamp(1, plan.len().max(1));
    let queue = Mutex::new(plan);
    let stop = AtomicBool::new(false);
    let mut outcome = PoolOutcome::default();

    std::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(writers);
        for worker_index in 0..writers {
            let queue = &queue;
            let stop = &stop;
            let spawned = std::thread::Builder::new()
                .name(format!("gl-bulk-writer-{worker_index}"))
                .spawn_scoped(scope, move || run_worker(worker_index, ctx, queue, stop));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    warn!(worker_index, error = %err, "bulk writer thread failed to spawn");
                    outcome.writer_errors.push(format!("spawn writer {worker_index}: {err}"));
                }
            }
        }

        for handle in handles {
            match handle.join() {
                Ok(tally) => {
                    outcome.rows_added += tally.rows_added;
                    outcome.batches_committed += tally.batches_committed;
                    outcome.failures.extend(tally.failures);
                    outcome.writer_errors.extend(tally.start_error);
                }
                Err(_) => {
                    stop.store(true, Ordering::Release);
                    outcome.panicked_writers += 1;
                }
            }
        }
    });

    outcome.skipped_batches = queue
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner)
        .len();
    outcome
}

fn run_worker(
    worker_index: usize,
    ctx: &WorkerContext<'_>,
    queue: &Mutex<VecDeque<BatchRange>>,
    stop: &AtomicBool,
) -> WorkerTally {
    let mut tally = WorkerTally::default();

    // The busy timeout doubles as the wait for the write lock, so a writer
    // queued behind its siblings is bounded by the same batch timeout.
    let mut conn = match open_connection(ctx.db_path, ctx.batch_timeout) {
        Ok(conn) => conn,
        Err(err) => {
            warn!(worker_index, error = %err, "bulk writer could not open the datastore");
            tally.start_error = Some(format!("open writer {worker_index}: {err}"));
            return tally;
        }
    };

    while !stop.load(Ordering::Acquire) {
        let next = queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let Some(batch) = next else {
            break;
        };

        let started = Instant::now();
        match write_batch(&mut conn, ctx, &batch) {
            Ok(rows) => {
                tally.rows_added += rows;
                tally.batches_committed += 1;
                debug!(
                    worker_index,
                    batch_index = batch.index,
                    rows,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "bulk batch committed"
                );
            }
            Err(error) => {
                warn!(
                    worker_index,
                    batch_index = batch.index,
                    error = %error,
                    "bulk batch rolled back"
                );
                stop.store(true, Ordering::Release);
                tally.failures.push(BatchFailure {
                    batch_index: batch.index,
                    error,
                });
            }
        }
    }
    tally
}

/// Serialized caches for the batch, in sequence order. Ids are not part of
/// the payload: they are minted under the write lock by [`insert_batch`].
fn batch_caches(ctx: &WorkerContext<'_>, batch: &BatchRange) -> Result<String, StoreError> {
    let mut rows = Vec::with_capacity(batch.len);
    for offset in batch.start..batch.start + batch.len {
        let n = ctx.base_n + offset as u64;
        let cache: Map<String, Value> = ctx
            .columns
            .iter()
            .enumerate()
            .map(|(index, column)| {
                let value = synthetic_value(ctx.seed, n, index, &column.name, column.column_type);
                (column.id.clone(), cell_to_json(value))
            })
            .collect();
        rows.push(cache);
    }
    Ok(serde_json::to_string(&rows)?)
}

fn row_ids(len: usize) -> Result<String, StoreError> {
    let ids: Vec<String> = (0..len).map(|_| Uuid::now_v7().to_string()).collect();
    Ok(serde_json::to_string(&ids)?)
}

/// Runs `write` with `synchronous = OFF` on this connection and puts it back
/// to `NORMAL` afterwards, whatever `write` returned.
fn with_relaxed_durability<T>(
    conn: &mut Connection,
    write: impl FnOnce(&mut Connection) -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    conn.execute_batch("PRAGMA synchronous = OFF;")?;
    let result = write(conn);
    if let Err(err) = conn.execute_batch("PRAGMA synchronous = NORMAL;") {
        warn!(error = %err, "failed to restore synchronous mode on bulk writer");
    }
    result
}

/// Interrupts from the progress handler and lock waits that outlived the
/// busy timeout are both the batch running out of time.
fn is_timeout(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::OperationInterrupted | ErrorCode::DatabaseBusy)
    )
}

/// Writes one batch in its own transaction with durability relaxed for that
/// transaction only. A failure rolls back this batch and nothing else.
fn write_batch(
    conn: &mut Connection,
    ctx: &WorkerContext<'_>,
    batch: &BatchRange,
) -> Result<u64, StoreError> {
    let caches = batch_caches(ctx, batch)?;

    with_relaxed_durability(conn, |conn| {
        let deadline = Instant::now() + ctx.batch_timeout;
        conn.progress_handler(PROGRESS_OPS, Some(move || Instant::now() >= deadline));
        let result = insert_batch(conn, ctx.table_id, &caches, batch.len);
        conn.progress_handler(0, None::<fn() -> bool>);

        match result {
            Ok(inserted) => Ok(inserted as u64),
            Err(StoreError::Sql(err)) if is_timeout(&err) => Err(StoreError::BatchTimeout {
                batch_index: batch.index,
                timeout_ms: ctx.batch_timeout.as_millis().min(u64::MAX as u128) as u64,
            }),
            Err(err) => Err(err),
        }
    })
}

fn insert_batch(
    conn: &mut Connection,
    table_id: &TableId,
    caches: &str,
    len: usize,
) -> Result<usize, StoreError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    // Timestamp and ids are both taken while the write lock is held: a later
    // commit always gets a larger (created_at_ms, id) key than an earlier one.
    let created_at_ms = now_ms();
    let ids = row_ids(len)?;
    let inserted = tx.execute(
        INSERT_BATCH_SQL,
        params![table_id.as_str(), created_at_ms, caches, ids],
    )?;
    tx.commit()?;
    Ok(inserted)
}
