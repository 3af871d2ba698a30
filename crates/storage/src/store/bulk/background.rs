#![forbid(unsafe_code)]

use super::indexes::{DroppedIndex, rebuild_indexes};
use crate::store::cells::search_for_cache;
use crate::store::schema::ROWS_TABLE;
use crate::store::tables::load_columns;
use crate::store::{BackgroundPass, BackgroundSummary, StoreError, open_connection};
use gl_core::ids::TableId;
use gl_core::model::Column;
use rusqlite::{Connection, TransactionBehavior, params};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

const BACKFILL_CHUNK: i64 = 2_000;

pub(super) struct BackgroundJob {
    pub db_path: PathBuf,
    pub table_id: TableId,
    pub dropped: Vec<DroppedIndex>,
    pub busy_timeout: Duration,
}

pub(super) fn spawn(job: BackgroundJob) -> Result<BackgroundPass, StoreError> {
    let handle = std::thread::Builder::new()
        .name("gl-bulk-background".to_string())
        .spawn(move || run(job))?;
    Ok(BackgroundPass::new(handle))
}

/// Index rebuild, then search backfill, then statistics. Every step is
/// attempted even when an earlier one failed; failures are logged and kept
/// in the summary only.
fn run(job: BackgroundJob) -> BackgroundSummary {
    let mut summary = BackgroundSummary::default();
    let table = job.table_id.as_str();

    let mut conn = match open_connection(&job.db_path, job.busy_timeout) {
        Ok(conn) => conn,
        Err(err) => {
            warn!(table_id = table, error = %err, "background pass could not open the datastore");
            summary.errors.push(format!("open: {err}"));
            return summary;
        }
    };

    if !job.dropped.is_empty() {
        let (rebuilt, errors) = rebuild_indexes(&conn, &job.dropped);
        summary.indexes_rebuilt = rebuilt;
        summary.errors.extend(errors);
    }

    let backfilled = load_columns(&conn, &job.table_id)
        .and_then(|columns| backfill_search(&mut conn, &job.table_id, &columns));
    match backfilled {
        Ok(rows) => summary.rows_backfilled = rows,
        Err(err) => {
            warn!(table_id = table, error = %err, "search backfill failed");
            summary.errors.push(format!("backfill: {err}"));
        }
    }

    match refresh_statistics(&conn) {
        Ok(()) => summary.statistics_refreshed = true,
        Err(err) => {
            warn!(table_id = table, error = %err, "statistics refresh failed");
            summary.errors.push(format!("analyze: {err}"));
        }
    }

    info!(
        table_id = table,
        rows_backfilled = summary.rows_backfilled,
        indexes_rebuilt = summary.indexes_rebuilt,
        statistics_refreshed = summary.statistics_refreshed,
        errors = summary.errors.len(),
        "background pass finished"
    );
    summary
}

fn parse_cache(row_id: &str, cache: &str) -> Map<String, Value> {
    match serde_json::from_str::<Value>(cache) {
        Ok(Value::Object(map)) => map,
        _ => {
            warn!(row_id, "row cache is not a JSON object; indexing it as empty");
            Map::new()
        }
    }
}

/// Fills `search` for every row of the table where it is still null.
/// Rows already indexed are never recomputed.
pub(crate) fn backfill_search(
    conn: &mut Connection,
    table_id: &TableId,
    columns: &[Column],
) -> Result<u64, StoreError> {
    let mut total = 0u64;
    loop {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let pending = {
            let mut stmt = tx.prepare(
                "SELECT id, cache FROM table_rows WHERE table_id=?1 AND search IS NULL LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![table_id.as_str(), BACKFILL_CHUNK], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            out
        };
        if pending.is_empty() {
            tx.commit()?;
            break;
        }

        let mut updated = 0u64;
        {
            let mut update =
                tx.prepare("UPDATE table_rows SET search=?2 WHERE id=?1 AND search IS NULL")?;
            for (row_id, cache) in &pending {
                let search = search_for_cache(columns, &parse_cache(row_id, cache));
                updated += update.execute(params![row_id, search])? as u64;
            }
        }
        tx.commit()?;
        total += updated;
    }
    Ok(total)
}

pub(crate) fn refresh_statistics(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(&format!("ANALYZE {ROWS_TABLE};"))?;
    Ok(())
}
