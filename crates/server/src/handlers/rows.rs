#![forbid(unsafe_code)]

use crate::*;
use crate::entry::write_response;
use crate::handlers::BULK_METHOD;
use gl_storage::{
    BulkGenerateReport, BulkOutcome, PageRequest, PageRow, PageSizing, SqliteStore, StoreConfig,
};
use serde_json::{Value, json};
use std::path::Path;
use tracing::warn;

fn bulk_message(report: &BulkGenerateReport) -> String {
    match &report.outcome {
        BulkOutcome::Completed { rows_added } => format!("Added {rows_added} rows."),
        BulkOutcome::PartiallyCompleted {
            rows_added,
            first_error,
            ..
        } => format!(
            "Bulk generation stopped after adding {rows_added} of {} rows: {first_error}. \
             Call rows.count for the exact table size.",
            report.count
        ),
    }
}

fn run_bulk_job(storage_dir: &Path, config: StoreConfig, table_id: &str, count: usize) -> Value {
    let mut store = match SqliteStore::open_with_config(storage_dir, config) {
        Ok(store) => store,
        Err(err) => return store_error_envelope(err),
    };
    match store.generate_bulk_rows_for_table(table_id, count) {
        Ok(report) => bulk_envelope(report),
        Err(err) => store_error_envelope(err),
    }
}

fn bulk_envelope(report: BulkGenerateReport) -> Value {
    let mut warnings = Vec::new();
    if report.count < report.requested_count {
        warnings.push(warning(
            "COUNT_CLAMPED",
            &format!(
                "count was clamped from {} to {}",
                report.requested_count, report.count
            ),
        ));
    }
    if let BulkOutcome::PartiallyCompleted {
        failed_batches,
        skipped_batches,
        ..
    } = &report.outcome
    {
        warnings.push(warning(
            "PARTIAL_SUCCESS",
            &format!(
                "{failed_batches} batch(es) failed and {skipped_batches} were not attempted; \
                 committed batches were kept"
            ),
        ));
    }

    let result = json!({
        "success": report.outcome.is_completed(),
        "rowsAdded": report.outcome.rows_added(),
        "status": report.outcome.status(),
        "message": bulk_message(&report),
        "tableId": report.table_id,
        "requestedCount": report.requested_count,
        "count": report.count,
        "batchesTotal": report.batches_total,
        "batchesCommitted": report.batches_committed,
        "droppedIndexes": report.dropped_indexes,
    });
    // The background pass keeps running detached once the handle drops.
    drop(report.background);
    ai_ok_with_warnings(BULK_METHOD, result, warnings)
}

fn row_json(row: PageRow) -> Value {
    json!({
        "id": row.id,
        "createdAt": rfc3339_ms(row.created_at_ms),
        "createdAtMs": row.created_at_ms,
        "data": row.data,
    })
}

impl GridServer {
    /// Validates the request, then runs the job on its own thread and store
    /// so reads, lease checks and view-state saves keep being served while it
    /// writes. Returns a body only when the request is answered right away.
    pub(crate) fn start_bulk_job(&mut self, id: Option<Value>, args: Args) -> Option<Value> {
        let table_id = match require_string(&args, "tableId") {
            Ok(v) => v,
            Err(resp) => return Some(resp),
        };
        let count = match require_usize(&args, "count") {
            Ok(v) => v,
            Err(resp) => return Some(resp),
        };
        if count == 0 {
            return Some(ai_error("INVALID_INPUT", "count must be positive"));
        }
        if let Err(err) = self.store.rows_count(&table_id) {
            return Some(store_error_envelope(err));
        }

        let storage_dir = self.storage_dir().to_path_buf();
        let config = self.store.config().clone();
        let spawned = std::thread::Builder::new()
            .name("gl-bulk-job".to_string())
            .spawn(move || {
                let body = run_bulk_job(&storage_dir, config, &table_id, count);
                if let Some(id) = id
                    && let Err(err) = write_response(&json_rpc_response(Some(id), body))
                {
                    warn!(error = %err, "failed to write bulk job response");
                }
            });
        match spawned {
            Ok(job) => {
                self.track_job(job);
                None
            }
            Err(err) => Some(ai_error(
                "STORE_ERROR",
                &format!("bulk job failed to start: {err}"),
            )),
        }
    }

    pub(crate) fn tool_rows_page(&mut self, args: Args) -> Value {
        let table_id = match require_string(&args, "tableId") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let cursor = match optional_string(&args, "cursor") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let limit = match optional_usize(&args, "limit") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let sizing = match optional_string(&args, "sizing") {
            Ok(None) => PageSizing::default(),
            Ok(Some(raw)) => match PageSizing::parse(&raw) {
                Some(v) => v,
                None => {
                    return ai_error(
                        "INVALID_INPUT",
                        "sizing must be one of: fixed|sweep_remainder",
                    );
                }
            },
            Err(resp) => return resp,
        };

        let page = match self.store.rows_page(PageRequest {
            table_id: table_id.clone(),
            cursor,
            limit,
            sizing,
        }) {
            Ok(page) => page,
            Err(err) => return store_error_envelope(err),
        };

        let mut warnings = Vec::new();
        if page.cursor_reset {
            warnings.push(warning(
                "CURSOR_RESET",
                "cursor was malformed or stale; returned the first page instead",
            ));
        }
        let result = json!({
            "tableId": table_id,
            "rows": page.rows.into_iter().map(row_json).collect::<Vec<_>>(),
            "nextCursor": page.next_cursor,
            "hasMore": page.has_more,
            "totalCount": page.total_count,
            "limit": page.limit,
            "sizing": sizing.as_str(),
            "cursorReset": page.cursor_reset,
        });
        ai_ok_with_warnings("rows.page", result, warnings)
    }

    pub(crate) fn tool_rows_count(&mut self, args: Args) -> Value {
        let table_id = match require_string(&args, "tableId") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        match self.store.rows_count(&table_id) {
            Ok(count) => ai_ok("rows.count", json!({ "tableId": table_id, "count": count })),
            Err(err) => store_error_envelope(err),
        }
    }
}
