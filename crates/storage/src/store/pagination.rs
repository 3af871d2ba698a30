#![forbid(unsafe_code)]

use super::tables::{count_rows, load_columns};
use super::*;
use gl_core::cursor::PageCursor;
use gl_core::model::Column;
use rusqlite::{OptionalExtension, params};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

struct RawRow {
    id: String,
    created_at_ms: i64,
    cache: String,
}

fn read_raw_row(row: &rusqlite::Row<'_>) -> Result<RawRow, rusqlite::Error> {
    Ok(RawRow {
        id: row.get(0)?,
        created_at_ms: row.get(1)?,
        cache: row.get(2)?,
    })
}

fn project_row(columns: &[Column], raw: RawRow) -> PageRow {
    let cache = match serde_json::from_str::<Value>(&raw.cache) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    let data: BTreeMap<String, Value> = columns
        .iter()
        .map(|column| {
            let value = cache.get(&column.id).cloned().unwrap_or(Value::Null);
            (column.id.clone(), value)
        })
        .collect();
    PageRow {
        id: raw.id,
        created_at_ms: raw.created_at_ms,
        data,
    }
}

impl SqliteStore {
    /// Reads one page of a table's rows in `(created_at, id)` order.
    ///
    /// Pages are read-committed, not a snapshot: rows committed after an
    /// earlier page whose key sorts after its cursor show up on a later page.
    /// A malformed cursor, or one whose row no longer exists, restarts from
    /// the first page and sets `cursor_reset`.
    pub fn rows_page(&self, request: PageRequest) -> Result<PageResult, StoreError> {
        let table_id = canonicalize_table(&request.table_id)?;
        let columns = load_columns(&self.conn, &table_id)?;

        let mut cursor_reset = false;
        let cursor = match request.cursor.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(token) => match PageCursor::decode(token) {
                Ok(cursor) => {
                    if self.cursor_row_exists(&table_id, &cursor)? {
                        Some(cursor)
                    } else {
                        debug!(table_id = table_id.as_str(), "stale page cursor; restarting");
                        cursor_reset = true;
                        None
                    }
                }
                Err(err) => {
                    debug!(table_id = table_id.as_str(), error = %err, "malformed page cursor; restarting");
                    cursor_reset = true;
                    None
                }
            },
        };

        let total_count = count_rows(&self.conn, &table_id)?;
        let limit = self.page_limit(cursor.is_none(), request.limit, request.sizing, total_count);
        let fetch = to_sqlite_i64(limit.saturating_add(1))?;

        let mut raw_rows = Vec::new();
        match cursor.as_ref() {
            None => {
                let mut stmt = self.conn.prepare(
                    r#"
                    SELECT id, created_at_ms, cache
                    FROM table_rows
                    WHERE table_id=?1
                    ORDER BY created_at_ms ASC, id ASC
                    LIMIT ?2
                    "#,
                )?;
                let rows = stmt.query_map(params![table_id.as_str(), fetch], read_raw_row)?;
                for row in rows {
                    raw_rows.push(row?);
                }
            }
            Some(cursor) => {
                let mut stmt = self.conn.prepare(
                    r#"
                    SELECT id, created_at_ms, cache
                    FROM table_rows
                    WHERE table_id=?1 AND (created_at_ms, id) > (?2, ?3)
                    ORDER BY created_at_ms ASC, id ASC
                    LIMIT ?4
                    "#,
                )?;
                let rows = stmt.query_map(
                    params![table_id.as_str(), cursor.created_at_ms, cursor.row_id, fetch],
                    read_raw_row,
                )?;
                for row in rows {
                    raw_rows.push(row?);
                }
            }
        }

        let has_more = raw_rows.len() > limit;
        raw_rows.truncate(limit);

        let rows: Vec<PageRow> = raw_rows
            .into_iter()
            .map(|raw| project_row(&columns, raw))
            .collect();
        let next_cursor = if has_more {
            rows.last()
                .map(|row| PageCursor::new(row.created_at_ms, row.id.clone()).encode())
        } else {
            None
        };

        Ok(PageResult {
            rows,
            next_cursor,
            has_more,
            total_count,
            limit,
            cursor_reset,
        })
    }

    fn cursor_row_exists(&self, table_id: &TableId, cursor: &PageCursor) -> Result<bool, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT 1 FROM table_rows WHERE id=?1 AND table_id=?2 AND created_at_ms=?3",
                params![cursor.row_id, table_id.as_str(), cursor.created_at_ms],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .is_some())
    }

    fn page_limit(
        &self,
        first_page: bool,
        requested: Option<usize>,
        sizing: PageSizing,
        total_count: u64,
    ) -> usize {
        let limit = if first_page {
            requested
                .unwrap_or(self.config.first_page_limit)
                .min(self.config.first_page_limit)
        } else {
            match sizing {
                PageSizing::Fixed => requested.unwrap_or(self.config.page_limit),
                PageSizing::SweepRemainder => usize::try_from(total_count).unwrap_or(usize::MAX),
            }
        };
        limit.clamp(1, MAX_PAGE_LIMIT)
    }
}
