#![forbid(unsafe_code)]

use super::{StoreError, now_ms};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeSet;
use tracing::warn;

const SCHEMA_VERSION: i64 = 1;

pub(crate) const ROWS_TABLE: &str = "table_rows";

const REQUIRED_TABLES: [&str; 6] = [
    "store_state",
    "grid_tables",
    "grid_columns",
    "table_rows",
    "bulk_locks",
    "view_states",
];

/// Row indexes that bulk jobs may drop while they load.
const ROW_INDEXES: [(&str, &str); 2] = [
    (
        "idx_table_rows_order",
        "CREATE INDEX IF NOT EXISTS idx_table_rows_order ON table_rows(table_id, created_at_ms, id)",
    ),
    (
        "idx_table_rows_search_pending",
        "CREATE INDEX IF NOT EXISTS idx_table_rows_search_pending ON table_rows(table_id) WHERE search IS NULL",
    ),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum SchemaState {
    /// No tables yet; the schema must be installed.
    Empty,
    /// Every table is present at the current version.
    Current,
}

pub(super) fn preflight_gate(conn: &Connection) -> Result<SchemaState, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
    )?;
    let mut rows = stmt.query([])?;
    let mut tables = BTreeSet::new();
    while let Some(row) = rows.next()? {
        tables.insert(row.get::<_, String>(0)?);
    }

    if tables.is_empty() {
        return Ok(SchemaState::Empty);
    }

    let required: BTreeSet<&str> = REQUIRED_TABLES.into_iter().collect();

    if tables
        .iter()
        .any(|table| !required.contains(table.as_str()))
    {
        return Err(StoreError::InvalidInput(
            "RESET_REQUIRED: unsupported tables detected",
        ));
    }

    for table in required {
        if !tables.contains(table) {
            return Err(StoreError::InvalidInput(
                "RESET_REQUIRED: required table is missing",
            ));
        }
    }

    let version = conn
        .query_row(
            "SELECT schema_version FROM store_state WHERE singleton=1",
            [],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;

    match version {
        Some(v) if v == SCHEMA_VERSION => Ok(SchemaState::Current),
        Some(_) => Err(StoreError::InvalidInput(
            "RESET_REQUIRED: schema version mismatch",
        )),
        None => Err(StoreError::InvalidInput(
            "RESET_REQUIRED: schema state row is missing",
        )),
    }
}

pub(super) fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    let now_ms = now_ms();

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS store_state (
          singleton INTEGER PRIMARY KEY CHECK(singleton = 1),
          schema_version INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS grid_tables (
          id TEXT PRIMARY KEY,
          name TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS grid_columns (
          table_id TEXT NOT NULL,
          id TEXT NOT NULL,
          name TEXT NOT NULL,
          column_type TEXT NOT NULL,
          creation_order INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL,
          PRIMARY KEY(table_id, id),
          UNIQUE(table_id, creation_order),
          FOREIGN KEY(table_id) REFERENCES grid_tables(id) ON DELETE CASCADE,
          CHECK(column_type IN ('TEXT', 'NUMBER'))
        );

        CREATE TABLE IF NOT EXISTS table_rows (
          id TEXT PRIMARY KEY,
          table_id TEXT NOT NULL,
          cache TEXT NOT NULL,
          search TEXT,
          created_at_ms INTEGER NOT NULL,
          FOREIGN KEY(table_id) REFERENCES grid_tables(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS bulk_locks (
          id TEXT PRIMARY KEY,
          table_id TEXT NOT NULL UNIQUE,
          expires_at_ms INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS view_states (
          table_id TEXT PRIMARY KEY,
          state_json TEXT NOT NULL,
          updated_at_ms INTEGER NOT NULL,
          FOREIGN KEY(table_id) REFERENCES grid_tables(id) ON DELETE CASCADE
        );
        "#,
    )?;

    for (_, sql) in ROW_INDEXES {
        conn.execute_batch(sql)?;
    }

    conn.execute(
        "INSERT INTO store_state(singleton, schema_version, created_at_ms, updated_at_ms) \
         VALUES (1, ?1, ?2, ?2) \
         ON CONFLICT(singleton) DO UPDATE SET schema_version=excluded.schema_version, updated_at_ms=excluded.updated_at_ms",
        params![SCHEMA_VERSION, now_ms],
    )?;

    Ok(())
}

/// Recreates row indexes left missing by a bulk job that never finished.
/// Skipped while any bulk lease is live, since a running job may have
/// dropped them on purpose. Only writes when something is missing.
pub(super) fn restore_row_indexes(conn: &Connection) -> Result<usize, StoreError> {
    let live_leases: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bulk_locks WHERE expires_at_ms > ?1",
        params![now_ms()],
        |row| row.get(0),
    )?;
    if live_leases > 0 {
        return Ok(0);
    }

    let mut restored = 0;
    for (name, sql) in ROW_INDEXES {
        let present = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type='index' AND name=?1",
                params![name],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .is_some();
        if !present {
            conn.execute_batch(sql)?;
            warn!(index = name, "restored row index missing since an unfinished bulk job");
            restored += 1;
        }
    }
    Ok(restored)
}
