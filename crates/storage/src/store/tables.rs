#![forbid(unsafe_code)]

use super::*;
use gl_core::model::{Column, ColumnType};
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

const MAX_TABLE_NAME_LEN: usize = 256;
const MAX_COLUMN_NAME_LEN: usize = 256;
const MAX_COLUMNS: usize = 512;

fn normalize_name(raw: &str, max_len: usize, empty: &'static str, too_long: &'static str) -> Result<String, StoreError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(StoreError::InvalidInput(empty));
    }
    if raw.len() > max_len {
        return Err(StoreError::InvalidInput(too_long));
    }
    Ok(raw.to_string())
}

fn read_column_row(row: &rusqlite::Row<'_>) -> Result<(String, String, String, i64), rusqlite::Error> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

pub(crate) fn table_exists(conn: &Connection, table_id: &TableId) -> Result<bool, StoreError> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM grid_tables WHERE id=?1",
            params![table_id.as_str()],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .is_some())
}

/// Current column set in creation order.
pub(crate) fn load_columns(conn: &Connection, table_id: &TableId) -> Result<Vec<Column>, StoreError> {
    if !table_exists(conn, table_id)? {
        return Err(StoreError::UnknownTable);
    }

    let mut stmt = conn.prepare(
        r#"
        SELECT id, name, column_type, creation_order
        FROM grid_columns
        WHERE table_id=?1
        ORDER BY creation_order ASC, id ASC
        "#,
    )?;
    let rows = stmt.query_map(params![table_id.as_str()], read_column_row)?;

    let mut out = Vec::new();
    for row in rows {
        let (id, name, column_type, creation_order) = row?;
        let column_type = ColumnType::parse(&column_type)
            .map_err(|_| StoreError::InvalidInput("stored column has an unknown type"))?;
        out.push(Column {
            id,
            name,
            column_type,
            creation_order,
        });
    }
    Ok(out)
}

pub(crate) fn count_rows(conn: &Connection, table_id: &TableId) -> Result<u64, StoreError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM table_rows WHERE table_id=?1",
        params![table_id.as_str()],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count.max(0) as u64)
}

impl SqliteStore {
    /// Registers a table and its columns. This is the minimal schema fixture
    /// the bulk and pagination paths run against, not a schema editing API.
    pub fn table_create(&mut self, request: TableCreateRequest) -> Result<TableInfo, StoreError> {
        let name = normalize_name(
            &request.name,
            MAX_TABLE_NAME_LEN,
            "table name must not be empty",
            "table name is too long",
        )?;
        if request.columns.len() > MAX_COLUMNS {
            return Err(StoreError::InvalidInput("too many columns"));
        }

        let now_ms = now_ms();
        let table_id = format!("tbl_{}", Uuid::now_v7().simple());

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO grid_tables(id, name, created_at_ms) VALUES (?1, ?2, ?3)",
            params![table_id, name, now_ms],
        )?;

        let mut columns = Vec::with_capacity(request.columns.len());
        for (order, spec) in request.columns.into_iter().enumerate() {
            let column_name = normalize_name(
                &spec.name,
                MAX_COLUMN_NAME_LEN,
                "column name must not be empty",
                "column name is too long",
            )?;
            let column = Column {
                id: format!("col_{}", Uuid::now_v7().simple()),
                name: column_name,
                column_type: spec.column_type,
                creation_order: to_sqlite_i64(order)?,
            };
            tx.execute(
                r#"
                INSERT INTO grid_columns(table_id, id, name, column_type, creation_order, created_at_ms)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    table_id,
                    column.id,
                    column.name,
                    column.column_type.as_str(),
                    column.creation_order,
                    now_ms
                ],
            )?;
            columns.push(column);
        }

        tx.commit()?;
        Ok(TableInfo {
            id: table_id,
            name,
            columns,
            created_at_ms: now_ms,
        })
    }

    pub fn table_get(&self, table_id: &str) -> Result<Option<TableInfo>, StoreError> {
        let table_id = canonicalize_table(table_id)?;
        let row = self
            .conn
            .query_row(
                "SELECT name, created_at_ms FROM grid_tables WHERE id=?1",
                params![table_id.as_str()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;
        let Some((name, created_at_ms)) = row else {
            return Ok(None);
        };
        let columns = load_columns(&self.conn, &table_id)?;
        Ok(Some(TableInfo {
            id: table_id.into_string(),
            name,
            columns,
            created_at_ms,
        }))
    }

    pub fn table_columns(&self, table_id: &str) -> Result<Vec<Column>, StoreError> {
        let table_id = canonicalize_table(table_id)?;
        load_columns(&self.conn, &table_id)
    }

    /// Exact row count. This is the re-query callers use after a partially
    /// completed bulk job.
    pub fn rows_count(&self, table_id: &str) -> Result<u64, StoreError> {
        let table_id = canonicalize_table(table_id)?;
        if !table_exists(&self.conn, &table_id)? {
            return Err(StoreError::UnknownTable);
        }
        count_rows(&self.conn, &table_id)
    }
}
