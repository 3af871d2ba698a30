#![forbid(unsafe_code)]

use super::super::StoreError;
use super::super::schema::ROWS_TABLE;
use rusqlite::{Connection, params};
use tracing::{info, warn};

/// A secondary index captured before it was dropped, so it can be
/// recreated verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct DroppedIndex {
    pub name: String,
    pub sql: String,
}

/// Non-unique indexes on the row relation. Primary key and `UNIQUE`
/// autoindexes carry no `sql` and are never touched.
fn secondary_indexes(conn: &Connection) -> Result<Vec<DroppedIndex>, StoreError> {
    let mut stmt = conn.prepare(
        r#"
        SELECT name, sql
        FROM sqlite_master
        WHERE type='index'
          AND tbl_name=?1
          AND sql IS NOT NULL
          AND sql NOT LIKE 'CREATE UNIQUE%'
        ORDER BY name ASC
        "#,
    )?;
    let rows = stmt.query_map(params![ROWS_TABLE], |row| {
        Ok(DroppedIndex {
            name: row.get(0)?,
            sql: row.get(1)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub(super) fn drop_secondary_indexes(conn: &Connection) -> Result<Vec<DroppedIndex>, StoreError> {
    drop_indexes(conn, secondary_indexes(conn)?)
}

/// Drops `indexes` in order. If one drop fails, the ones already dropped are
/// recreated before the error is returned, so a failed job never leaves the
/// row relation short of an index.
fn drop_indexes(
    conn: &Connection,
    indexes: Vec<DroppedIndex>,
) -> Result<Vec<DroppedIndex>, StoreError> {
    let mut dropped = Vec::with_capacity(indexes.len());
    for index in indexes {
        if let Err(err) =
            conn.execute_batch(&format!("DROP INDEX IF EXISTS {};", quote_ident(&index.name)))
        {
            warn!(
                index = index.name.as_str(),
                error = %err,
                restoring = dropped.len(),
                "row index drop failed; restoring dropped indexes"
            );
            rebuild_indexes(conn, &dropped);
            return Err(err.into());
        }
        info!(index = index.name.as_str(), "dropped row index for bulk load");
        dropped.push(index);
    }
    Ok(dropped)
}

/// Recreates dropped indexes. Indexes another job already rebuilt are
/// skipped by `IF NOT EXISTS`. Returns the number rebuilt and one message
/// per failure.
pub(super) fn rebuild_indexes(conn: &Connection, dropped: &[DroppedIndex]) -> (usize, Vec<String>) {
    let mut rebuilt = 0usize;
    let mut errors = Vec::new();
    for index in dropped {
        let sql = if index.sql.contains("IF NOT EXISTS") {
            index.sql.clone()
        } else {
            index.sql.replacen("CREATE INDEX", "CREATE INDEX IF NOT EXISTS", 1)
        };
        match conn.execute_batch(&sql) {
            Ok(()) => {
                info!(index = index.name.as_str(), "rebuilt row index");
                rebuilt += 1;
            }
            Err(err) => {
                warn!(index = index.name.as_str(), error = %err, "row index rebuild failed");
                errors.push(format!("rebuild {}: {err}", index.name));
            }
        }
    }
    (rebuilt, errors)
}
