#![forbid(unsafe_code)]

use super::lease::live_expiry;
use super::tables::table_exists;
use super::*;
use rusqlite::{OptionalExtension, params};
use tracing::debug;

const MAX_VIEW_STATE_BYTES: usize = 64 * 1024;

impl SqliteStore {
    /// Persists the grid view state (sort, filters, column visibility).
    ///
    /// Consults the table's bulk lease first: while it is live the write is
    /// skipped and reported as deferred, never as an error.
    pub fn view_state_save(
        &mut self,
        request: ViewStateSaveRequest,
        now_ms: i64,
    ) -> Result<ViewStateSaveOutcome, StoreError> {
        let table_id = canonicalize_table(&request.table_id)?;
        if request.state_json.len() > MAX_VIEW_STATE_BYTES {
            return Err(StoreError::InvalidInput("view state is too large"));
        }
        let parsed: serde_json::Value = serde_json::from_str(&request.state_json)?;
        if !parsed.is_object() {
            return Err(StoreError::InvalidInput("view state must be a JSON object"));
        }
        if !table_exists(&self.conn, &table_id)? {
            return Err(StoreError::UnknownTable);
        }

        if let Some(lease_expires_at_ms) = live_expiry(&self.conn, &table_id, now_ms)? {
            debug!(
                table_id = table_id.as_str(),
                lease_expires_at_ms, "view state write deferred by bulk lease"
            );
            return Ok(ViewStateSaveOutcome::Deferred {
                lease_expires_at_ms,
            });
        }

        self.conn.execute(
            r#"
            INSERT INTO view_states(table_id, state_json, updated_at_ms)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(table_id) DO UPDATE SET
              state_json=excluded.state_json,
              updated_at_ms=excluded.updated_at_ms
            "#,
            params![table_id.as_str(), parsed.to_string(), now_ms],
        )?;
        Ok(ViewStateSaveOutcome::Saved {
            updated_at_ms: now_ms,
        })
    }

    pub fn view_state_get(&self, table_id: &str) -> Result<Option<ViewStateRow>, StoreError> {
        let table_id = canonicalize_table(table_id)?;
        Ok(self
            .conn
            .query_row(
                "SELECT table_id, state_json, updated_at_ms FROM view_states WHERE table_id=?1",
                params![table_id.as_str()],
                |row| {
                    Ok(ViewStateRow {
                        table_id: row.get(0)?,
                        state_json: row.get(1)?,
                        updated_at_ms: row.get(2)?,
                    })
                },
            )
            .optional()?)
    }
}
