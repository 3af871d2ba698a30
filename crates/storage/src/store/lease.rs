#![forbid(unsafe_code)]

use super::*;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, warn};

const LEASE_ID_PREFIX: &str = "bulk_lock:";

pub(crate) fn lease_id(table_id: &TableId) -> String {
    format!("{LEASE_ID_PREFIX}{}", table_id.as_str())
}

fn ttl_ms(ttl: Duration) -> Result<i64, StoreError> {
    let ms = ttl.as_millis().min(i64::MAX as u128) as i64;
    if ms <= 0 {
        return Err(StoreError::InvalidInput("lease ttl must be positive"));
    }
    Ok(ms)
}

/// Upserts the table's lease with `expires_at = now + ttl`. Re-acquiring an
/// existing lease (live or expired) overwrites its expiry.
pub(crate) fn acquire(
    conn: &Connection,
    table_id: &TableId,
    ttl: Duration,
    now_ms: i64,
) -> Result<BulkLease, StoreError> {
    let expires_at_ms = now_ms.saturating_add(ttl_ms(ttl)?);
    let lease_id = lease_id(table_id);
    conn.execute(
        r#"
        INSERT INTO bulk_locks(id, table_id, expires_at_ms, created_at_ms, updated_at_ms)
        VALUES (?1, ?2, ?3, ?4, ?4)
        ON CONFLICT(id) DO UPDATE SET
          expires_at_ms=excluded.expires_at_ms,
          updated_at_ms=excluded.updated_at_ms
        "#,
        params![lease_id, table_id.as_str(), expires_at_ms, now_ms],
    )?;
    debug!(table_id = table_id.as_str(), expires_at_ms, "bulk lease acquired");
    Ok(BulkLease {
        lease_id,
        table_id: table_id.as_str().to_string(),
        expires_at_ms,
    })
}

/// Expiry of the table's lease if it is live at `now_ms`.
pub(crate) fn live_expiry(
    conn: &Connection,
    table_id: &TableId,
    now_ms: i64,
) -> Result<Option<i64>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT expires_at_ms FROM bulk_locks WHERE table_id=?1 AND expires_at_ms > ?2",
            params![table_id.as_str(), now_ms],
            |row| row.get::<_, i64>(0),
        )
        .optional()?)
}

pub(crate) fn release(conn: &Connection, table_id: &TableId) -> Result<bool, StoreError> {
    let deleted = conn.execute(
        "DELETE FROM bulk_locks WHERE id=?1",
        params![lease_id(table_id)],
    )?;
    Ok(deleted > 0)
}

/// Releases the table's lease when dropped, on success and failure paths
/// alike. Expiry is the backstop when the delete itself fails.
pub(crate) struct LeaseGuard<'a> {
    conn: &'a Connection,
    table_id: TableId,
    released: bool,
}

impl<'a> LeaseGuard<'a> {
    pub(crate) fn acquire(
        conn: &'a Connection,
        table_id: &TableId,
        ttl: Duration,
    ) -> Result<Self, StoreError> {
        acquire(conn, table_id, ttl, now_ms())?;
        Ok(Self {
            conn,
            table_id: table_id.clone(),
            released: false,
        })
    }

    pub(crate) fn release(mut self) -> Result<(), StoreError> {
        self.released = true;
        release(self.conn, &self.table_id)?;
        Ok(())
    }
}

impl Drop for LeaseGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = release(self.conn, &self.table_id) {
            warn!(
                table_id = self.table_id.as_str(),
                error = %err,
                "bulk lease release failed; waiting for expiry"
            );
        }
    }
}

impl SqliteStore {
    pub fn lease_acquire(
        &self,
        table_id: &str,
        ttl: Duration,
        now_ms: i64,
    ) -> Result<BulkLease, StoreError> {
        let table_id = canonicalize_table(table_id)?;
        acquire(&self.conn, &table_id, ttl, now_ms)
    }

    /// Pure expiry check: a lease whose record still exists but whose expiry
    /// is not after `now_ms` is not live.
    pub fn lease_is_live(&self, table_id: &str, now_ms: i64) -> Result<bool, StoreError> {
        let table_id = canonicalize_table(table_id)?;
        Ok(live_expiry(&self.conn, &table_id, now_ms)?.is_some())
    }

    pub fn lease_check(&self, table_id: &str, now_ms: i64) -> Result<LeaseStatus, StoreError> {
        let table_id = canonicalize_table(table_id)?;
        Ok(match live_expiry(&self.conn, &table_id, now_ms)? {
            Some(expires_at_ms) => LeaseStatus {
                is_locked: true,
                expires_at_ms: Some(expires_at_ms),
                remaining_ms: Some(expires_at_ms.saturating_sub(now_ms).max(0)),
            },
            None => LeaseStatus {
                is_locked: false,
                expires_at_ms: None,
                remaining_ms: None,
            },
        })
    }

    pub fn lease_release(&self, table_id: &str) -> Result<bool, StoreError> {
        let table_id = canonicalize_table(table_id)?;
        release(&self.conn, &table_id)
    }
}
