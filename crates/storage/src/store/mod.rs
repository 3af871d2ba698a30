#![forbid(unsafe_code)]

mod bulk;
mod cells;
mod config;
mod error;
mod lease;
mod pagination;
mod schema;
mod tables;
mod types;
mod view_state;

pub use bulk::bulk_lease_ttl;
pub use config::*;
pub use error::StoreError;
pub use types::*;

use gl_core::ids::TableId;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DB_FILE_NAME: &str = "gridload.db";

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Row/column store for one datastore file.
///
/// `conn` serves ordinary request traffic. Bulk writers and background passes
/// never borrow it: each opens a dedicated connection to `db_path`.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    storage_dir: PathBuf,
    db_path: PathBuf,
    config: StoreConfig,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with_config(storage_dir, StoreConfig::default())
    }

    pub fn open_with_config(
        storage_dir: impl AsRef<Path>,
        config: StoreConfig,
    ) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let db_path = storage_dir.join(DB_FILE_NAME);
        let conn = open_connection(&db_path, DEFAULT_BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;

        // A current schema is left as is. Row indexes are only restored when
        // no bulk job holds a lease.
        match schema::preflight_gate(&conn)? {
            schema::SchemaState::Empty => schema::install_schema(&conn)?,
            schema::SchemaState::Current => {
                schema::restore_row_indexes(&conn)?;
            }
        }

        Ok(Self {
            conn,
            storage_dir,
            db_path,
            config: config.normalized(),
        })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}

/// Opens a dedicated connection to the datastore file.
pub(crate) fn open_connection(
    db_path: &Path,
    busy_timeout: Duration,
) -> Result<Connection, StoreError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(busy_timeout)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(conn)
}

pub fn now_ms() -> i64 {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    now.as_millis().min(i64::MAX as u128) as i64
}

fn to_sqlite_i64(value: usize) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::InvalidInput("value exceeds sqlite integer range"))
}

fn canonicalize_table(value: &str) -> Result<TableId, StoreError> {
    TableId::try_new(value.trim()).map_err(|_| StoreError::InvalidInput("invalid table id"))
}
