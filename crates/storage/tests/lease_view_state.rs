use gl_core::model::ColumnType;
use gl_storage::{
    ColumnSpec, SqliteStore, StoreError, TableCreateRequest, TableInfo, ViewStateSaveOutcome,
    ViewStateSaveRequest, bulk_lease_ttl,
};
use rusqlite::{Connection, params};
use std::path::PathBuf;
use std::time::Duration;

const T0: i64 = 1_700_000_000_000;
const FIVE_MINUTES: Duration = Duration::from_secs(5 * 60);

fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = base.join(format!("gl_storage_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn table(store: &mut SqliteStore) -> TableInfo {
    store
        .table_create(TableCreateRequest {
            name: "tasks".to_string(),
            columns: vec![ColumnSpec {
                name: "Title".to_string(),
                column_type: ColumnType::Text,
            }],
        })
        .expect("create table")
}

#[test]
fn lease_expires_without_release() {
    let storage_dir = temp_dir("lease_expires_without_release");
    let store = SqliteStore::open(&storage_dir).expect("open store");

    let lease = store
        .lease_acquire("tbl_a", FIVE_MINUTES, T0)
        .expect("acquire");
    assert_eq!(lease.lease_id, "bulk_lock:tbl_a");
    assert_eq!(lease.expires_at_ms, T0 + 300_000);

    assert!(store.lease_is_live("tbl_a", T0).expect("live"));
    assert!(store.lease_is_live("tbl_a", T0 + 299_999).expect("live"));
    assert!(!store.lease_is_live("tbl_a", T0 + 300_000).expect("boundary"));
    assert!(!store.lease_is_live("tbl_a", T0 + 301_000).expect("expired"));

    // The record is still there; only its expiry decides liveness.
    let conn = Connection::open(store.db_path()).expect("open raw");
    let records: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM bulk_locks WHERE table_id=?1",
            params!["tbl_a"],
            |row| row.get(0),
        )
        .expect("count");
    assert_eq!(records, 1);
}

#[test]
fn reacquire_refreshes_expiry() {
    let storage_dir = temp_dir("reacquire_refreshes_expiry");
    let store = SqliteStore::open(&storage_dir).expect("open store");

    store
        .lease_acquire("tbl_a", FIVE_MINUTES, T0)
        .expect("acquire");
    let refreshed = store
        .lease_acquire("tbl_a", FIVE_MINUTES, T0 + 60_000)
        .expect("refresh");
    assert_eq!(refreshed.expires_at_ms, T0 + 360_000);
    assert!(store.lease_is_live("tbl_a", T0 + 330_000).expect("live"));

    // Leases are per table.
    assert!(!store.lease_is_live("tbl_b", T0).expect("other table"));
}

#[test]
fn check_reports_remaining_time() {
    let storage_dir = temp_dir("check_reports_remaining_time");
    let store = SqliteStore::open(&storage_dir).expect("open store");

    let idle = store.lease_check("tbl_a", T0).expect("check");
    assert!(!idle.is_locked);
    assert_eq!(idle.expires_at_ms, None);
    assert_eq!(idle.remaining_ms, None);

    store
        .lease_acquire("tbl_a", FIVE_MINUTES, T0)
        .expect("acquire");
    let status = store.lease_check("tbl_a", T0 + 100_000).expect("check");
    assert!(status.is_locked);
    assert_eq!(status.expires_at_ms, Some(T0 + 300_000));
    assert_eq!(status.remaining_ms, Some(200_000));
}

#[test]
fn release_deletes_the_record() {
    let storage_dir = temp_dir("release_deletes_the_record");
    let store = SqliteStore::open(&storage_dir).expect("open store");

    store
        .lease_acquire("tbl_a", FIVE_MINUTES, T0)
        .expect("acquire");
    assert!(store.lease_release("tbl_a").expect("release"));
    assert!(!store.lease_is_live("tbl_a", T0).expect("live"));
    assert!(!store.lease_release("tbl_a").expect("second release"));
}

#[test]
fn lease_rejects_zero_ttl_and_bad_ids() {
    let storage_dir = temp_dir("lease_rejects_zero_ttl_and_bad_ids");
    let store = SqliteStore::open(&storage_dir).expect("open store");

    let err = store
        .lease_acquire("tbl_a", Duration::ZERO, T0)
        .expect_err("zero ttl");
    assert!(matches!(err, StoreError::InvalidInput(_)));

    let err = store
        .lease_is_live("not a table id", T0)
        .expect_err("bad id");
    assert_eq!(err.code(), "INVALID_INPUT");
}

#[test]
fn bulk_ttl_grows_with_the_job() {
    assert_eq!(bulk_lease_ttl(0), Duration::from_secs(60));
    assert!(bulk_lease_ttl(50_000) > bulk_lease_ttl(1_000));
    assert!(bulk_lease_ttl(100_000) <= Duration::from_secs(3_600));
}

#[test]
fn view_state_is_deferred_while_a_lease_is_live() {
    let storage_dir = temp_dir("view_state_is_deferred_while_a_lease_is_live");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let table = table(&mut store);

    let saved = store
        .view_state_save(
            ViewStateSaveRequest {
                table_id: table.id.clone(),
                state_json: r#"{"sort":[{"column":"Title","dir":"asc"}]}"#.to_string(),
            },
            T0,
        )
        .expect("save");
    assert_eq!(saved, ViewStateSaveOutcome::Saved { updated_at_ms: T0 });

    store
        .lease_acquire(&table.id, FIVE_MINUTES, T0 + 10)
        .expect("acquire");
    let deferred = store
        .view_state_save(
            ViewStateSaveRequest {
                table_id: table.id.clone(),
                state_json: r#"{"sort":[]}"#.to_string(),
            },
            T0 + 20,
        )
        .expect("deferred save");
    assert_eq!(
        deferred,
        ViewStateSaveOutcome::Deferred {
            lease_expires_at_ms: T0 + 10 + 300_000
        }
    );
    let stored = store
        .view_state_get(&table.id)
        .expect("get")
        .expect("stored state");
    assert!(stored.state_json.contains("Title"));
    assert_eq!(stored.updated_at_ms, T0);

    let after_expiry = store
        .view_state_save(
            ViewStateSaveRequest {
                table_id: table.id.clone(),
                state_json: r#"{"sort":[]}"#.to_string(),
            },
            T0 + 10 + 300_001,
        )
        .expect("save after expiry");
    assert!(matches!(after_expiry, ViewStateSaveOutcome::Saved { .. }));
    let stored = store
        .view_state_get(&table.id)
        .expect("get")
        .expect("stored state");
    assert_eq!(stored.state_json, r#"{"sort":[]}"#);
}

#[test]
fn view_state_validation() {
    let storage_dir = temp_dir("view_state_validation");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let table = table(&mut store);

    let err = store
        .view_state_save(
            ViewStateSaveRequest {
                table_id: table.id.clone(),
                state_json: "{not json".to_string(),
            },
            T0,
        )
        .expect_err("bad json");
    assert!(matches!(err, StoreError::Json(_)));

    let err = store
        .view_state_save(
            ViewStateSaveRequest {
                table_id: table.id.clone(),
                state_json: "[1,2]".to_string(),
            },
            T0,
        )
        .expect_err("not an object");
    assert!(matches!(err, StoreError::InvalidInput(_)));

    let err = store
        .view_state_save(
            ViewStateSaveRequest {
                table_id: "tbl_missing".to_string(),
                state_json: "{}".to_string(),
            },
            T0,
        )
        .expect_err("unknown table");
    assert!(matches!(err, StoreError::UnknownTable));
    assert!(store.view_state_get("tbl_missing").expect("get").is_none());
}
