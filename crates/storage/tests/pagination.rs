use gl_core::model::ColumnType;
use gl_storage::{
    ColumnSpec, PageRequest, PageResult, PageSizing, SqliteStore, StoreConfig, StoreError,
    TableCreateRequest, TableInfo,
};
use rusqlite::{Connection, params};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::PathBuf;

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

fn seeded_table(store: &mut SqliteStore, rows: usize) -> TableInfo {
    let table = store
        .table_create(TableCreateRequest {
            name: "inventory".to_string(),
            columns: vec![
                ColumnSpec {
                    name: "Item".to_string(),
                    column_type: ColumnType::Text,
                },
                ColumnSpec {
                    name: "Stock".to_string(),
                    column_type: ColumnType::Number,
                },
            ],
        })
        .expect("create table");
    let report = store
        .generate_bulk_rows_for_table(&table.id, rows)
        .expect("seed rows");
    assert!(report.outcome.is_completed());
    table
}

fn page(
    store: &SqliteStore,
    table: &TableInfo,
    cursor: Option<&str>,
    limit: Option<usize>,
    sizing: PageSizing,
) -> PageResult {
    store
        .rows_page(PageRequest {
            table_id: table.id.clone(),
            cursor: cursor.map(str::to_string),
            limit,
            sizing,
        })
        .expect("page")
}

fn assert_strictly_ascending(result: &PageResult) {
    for pair in result.rows.windows(2) {
        let a = (pair[0].created_at_ms, pair[0].id.as_str());
        let b = (pair[1].created_at_ms, pair[1].id.as_str());
        assert!(a < b, "rows out of order: {a:?} then {b:?}");
    }
}

#[test]
fn small_first_page_then_sweep_the_remainder() {
    let storage_dir = temp_dir("small_first_page_then_sweep_the_remainder");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let table = seeded_table(&mut store, 10_000);

    let first = page(&store, &table, None, Some(500), PageSizing::SweepRemainder);
    assert_eq!(first.rows.len(), 500);
    assert!(first.has_more);
    assert_eq!(first.total_count, 10_000);
    assert!(!first.cursor_reset);
    assert_strictly_ascending(&first);

    let cursor = first.next_cursor.clone().expect("next cursor");
    let last = first.rows.last().expect("last row");
    assert!(cursor.contains(&last.id));
    assert!(cursor.contains(&last.created_at_ms.to_string()));

    let rest = page(&store, &table, Some(&cursor), None, PageSizing::SweepRemainder);
    assert_eq!(rest.rows.len(), 9_500);
    assert!(!rest.has_more);
    assert!(rest.next_cursor.is_none());
    assert_strictly_ascending(&rest);

    let mut seen = BTreeSet::new();
    for row in first.rows.iter().chain(rest.rows.iter()) {
        assert!(seen.insert(row.id.clone()), "row {} returned twice", row.id);
    }
    assert_eq!(seen.len(), 10_000);
    assert!(
        (last.created_at_ms, last.id.as_str())
            < (rest.rows[0].created_at_ms, rest.rows[0].id.as_str())
    );
}

#[test]
fn fixed_pages_visit_every_row_once() {
    let storage_dir = temp_dir("fixed_pages_visit_every_row_once");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let table = seeded_table(&mut store, 100);

    let mut cursor: Option<String> = None;
    let mut ids = Vec::new();
    let mut pages = 0;
    loop {
        let result = page(&store, &table, cursor.as_deref(), Some(30), PageSizing::Fixed);
        assert_eq!(result.limit, 30);
        assert_strictly_ascending(&result);
        ids.extend(result.rows.iter().map(|row| row.id.clone()));
        pages += 1;
        if !result.has_more {
            assert!(result.next_cursor.is_none());
            break;
        }
        cursor = result.next_cursor;
    }
    assert_eq!(pages, 4);
    assert_eq!(ids.len(), 100);
    assert_eq!(ids.iter().collect::<BTreeSet<_>>().len(), 100);
}

#[test]
fn rows_committed_between_pages_stream_in() {
    let storage_dir = temp_dir("rows_committed_between_pages_stream_in");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let table = seeded_table(&mut store, 100);

    let first = page(&store, &table, None, Some(40), PageSizing::Fixed);
    assert_eq!(first.rows.len(), 40);
    let cursor = first.next_cursor.clone().expect("next cursor");
    let before: BTreeSet<String> = {
        let all = page(&store, &table, None, Some(500), PageSizing::Fixed);
        all.rows.into_iter().map(|row| row.id).collect()
    };

    std::thread::sleep(std::time::Duration::from_millis(5));
    store
        .generate_bulk_rows_for_table(&table.id, 10)
        .expect("concurrent insert");

    let second = page(&store, &table, Some(&cursor), Some(1_000), PageSizing::Fixed);
    assert_eq!(second.total_count, 110);
    assert_eq!(second.rows.len(), 70);
    let fresh: Vec<&str> = second
        .rows
        .iter()
        .filter(|row| !before.contains(&row.id))
        .map(|row| row.id.as_str())
        .collect();
    assert_eq!(fresh.len(), 10);
    assert!(first.rows.iter().all(|row| !fresh.contains(&row.id.as_str())));
}

#[test]
fn sweep_after_concurrent_insert_sizes_to_the_new_total() {
    let storage_dir = temp_dir("sweep_after_concurrent_insert_sizes_to_the_new_total");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let table = seeded_table(&mut store, 50);

    let first = page(&store, &table, None, Some(20), PageSizing::SweepRemainder);
    std::thread::sleep(std::time::Duration::from_millis(5));
    store
        .generate_bulk_rows_for_table(&table.id, 25)
        .expect("concurrent insert");

    let rest = page(
        &store,
        &table,
        first.next_cursor.as_deref(),
        None,
        PageSizing::SweepRemainder,
    );
    assert_eq!(rest.limit, 75);
    assert_eq!(rest.rows.len(), 55);
    assert!(!rest.has_more);
}

#[test]
fn malformed_cursor_restarts_from_the_first_page() {
    let storage_dir = temp_dir("malformed_cursor_restarts_from_the_first_page");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let table = seeded_table(&mut store, 20);

    let fresh = page(&store, &table, None, Some(5), PageSizing::Fixed);
    for token in ["garbage", "pc1.", "pc1.-5.row", "pc9.1.row", "pc1.12.with space"] {
        let result = page(&store, &table, Some(token), Some(5), PageSizing::Fixed);
        assert!(result.cursor_reset, "{token} should reset");
        assert_eq!(result.rows, fresh.rows);
    }

    let blank = page(&store, &table, Some("  "), Some(5), PageSizing::Fixed);
    assert!(!blank.cursor_reset);
    assert_eq!(blank.rows, fresh.rows);
}

#[test]
fn stale_cursor_restarts_from_the_first_page() {
    let storage_dir = temp_dir("stale_cursor_restarts_from_the_first_page");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let table = seeded_table(&mut store, 20);

    let first = page(&store, &table, None, Some(5), PageSizing::Fixed);
    let cursor = first.next_cursor.clone().expect("next cursor");
    let anchor = first.rows.last().expect("anchor row").id.clone();

    let conn = Connection::open(store.db_path()).expect("open raw");
    conn.execute("DELETE FROM table_rows WHERE id=?1", params![anchor])
        .expect("delete anchor");

    let result = page(&store, &table, Some(&cursor), Some(5), PageSizing::Fixed);
    assert!(result.cursor_reset);
    assert_eq!(result.total_count, 19);
    assert_eq!(result.rows[0].id, first.rows[0].id);

    let unknown = page(&store, &table, Some("pc1.1.nope"), Some(5), PageSizing::Fixed);
    assert!(unknown.cursor_reset);
}

#[test]
fn first_page_is_capped_by_config() {
    let storage_dir = temp_dir("first_page_is_capped_by_config");
    let config = StoreConfig {
        first_page_limit: 5,
        page_limit: 12,
        ..StoreConfig::default()
    };
    let mut store = SqliteStore::open_with_config(&storage_dir, config).expect("open store");
    let table = seeded_table(&mut store, 30);

    let first = page(&store, &table, None, Some(50), PageSizing::Fixed);
    assert_eq!(first.limit, 5);
    assert_eq!(first.rows.len(), 5);

    let second = page(&store, &table, first.next_cursor.as_deref(), None, PageSizing::Fixed);
    assert_eq!(second.limit, 12);
    assert_eq!(second.rows.len(), 12);
    assert!(second.has_more);
}

#[test]
fn columns_missing_from_the_cache_read_as_null() {
    let storage_dir = temp_dir("columns_missing_from_the_cache_read_as_null");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let table = seeded_table(&mut store, 3);

    let conn = Connection::open(store.db_path()).expect("open raw");
    conn.execute(
        "INSERT INTO grid_columns(table_id, id, name, column_type, creation_order, created_at_ms) \
         VALUES (?1, 'col_added_later', 'Notes', 'TEXT', 2, 0)",
        params![table.id],
    )
    .expect("add column");

    let result = page(&store, &table, None, None, PageSizing::Fixed);
    assert_eq!(result.rows.len(), 3);
    for row in &result.rows {
        assert_eq!(row.data.len(), 3);
        assert_eq!(row.data.get("col_added_later"), Some(&Value::Null));
        assert!(row.data[&table.columns[0].id].is_string());
    }
}

#[test]
fn empty_and_unknown_tables() {
    let storage_dir = temp_dir("empty_and_unknown_tables");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let table = store
        .table_create(TableCreateRequest {
            name: "blank".to_string(),
            columns: vec![ColumnSpec {
                name: "Title".to_string(),
                column_type: ColumnType::Text,
            }],
        })
        .expect("create table");

    let result = page(&store, &table, None, None, PageSizing::Fixed);
    assert!(result.rows.is_empty());
    assert!(!result.has_more);
    assert!(result.next_cursor.is_none());
    assert_eq!(result.total_count, 0);

    let err = store
        .rows_page(PageRequest {
            table_id: "tbl_nope".to_string(),
            cursor: None,
            limit: None,
            sizing: PageSizing::Fixed,
        })
        .expect_err("unknown table");
    assert!(matches!(err, StoreError::UnknownTable));
}
