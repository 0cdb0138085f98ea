use learnpath_core::db::migrations::latest_version;
use learnpath_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

fn table_exists(conn: &Connection, name: &str) -> bool {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1;",
        [name],
        |row| row.get::<_, i64>(0),
    )
    .unwrap()
        == 1
}

#[test]
fn fresh_database_has_all_tables_and_latest_version() {
    let conn = open_db_in_memory().unwrap();
    let version: u32 = conn
        .query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version, latest_version());
    assert!(table_exists(&conn, "kv_entries"));
    assert!(table_exists(&conn, "cache_entries"));
}

#[test]
fn reopening_file_keeps_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/state.db");
    {
        let conn = open_db(&path).unwrap();
        conn.execute(
            "INSERT INTO kv_entries (key, value) VALUES ('read_a_b_c', 'true');",
            [],
        )
        .unwrap();
    }

    let conn = open_db(&path).unwrap();
    let value: String = conn
        .query_row(
            "SELECT value FROM kv_entries WHERE key = 'read_a_b_c';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(value, "true");
}

#[test]
fn newer_schema_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version() + 1))
            .unwrap();
    }

    let err = open_db(&path).unwrap_err();
    assert!(matches!(err, DbError::UnsupportedSchemaVersion { .. }));
}

#[test]
fn blocked_state_directory_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("data");
    std::fs::write(&blocker, "not a directory").unwrap();

    let err = open_db(blocker.join("learnpath.db")).unwrap_err();
    match err {
        DbError::StateDir { path, .. } => assert_eq!(path, blocker),
        other => panic!("unexpected error: {other}"),
    }
}
