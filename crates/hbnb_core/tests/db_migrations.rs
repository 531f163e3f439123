use hbnb_core::db::migrations::latest_version;
use hbnb_core::db::{open_db, open_db_in_memory, DbError};
use hbnb_core::{RepoError, SqliteRepository};
use rusqlite::Connection;

const TABLES: &[&str] = &[
    "users",
    "countries",
    "cities",
    "amenities",
    "places",
    "place_amenities",
    "reviews",
];

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in TABLES {
        assert_table_exists(&conn, table);
    }
    let foreign_keys: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(foreign_keys, 1);
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hbnb.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "places");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn repository_rejects_connection_at_older_schema() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("PRAGMA user_version = 1;").unwrap();

    let err = SqliteRepository::try_new(conn).err().unwrap();
    match err {
        RepoError::Db(DbError::SchemaNotMigrated {
            db_version,
            required,
        }) => {
            assert_eq!(db_version, 1);
            assert_eq!(required, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn file_repository_survives_reopen() {
    use hbnb_core::model::user::User;
    use hbnb_core::TypedRepository;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hbnb.db");

    let stored = SqliteRepository::open(&path)
        .unwrap()
        .insert(User::new("ada@example.com", "Ada", "Lovelace", "hash"))
        .unwrap();

    let reopened = SqliteRepository::open(&path).unwrap();
    assert_eq!(reopened.find::<User>(&stored.id).unwrap(), Some(stored));
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
