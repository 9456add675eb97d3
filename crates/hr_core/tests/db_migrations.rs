use hr_core::db::migrations::latest_version;
use hr_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in [
        "regions",
        "countries",
        "locations",
        "departments",
        "employees",
        "dependents",
    ] {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn connections_enforce_foreign_keys() {
    let conn = open_db_in_memory().unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);

    let err = conn
        .execute(
            "INSERT INTO dependents (first_name, last_name, relationship, employee_id)
             VALUES ('Jonathan', 'Doe', 'Child', 112);",
            [],
        )
        .unwrap_err();
    assert!(err.to_string().contains("FOREIGN KEY"));
}

#[test]
fn deleting_a_department_cascades_in_the_schema_too() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO departments (department_id, department_name) VALUES (5, 'Shipping');
         INSERT INTO employees (employee_id, last_name, email, salary, department_id)
         VALUES (120, 'Weiss', 'matthew.weiss@sqltutorial.org', 8000, 5);
         INSERT INTO dependents (first_name, last_name, relationship, employee_id)
         VALUES ('Kirsten', 'Weiss', 'Child', 120);
         DELETE FROM departments WHERE department_id = 5;",
    )
    .unwrap();

    let remaining: i64 = conn
        .query_row(
            "SELECT (SELECT COUNT(*) FROM employees) + (SELECT COUNT(*) FROM dependents);",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(remaining, 0);
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hr.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "employees");
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

#[test]
fn opening_database_with_drifted_delete_rule_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("drifted.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        &include_str!("../src/db/migrations/0001_hr_schema.sql").replace(
            "REFERENCES employees (employee_id) ON DELETE CASCADE",
            "REFERENCES employees (employee_id) ON DELETE NO ACTION",
        ),
    )
    .unwrap();
    conn.pragma_update(None, "user_version", latest_version())
        .unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::ForeignKeyMismatch {
            table,
            column,
            found,
            ..
        } => {
            assert_eq!(table, "dependents");
            assert_eq!(column, "employee_id");
            assert_eq!(
                found.as_deref(),
                Some("employees(employee_id) ON DELETE NO ACTION")
            );
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn migrated_store_declares_the_model_foreign_keys() {
    let conn = open_db_in_memory().unwrap();
    hr_core::db::verify_foreign_keys(&conn).unwrap();
}
