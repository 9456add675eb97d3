//! CLI integration tests: run the `hr` binary against a temporary database.

use rusqlite::Connection;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run_hr(temp_dir: &TempDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hr"))
        .current_dir(temp_dir.path())
        .env_remove("HR_DB_PATH")
        .env_remove("HR_LOG_DIR")
        .env_remove("HR_LOG_LEVEL")
        .args(args)
        .output()
        .expect("failed to execute hr")
}

fn employee_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM employees", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn seed_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("hr.db");
    let db = db_path.to_str().unwrap();

    let first = run_hr(&temp_dir, &["seed", "--db", db]);
    assert!(
        first.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&first.stderr)
    );
    let second = run_hr(&temp_dir, &["seed", "--db", db]);
    assert!(second.status.success());
    assert!(String::from_utf8_lossy(&second.stdout).contains("nothing seeded"));

    let conn = Connection::open(&db_path).unwrap();
    assert_eq!(employee_count(&conn), 26);
}

#[test]
fn demo_runs_all_scenarios() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("hr.db");
    let log_dir = temp_dir.path().join("logs");

    let output = run_hr(
        &temp_dir,
        &[
            "demo",
            "--db",
            db_path.to_str().unwrap(),
            "--log-dir",
            log_dir.to_str().unwrap(),
            "--log-level",
            "info",
        ],
    );
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Departments located in the US:"));
    assert!(stdout.contains("Employees before closing Shipping: 26"));
    assert!(stdout.contains("Employees after closing Shipping: 22"));
    assert!(stdout.contains("Employees after dismissals: 20"));

    let conn = Connection::open(&db_path).unwrap();
    let wilkes_region: String = conn
        .query_row(
            "SELECT r.region_name FROM countries c JOIN regions r ON r.region_id = c.region_id
             WHERE c.country_id = 'WL'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(wilkes_region, "Antarctica");
    assert!(log_dir.is_dir());
}

#[test]
fn missing_database_argument_fails() {
    let temp_dir = TempDir::new().unwrap();
    let output = run_hr(&temp_dir, &["demo"]);
    assert!(!output.status.success());
}
