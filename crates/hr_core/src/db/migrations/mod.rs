//! Versioned HR schema scripts and the executor that applies them.
//!
//! # Responsibility
//! - List the HR schema scripts in the order they must run.
//! - Bring a store from any older version to `latest_version()` in one
//!   transaction.
//!
//! # Invariants
//! - `version` values start at 1 and increase by one per script.
//! - The applied version is mirrored to `PRAGMA user_version`.
//! - A failing script leaves the store at its previous version.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::{Connection, Transaction};

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "hr_schema",
        sql: include_str!("0001_hr_schema.sql"),
    },
    Migration {
        version: 2,
        name: "foreign_key_indexes",
        sql: include_str!("0002_foreign_key_indexes.sql"),
    },
];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Applies every script newer than the store's `user_version`.
///
/// Returns how many scripts ran.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<usize> {
    let current = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    let latest = latest_version();
    if current > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: latest,
        });
    }

    let pending: Vec<&Migration> = MIGRATIONS
        .iter()
        .filter(|migration| migration.version > current)
        .collect();
    if pending.is_empty() {
        return Ok(0);
    }

    let tx = conn.transaction()?;
    for migration in &pending {
        run(&tx, migration)?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={} applied={}",
        current,
        latest,
        pending.len()
    );
    Ok(pending.len())
}

fn run(tx: &Transaction<'_>, migration: &Migration) -> DbResult<()> {
    let wrap = |source| DbError::Migration {
        version: migration.version,
        name: migration.name,
        source,
    };
    tx.execute_batch(migration.sql).map_err(wrap)?;
    tx.pragma_update(None, "user_version", migration.version)
        .map_err(wrap)
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations, latest_version, MIGRATIONS};
    use rusqlite::Connection;

    #[test]
    fn versions_count_up_from_one() {
        for (position, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version as usize, position + 1, "{}", migration.name);
        }
        assert_eq!(latest_version(), 2);
    }

    #[test]
    fn second_run_applies_nothing() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(apply_migrations(&mut conn).unwrap(), MIGRATIONS.len());
        assert_eq!(apply_migrations(&mut conn).unwrap(), 0);
    }
}
