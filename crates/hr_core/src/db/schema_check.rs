//! Foreign-key agreement between the SQLite schema and `model::schema`.
//!
//! # Invariants
//! - Every declared relationship exists in the store with the same parent
//!   table, parent key column and `ON DELETE` action.
//! - The store carries no foreign key the model does not declare.

use super::{DbError, DbResult};
use crate::model::entity::EntityKind;
use crate::model::schema::{foreign_keys_of, FOREIGN_KEYS};
use log::debug;
use rusqlite::Connection;

/// One row of `pragma_foreign_key_list`, reduced to what the session relies on.
#[derive(Debug)]
struct StoredKey {
    column: String,
    target: String,
}

/// Checks every table's foreign keys against `FOREIGN_KEYS`.
pub fn verify_foreign_keys(conn: &Connection) -> DbResult<()> {
    for kind in EntityKind::ALL {
        let table = kind.table();
        let mut stored = stored_keys(conn, table)?;

        for fk in foreign_keys_of(kind) {
            let expected = describe(
                fk.parent.table(),
                fk.parent.key_column(),
                fk.on_delete.as_sql(),
            );
            let found = stored
                .iter()
                .position(|key| key.column == fk.column)
                .map(|position| stored.swap_remove(position).target);
            if found.as_deref() != Some(expected.as_str()) {
                return Err(DbError::ForeignKeyMismatch {
                    table,
                    column: fk.column.to_string(),
                    expected: Some(expected),
                    found,
                });
            }
        }

        if let Some(extra) = stored.into_iter().next() {
            return Err(DbError::ForeignKeyMismatch {
                table,
                column: extra.column,
                expected: None,
                found: Some(extra.target),
            });
        }
    }

    debug!(
        "event=schema_check module=db status=ok foreign_keys={}",
        FOREIGN_KEYS.len()
    );
    Ok(())
}

fn stored_keys(conn: &Connection, table: &str) -> DbResult<Vec<StoredKey>> {
    let mut stmt = conn.prepare(
        "SELECT \"from\", \"table\", \"to\", on_delete
         FROM pragma_foreign_key_list(?1)
         ORDER BY id, seq;",
    )?;
    let rows = stmt.query_map([table], |row| {
        let parent_table: String = row.get(1)?;
        let parent_column: Option<String> = row.get(2)?;
        let on_delete: String = row.get(3)?;
        Ok(StoredKey {
            column: row.get(0)?,
            target: describe(
                &parent_table,
                parent_column.as_deref().unwrap_or(""),
                &on_delete,
            ),
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn describe(parent_table: &str, parent_column: &str, on_delete: &str) -> String {
    format!("{parent_table}({parent_column}) ON DELETE {on_delete}")
}

#[cfg(test)]
mod tests {
    use super::verify_foreign_keys;
    use crate::db::DbError;
    use rusqlite::Connection;

    const SCHEMA: &str = include_str!("migrations/0001_hr_schema.sql");

    fn store_with(schema: &str) -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(schema).unwrap();
        conn
    }

    #[test]
    fn migrated_schema_agrees_with_the_model() {
        verify_foreign_keys(&store_with(SCHEMA)).unwrap();
    }

    #[test]
    fn different_delete_action_is_reported() {
        let drifted = SCHEMA.replace(
            "REFERENCES departments (department_id) ON DELETE CASCADE",
            "REFERENCES departments (department_id) ON DELETE SET NULL",
        );
        match verify_foreign_keys(&store_with(&drifted)).unwrap_err() {
            DbError::ForeignKeyMismatch {
                table,
                column,
                expected,
                found,
            } => {
                assert_eq!(table, "employees");
                assert_eq!(column, "department_id");
                assert_eq!(
                    expected.as_deref(),
                    Some("departments(department_id) ON DELETE CASCADE")
                );
                assert_eq!(
                    found.as_deref(),
                    Some("departments(department_id) ON DELETE SET NULL")
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_foreign_key_is_reported() {
        let drifted = SCHEMA.replace(
            "manager_id INTEGER REFERENCES employees (employee_id) ON DELETE SET NULL",
            "manager_id INTEGER",
        );
        assert!(matches!(
            verify_foreign_keys(&store_with(&drifted)),
            Err(DbError::ForeignKeyMismatch { found: None, .. })
        ));
    }

    #[test]
    fn undeclared_foreign_key_is_reported() {
        let drifted = SCHEMA.replace(
            "street_address TEXT,",
            "street_address TEXT,\n    region_id INTEGER REFERENCES regions (region_id),",
        );
        match verify_foreign_keys(&store_with(&drifted)).unwrap_err() {
            DbError::ForeignKeyMismatch {
                table,
                column,
                expected,
                ..
            } => {
                assert_eq!(table, "locations");
                assert_eq!(column, "region_id");
                assert_eq!(expected, None);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
