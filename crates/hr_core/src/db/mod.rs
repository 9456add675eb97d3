//! SQLite storage bootstrap for the HR store.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the HR store.
//! - Apply schema migrations in deterministic order.
//! - Confirm the store's foreign keys agree with `model::schema`.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Sessions must not read/write HR rows before migrations succeed.
//! - Foreign keys are enforced on every connection handed out here, with the
//!   same delete rules the session uses for cascades.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;
mod schema_check;

pub use open::{open_db, open_db_in_memory};
pub use schema_check::verify_foreign_keys;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// One migration script failed; nothing from the batch was kept.
    Migration {
        version: u32,
        name: &'static str,
        source: rusqlite::Error,
    },
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// A foreign key in the store differs from the declared relationship.
    /// `None` on one side means that side has no such key.
    ForeignKeyMismatch {
        table: &'static str,
        column: String,
        expected: Option<String>,
        found: Option<String>,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Migration {
                version,
                name,
                source,
            } => write!(f, "migration {version} ({name}) failed: {source}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::ForeignKeyMismatch {
                table,
                column,
                expected,
                found,
            } => write!(
                f,
                "foreign key {table}.{column}: expected {}, found {}",
                expected.as_deref().unwrap_or("none"),
                found.as_deref().unwrap_or("none")
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Migration { source: err, .. } => Some(err),
            Self::UnsupportedSchemaVersion { .. } | Self::ForeignKeyMismatch { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
