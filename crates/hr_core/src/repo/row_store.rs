//! Generic SQLite row store for the HR tables.
//!
//! # Responsibility
//! - Own every `SELECT/INSERT/UPDATE/DELETE` statement issued by the crate.
//! - Map rows to entities through `Entity::from_row` / `Entity::column_values`.
//!
//! # Invariants
//! - Column names reach SQL text only after being checked against the
//!   entity's declared columns.
//! - Writes report `NotFound` when the targeted row does not exist.

use crate::db::DbError;
use crate::model::entity::{Entity, EntityKind, Record, RowKey};
use crate::model::{Country, Department, Dependent, Employee, Location, Region};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Row store error for HR persistence operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound { kind: EntityKind, key: RowKey },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { kind, key } => write!(f, "{kind} not found: {key}"),
            Self::InvalidData(message) => write!(f, "invalid row store request: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// One `WHERE` condition; conditions are joined with `AND`.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnFilter {
    Eq(&'static str, Value),
    IsNull(&'static str),
    In(&'static str, Vec<RowKey>),
}

impl ColumnFilter {
    pub fn column(&self) -> &'static str {
        match self {
            Self::Eq(column, _) | Self::IsNull(column) | Self::In(column, _) => column,
        }
    }
}

/// Data columns declared for `kind`, key column excluded.
pub fn columns_of(kind: EntityKind) -> &'static [&'static str] {
    match kind {
        EntityKind::Region => Region::COLUMNS,
        EntityKind::Country => Country::COLUMNS,
        EntityKind::Location => Location::COLUMNS,
        EntityKind::Department => Department::COLUMNS,
        EntityKind::Employee => Employee::COLUMNS,
        EntityKind::Dependent => Dependent::COLUMNS,
    }
}

/// Whether `column` is the key column or one of the data columns of `kind`.
pub fn has_column(kind: EntityKind, column: &str) -> bool {
    kind.key_column() == column || columns_of(kind).contains(&column)
}

fn select_sql(kind: EntityKind) -> String {
    let mut columns = vec![kind.key_column()];
    columns.extend_from_slice(columns_of(kind));
    format!("SELECT {} FROM {}", columns.join(", "), kind.table())
}

fn where_clause(
    kind: EntityKind,
    filters: &[ColumnFilter],
    bind_values: &mut Vec<Value>,
) -> RepoResult<String> {
    let mut clause = String::new();
    for filter in filters {
        if !has_column(kind, filter.column()) {
            return Err(RepoError::InvalidData(format!(
                "{kind} has no column `{}`",
                filter.column()
            )));
        }
        clause.push_str(if clause.is_empty() { " WHERE " } else { " AND " });
        match filter {
            ColumnFilter::Eq(column, value) => {
                bind_values.push(value.clone());
                clause.push_str(&format!("{column} = ?{}", bind_values.len()));
            }
            ColumnFilter::IsNull(column) => {
                clause.push_str(&format!("{column} IS NULL"));
            }
            ColumnFilter::In(column, keys) => {
                if keys.is_empty() {
                    clause.push_str("0 = 1");
                    continue;
                }
                let mut placeholders = Vec::with_capacity(keys.len());
                for key in keys {
                    bind_values.push(key.clone().into());
                    placeholders.push(format!("?{}", bind_values.len()));
                }
                clause.push_str(&format!("{column} IN ({})", placeholders.join(", ")));
            }
        }
    }
    Ok(clause)
}

/// Selects rows of `E` matching every filter, ordered by primary key.
pub fn select_where<E: Entity>(conn: &Connection, filters: &[ColumnFilter]) -> RepoResult<Vec<E>> {
    let mut bind_values = Vec::new();
    let clause = where_clause(E::KIND, filters, &mut bind_values)?;
    let sql = format!(
        "{}{clause} ORDER BY {} ASC;",
        select_sql(E::KIND),
        E::KIND.key_column()
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values.iter()))?;
    let mut entities = Vec::new();
    while let Some(row) = rows.next()? {
        entities.push(E::from_row(row)?);
    }
    Ok(entities)
}

/// Loads one row of `E` by primary key.
pub fn select_by_key<E: Entity>(conn: &Connection, key: &RowKey) -> RepoResult<Option<E>> {
    let filters = [ColumnFilter::Eq(E::KIND.key_column(), key.clone().into())];
    Ok(select_where::<E>(conn, &filters)?.into_iter().next())
}

/// Counts rows of `kind` matching every filter.
pub fn count_rows(conn: &Connection, kind: EntityKind, filters: &[ColumnFilter]) -> RepoResult<u64> {
    let mut bind_values = Vec::new();
    let clause = where_clause(kind, filters, &mut bind_values)?;
    let sql = format!("SELECT COUNT(*) FROM {}{clause};", kind.table());
    let count: i64 = conn.query_row(&sql, params_from_iter(bind_values.iter()), |row| {
        row.get(0)
    })?;
    u64::try_from(count).map_err(|_| RepoError::InvalidData(format!("negative row count {count}")))
}

fn boxed<E: Entity>(conn: &Connection, filters: &[ColumnFilter]) -> RepoResult<Vec<Box<dyn Record>>> {
    Ok(select_where::<E>(conn, filters)?
        .into_iter()
        .map(|entity| Box::new(entity) as Box<dyn Record>)
        .collect())
}

/// Type-erased `select_where`, dispatched on `kind`.
pub(crate) fn fetch_records(
    conn: &Connection,
    kind: EntityKind,
    filters: &[ColumnFilter],
) -> RepoResult<Vec<Box<dyn Record>>> {
    match kind {
        EntityKind::Region => boxed::<Region>(conn, filters),
        EntityKind::Country => boxed::<Country>(conn, filters),
        EntityKind::Location => boxed::<Location>(conn, filters),
        EntityKind::Department => boxed::<Department>(conn, filters),
        EntityKind::Employee => boxed::<Employee>(conn, filters),
        EntityKind::Dependent => boxed::<Dependent>(conn, filters),
    }
}

/// Inserts one row and returns its primary key.
///
/// The key column is written only when the record already carries a key;
/// otherwise SQLite generates it.
pub(crate) fn insert_row(conn: &Connection, record: &dyn Record) -> RepoResult<RowKey> {
    let kind = record.kind();
    let mut columns: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();
    let explicit_key = record.row_key();
    if let Some(key) = explicit_key.clone() {
        columns.push(kind.key_column());
        values.push(key.into());
    }
    columns.extend_from_slice(record.columns());
    values.extend(record.values());

    let placeholders: Vec<String> = (1..=values.len()).map(|index| format!("?{index}")).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({});",
        kind.table(),
        columns.join(", "),
        placeholders.join(", ")
    );
    conn.execute(&sql, params_from_iter(values.iter()))?;

    Ok(explicit_key.unwrap_or_else(|| RowKey::Int(conn.last_insert_rowid())))
}

/// Rewrites every data column of the row identified by `key`.
pub(crate) fn update_row(conn: &Connection, record: &dyn Record, key: &RowKey) -> RepoResult<()> {
    let kind = record.kind();
    let columns = record.columns();
    let mut values = record.values();
    let assignments: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(index, column)| format!("{column} = ?{}", index + 1))
        .collect();
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?{};",
        kind.table(),
        assignments.join(", "),
        kind.key_column(),
        columns.len() + 1
    );
    values.push(key.clone().into());

    let changed = conn.execute(&sql, params_from_iter(values.iter()))?;
    if changed == 0 {
        return Err(RepoError::NotFound {
            kind,
            key: key.clone(),
        });
    }
    Ok(())
}

pub fn delete_row(conn: &Connection, kind: EntityKind, key: &RowKey) -> RepoResult<()> {
    let sql = format!(
        "DELETE FROM {} WHERE {} = ?1;",
        kind.table(),
        kind.key_column()
    );
    let changed = conn.execute(&sql, [key])?;
    if changed == 0 {
        return Err(RepoError::NotFound {
            kind,
            key: key.clone(),
        });
    }
    Ok(())
}
