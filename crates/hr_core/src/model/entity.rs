//! Entity contract shared by the session, query and row-store layers.
//!
//! # Responsibility
//! - Identify the six HR tables and their primary-key columns.
//! - Describe how one entity maps to a row and exposes its relationships.
//!
//! # Invariants
//! - `Entity::COLUMNS` lists data columns in bind order; the key column is
//!   never part of it.
//! - A to-one relationship is visible through `Entity::link` under the name of
//!   its foreign-key column.

use crate::model::handle::Slot;
use crate::model::validation::ValidationError;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Value, ValueRef};
use rusqlite::{Row, ToSql};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt::{self, Display, Formatter};
use std::hash::Hash;

/// Table-level identity of every entity type in the HR schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Region,
    Country,
    Location,
    Department,
    Employee,
    Dependent,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        Self::Region,
        Self::Country,
        Self::Location,
        Self::Department,
        Self::Employee,
        Self::Dependent,
    ];

    pub fn table(self) -> &'static str {
        match self {
            Self::Region => "regions",
            Self::Country => "countries",
            Self::Location => "locations",
            Self::Department => "departments",
            Self::Employee => "employees",
            Self::Dependent => "dependents",
        }
    }

    pub fn key_column(self) -> &'static str {
        match self {
            Self::Region => "region_id",
            Self::Country => "country_id",
            Self::Location => "location_id",
            Self::Department => "department_id",
            Self::Employee => "employee_id",
            Self::Dependent => "dependent_id",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Region => "region",
            Self::Country => "country",
            Self::Location => "location",
            Self::Department => "department",
            Self::Employee => "employee",
            Self::Dependent => "dependent",
        }
    }

    /// Position in the parent-first chain, used as a deterministic tie-break
    /// when ordering rows of unrelated types.
    pub fn rank(self) -> u8 {
        match self {
            Self::Region => 0,
            Self::Country => 1,
            Self::Location => 2,
            Self::Department => 3,
            Self::Employee => 4,
            Self::Dependent => 5,
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primary-key value with the entity type erased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RowKey {
    /// Generated integer keys (`region_id`, `employee_id`, ...).
    Int(i64),
    /// Caller-supplied text keys (`country_id`).
    Code(String),
}

impl Display for RowKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Code(value) => f.write_str(value),
        }
    }
}

impl ToSql for RowKey {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Self::Int(value) => value.to_sql(),
            Self::Code(value) => value.to_sql(),
        }
    }
}

impl FromSql for RowKey {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Integer(number) => Ok(Self::Int(number)),
            ValueRef::Text(_) => value.as_str().map(|text| Self::Code(text.to_owned())),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

impl From<RowKey> for Value {
    fn from(value: RowKey) -> Self {
        match value {
            RowKey::Int(number) => Value::Integer(number),
            RowKey::Code(text) => Value::Text(text),
        }
    }
}

/// Typed primary key that can travel through the erased `RowKey` form.
pub trait EntityKey: Clone + Eq + Hash + Ord + fmt::Debug + Display + 'static {
    fn to_row_key(&self) -> RowKey;
    fn from_row_key(key: &RowKey) -> Option<Self>;
}

impl EntityKey for i64 {
    fn to_row_key(&self) -> RowKey {
        RowKey::Int(*self)
    }

    fn from_row_key(key: &RowKey) -> Option<Self> {
        match key {
            RowKey::Int(value) => Some(*value),
            RowKey::Code(_) => None,
        }
    }
}

impl EntityKey for String {
    fn to_row_key(&self) -> RowKey {
        RowKey::Code(self.clone())
    }

    fn from_row_key(key: &RowKey) -> Option<Self> {
        match key {
            RowKey::Code(value) => Some(value.clone()),
            RowKey::Int(_) => None,
        }
    }
}

/// Snapshot of one to-one relationship: scalar foreign key plus object handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub key: Option<RowKey>,
    pub target: Option<Slot>,
}

impl Link {
    pub fn new(key: Option<RowKey>, target: Option<Slot>) -> Self {
        Self { key, target }
    }
}

/// Shape of a named relationship, used by eager and explicit loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationSpec {
    /// Follows a foreign-key column on this entity to its parent row.
    ToOne {
        column: &'static str,
        target: EntityKind,
    },
    /// Collects `child` rows whose `column` points at this entity.
    ToMany {
        child: EntityKind,
        column: &'static str,
    },
}

/// Row mapping and relationship access for one HR entity type.
pub trait Entity: Clone + fmt::Debug + 'static {
    type Key: EntityKey;
    /// Loadable relationships of this entity.
    type Relation: Copy + fmt::Debug + Eq + 'static;

    const KIND: EntityKind;
    const COLUMNS: &'static [&'static str];

    fn key(&self) -> Option<Self::Key>;
    fn set_key(&mut self, key: Self::Key);
    /// Values for `COLUMNS`, in the same order.
    fn column_values(&self) -> Vec<Value>;
    /// Builds an entity from a row holding the key column and `COLUMNS`.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
    fn validate(&self) -> Result<(), ValidationError>;

    fn relation(relation: Self::Relation) -> RelationSpec;
    /// Stores the handles produced by loading `relation`.
    fn attach_related(&mut self, relation: Self::Relation, related: Vec<Slot>);
    /// Drops every handle pointing at `slot`.
    fn forget(&mut self, _slot: Slot) {}

    fn link(&self, _column: &str) -> Option<Link> {
        None
    }

    fn set_link_key(&mut self, _column: &str, _key: Option<RowKey>) {}

    fn set_link_target(&mut self, _column: &str, _target: Option<Slot>) {}
}

/// Object-safe view of an entity, stored by the session's identity map.
pub(crate) trait Record: fmt::Debug {
    fn kind(&self) -> EntityKind;
    fn row_key(&self) -> Option<RowKey>;
    fn assign_key(&mut self, key: &RowKey) -> bool;
    fn columns(&self) -> &'static [&'static str];
    fn values(&self) -> Vec<Value>;
    fn link_at(&self, column: &str) -> Option<Link>;
    fn set_link_key_at(&mut self, column: &str, key: Option<RowKey>);
    fn set_link_target_at(&mut self, column: &str, target: Option<Slot>);
    fn forget_slot(&mut self, slot: Slot);
    fn check(&self) -> Result<(), ValidationError>;
    fn clone_record(&self) -> Box<dyn Record>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Current value of `column`, including the key column.
    fn column_value(&self, column: &str) -> Option<Value> {
        if column == self.kind().key_column() {
            return Some(self.row_key().map_or(Value::Null, Value::from));
        }
        let position = self.columns().iter().position(|name| *name == column)?;
        self.values().into_iter().nth(position)
    }
}

impl<E: Entity> Record for E {
    fn kind(&self) -> EntityKind {
        E::KIND
    }

    fn row_key(&self) -> Option<RowKey> {
        self.key().map(|key| key.to_row_key())
    }

    fn assign_key(&mut self, key: &RowKey) -> bool {
        match E::Key::from_row_key(key) {
            Some(value) => {
                self.set_key(value);
                true
            }
            None => false,
        }
    }

    fn columns(&self) -> &'static [&'static str] {
        E::COLUMNS
    }

    fn values(&self) -> Vec<Value> {
        self.column_values()
    }

    fn link_at(&self, column: &str) -> Option<Link> {
        Entity::link(self, column)
    }

    fn set_link_key_at(&mut self, column: &str, key: Option<RowKey>) {
        Entity::set_link_key(self, column, key);
    }

    fn set_link_target_at(&mut self, column: &str, target: Option<Slot>) {
        Entity::set_link_target(self, column, target);
    }

    fn forget_slot(&mut self, slot: Slot) {
        Entity::forget(self, slot);
    }

    fn check(&self) -> Result<(), ValidationError> {
        self.validate()
    }

    fn clone_record(&self) -> Box<dyn Record> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
