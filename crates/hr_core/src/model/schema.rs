//! Static foreign-key and cascade table for the HR schema.
//!
//! # Invariants
//! - Every relationship is declared exactly once, on its child side.
//! - `DeleteRule::Cascade` is used only where the child cannot outlive its
//!   parent (department→employee, employee→dependent).

use crate::model::entity::EntityKind;

/// What happens to child rows when their parent is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteRule {
    /// Child rows are removed together with the parent.
    Cascade,
    /// Child rows stay and lose their reference.
    SetNull,
}

impl DeleteRule {
    /// `ON DELETE` action naming this rule in SQLite DDL.
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub child: EntityKind,
    pub column: &'static str,
    pub parent: EntityKind,
    pub on_delete: DeleteRule,
}

pub const FOREIGN_KEYS: &[ForeignKey] = &[
    ForeignKey {
        child: EntityKind::Country,
        column: "region_id",
        parent: EntityKind::Region,
        on_delete: DeleteRule::SetNull,
    },
    ForeignKey {
        child: EntityKind::Location,
        column: "country_id",
        parent: EntityKind::Country,
        on_delete: DeleteRule::SetNull,
    },
    ForeignKey {
        child: EntityKind::Department,
        column: "location_id",
        parent: EntityKind::Location,
        on_delete: DeleteRule::SetNull,
    },
    ForeignKey {
        child: EntityKind::Employee,
        column: "department_id",
        parent: EntityKind::Department,
        on_delete: DeleteRule::Cascade,
    },
    ForeignKey {
        child: EntityKind::Employee,
        column: "manager_id",
        parent: EntityKind::Employee,
        on_delete: DeleteRule::SetNull,
    },
    ForeignKey {
        child: EntityKind::Dependent,
        column: "employee_id",
        parent: EntityKind::Employee,
        on_delete: DeleteRule::Cascade,
    },
];

/// Foreign keys declared on `child`.
pub fn foreign_keys_of(child: EntityKind) -> impl Iterator<Item = &'static ForeignKey> {
    FOREIGN_KEYS.iter().filter(move |fk| fk.child == child)
}

/// Foreign keys whose parent side is `parent`.
pub fn referencing(parent: EntityKind) -> impl Iterator<Item = &'static ForeignKey> {
    FOREIGN_KEYS.iter().filter(move |fk| fk.parent == parent)
}
