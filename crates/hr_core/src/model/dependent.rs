//! Dependent entity: a family member attached to exactly one employee.

use crate::model::employee::{Employee, EmployeeId};
use crate::model::entity::{Entity, EntityKey, EntityKind, Link, RelationSpec, RowKey};
use crate::model::handle::{Handle, Slot};
use crate::model::validation::{require_text, ValidationError};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

pub type DependentId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependent {
    pub dependent_id: Option<DependentId>,
    pub first_name: String,
    pub last_name: String,
    /// Free-form label such as `Child` or `Spouse`.
    pub relationship: String,
    pub employee_id: Option<EmployeeId>,
    #[serde(skip)]
    pub employee: Option<Handle<Employee>>,
}

impl Dependent {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        relationship: impl Into<String>,
    ) -> Self {
        Self {
            dependent_id: None,
            first_name: first_name.into(),
            last_name: last_name.into(),
            relationship: relationship.into(),
            employee_id: None,
            employee: None,
        }
    }

    pub fn of_employee(mut self, employee: Handle<Employee>) -> Self {
        self.employee = Some(employee);
        self
    }

    pub fn of_employee_id(mut self, employee_id: EmployeeId) -> Self {
        self.employee_id = Some(employee_id);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependentRelation {
    Employee,
}

impl Entity for Dependent {
    type Key = DependentId;
    type Relation = DependentRelation;

    const KIND: EntityKind = EntityKind::Dependent;
    const COLUMNS: &'static [&'static str] =
        &["first_name", "last_name", "relationship", "employee_id"];

    fn key(&self) -> Option<DependentId> {
        self.dependent_id
    }

    fn set_key(&mut self, key: DependentId) {
        self.dependent_id = Some(key);
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.first_name.clone()),
            Value::Text(self.last_name.clone()),
            Value::Text(self.relationship.clone()),
            self.employee_id.map_or(Value::Null, Value::Integer),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            dependent_id: Some(row.get("dependent_id")?),
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
            relationship: row.get("relationship")?,
            employee_id: row.get("employee_id")?,
            employee: None,
        })
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text(Self::KIND, "first_name", &self.first_name)?;
        require_text(Self::KIND, "last_name", &self.last_name)?;
        require_text(Self::KIND, "relationship", &self.relationship)?;
        if self.employee_id.is_none() && self.employee.is_none() {
            return Err(ValidationError::MissingReference {
                kind: Self::KIND,
                column: "employee_id",
            });
        }
        Ok(())
    }

    fn relation(relation: DependentRelation) -> RelationSpec {
        match relation {
            DependentRelation::Employee => RelationSpec::ToOne {
                column: "employee_id",
                target: EntityKind::Employee,
            },
        }
    }

    fn attach_related(&mut self, relation: DependentRelation, related: Vec<Slot>) {
        match relation {
            DependentRelation::Employee => {
                self.employee = related.into_iter().next().map(Handle::from_slot);
            }
        }
    }

    fn forget(&mut self, slot: Slot) {
        if self.employee.is_some_and(|handle| handle.slot() == slot) {
            self.employee = None;
        }
    }

    fn link(&self, column: &str) -> Option<Link> {
        match column {
            "employee_id" => Some(Link::new(
                self.employee_id.map(RowKey::Int),
                self.employee.map(|handle| handle.slot()),
            )),
            _ => None,
        }
    }

    fn set_link_key(&mut self, column: &str, key: Option<RowKey>) {
        if column == "employee_id" {
            self.employee_id = key.as_ref().and_then(EmployeeId::from_row_key);
        }
    }

    fn set_link_target(&mut self, column: &str, target: Option<Slot>) {
        if column == "employee_id" {
            self.employee = target.map(Handle::from_slot);
        }
    }
}
