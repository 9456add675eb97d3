//! Employee entity.
//!
//! # Invariants
//! - `manager` / `manager_id` point at another employee row (self-reference).
//! - Removing an employee removes its dependents; its subordinates keep their
//!   rows and lose the manager reference.

use crate::model::department::{Department, DepartmentId};
use crate::model::dependent::Dependent;
use crate::model::entity::{Entity, EntityKey, EntityKind, Link, RelationSpec, RowKey};
use crate::model::handle::{Collection, Handle, Slot};
use crate::model::validation::{require_email, require_salary, require_text, ValidationError};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

pub type EmployeeId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub employee_id: Option<EmployeeId>,
    pub first_name: Option<String>,
    pub last_name: String,
    pub email: String,
    /// `None` means the employee has no phone number on record.
    pub phone_number: Option<String>,
    pub salary: f64,
    pub manager_id: Option<EmployeeId>,
    pub department_id: Option<DepartmentId>,
    #[serde(skip)]
    pub manager: Option<Handle<Employee>>,
    #[serde(skip)]
    pub department: Option<Handle<Department>>,
    #[serde(skip)]
    pub dependents: Collection<Dependent>,
    #[serde(skip)]
    pub subordinates: Collection<Employee>,
}

impl Employee {
    pub fn new(last_name: impl Into<String>, email: impl Into<String>, salary: f64) -> Self {
        Self {
            employee_id: None,
            first_name: None,
            last_name: last_name.into(),
            email: email.into(),
            phone_number: None,
            salary,
            manager_id: None,
            department_id: None,
            manager: None,
            department: None,
            dependents: Collection::new(),
            subordinates: Collection::new(),
        }
    }

    pub fn in_department(mut self, department: Handle<Department>) -> Self {
        self.department = Some(department);
        self
    }

    pub fn managed_by(mut self, manager: Handle<Employee>) -> Self {
        self.manager = Some(manager);
        self
    }

    /// `first last`, or just the last name when no first name is recorded.
    pub fn full_name(&self) -> String {
        match self.first_name.as_deref() {
            Some(first) => format!("{first} {}", self.last_name),
            None => self.last_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmployeeRelation {
    Department,
    Manager,
    Dependents,
    Subordinates,
}

impl Entity for Employee {
    type Key = EmployeeId;
    type Relation = EmployeeRelation;

    const KIND: EntityKind = EntityKind::Employee;
    const COLUMNS: &'static [&'static str] = &[
        "first_name",
        "last_name",
        "email",
        "phone_number",
        "salary",
        "manager_id",
        "department_id",
    ];

    fn key(&self) -> Option<EmployeeId> {
        self.employee_id
    }

    fn set_key(&mut self, key: EmployeeId) {
        self.employee_id = Some(key);
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            self.first_name.clone().map_or(Value::Null, Value::Text),
            Value::Text(self.last_name.clone()),
            Value::Text(self.email.clone()),
            self.phone_number.clone().map_or(Value::Null, Value::Text),
            Value::Real(self.salary),
            self.manager_id.map_or(Value::Null, Value::Integer),
            self.department_id.map_or(Value::Null, Value::Integer),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            employee_id: Some(row.get("employee_id")?),
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
            email: row.get("email")?,
            phone_number: row.get("phone_number")?,
            salary: row.get("salary")?,
            manager_id: row.get("manager_id")?,
            department_id: row.get("department_id")?,
            manager: None,
            department: None,
            dependents: Collection::new(),
            subordinates: Collection::new(),
        })
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text(Self::KIND, "last_name", &self.last_name)?;
        require_text(Self::KIND, "email", &self.email)?;
        require_email(&self.email)?;
        require_salary(self.salary)
    }

    fn relation(relation: EmployeeRelation) -> RelationSpec {
        match relation {
            EmployeeRelation::Department => RelationSpec::ToOne {
                column: "department_id",
                target: EntityKind::Department,
            },
            EmployeeRelation::Manager => RelationSpec::ToOne {
                column: "manager_id",
                target: EntityKind::Employee,
            },
            EmployeeRelation::Dependents => RelationSpec::ToMany {
                child: EntityKind::Dependent,
                column: "employee_id",
            },
            EmployeeRelation::Subordinates => RelationSpec::ToMany {
                child: EntityKind::Employee,
                column: "manager_id",
            },
        }
    }

    fn attach_related(&mut self, relation: EmployeeRelation, related: Vec<Slot>) {
        match relation {
            EmployeeRelation::Department => {
                self.department = related.into_iter().next().map(Handle::from_slot);
            }
            EmployeeRelation::Manager => {
                self.manager = related.into_iter().next().map(Handle::from_slot);
            }
            EmployeeRelation::Dependents => self.dependents.replace_loaded(related),
            EmployeeRelation::Subordinates => self.subordinates.replace_loaded(related),
        }
    }

    fn forget(&mut self, slot: Slot) {
        if self.department.is_some_and(|handle| handle.slot() == slot) {
            self.department = None;
        }
        if self.manager.is_some_and(|handle| handle.slot() == slot) {
            self.manager = None;
        }
        self.dependents.forget(slot);
        self.subordinates.forget(slot);
    }

    fn link(&self, column: &str) -> Option<Link> {
        match column {
            "department_id" => Some(Link::new(
                self.department_id.map(RowKey::Int),
                self.department.map(|handle| handle.slot()),
            )),
            "manager_id" => Some(Link::new(
                self.manager_id.map(RowKey::Int),
                self.manager.map(|handle| handle.slot()),
            )),
            _ => None,
        }
    }

    fn set_link_key(&mut self, column: &str, key: Option<RowKey>) {
        match column {
            "department_id" => {
                self.department_id = key.as_ref().and_then(DepartmentId::from_row_key);
            }
            "manager_id" => {
                self.manager_id = key.as_ref().and_then(EmployeeId::from_row_key);
            }
            _ => {}
        }
    }

    fn set_link_target(&mut self, column: &str, target: Option<Slot>) {
        match column {
            "department_id" => self.department = target.map(Handle::from_slot),
            "manager_id" => self.manager = target.map(Handle::from_slot),
            _ => {}
        }
    }
}
