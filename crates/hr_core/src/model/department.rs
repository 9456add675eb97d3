//! Department entity.

use crate::model::employee::Employee;
use crate::model::entity::{Entity, EntityKey, EntityKind, Link, RelationSpec, RowKey};
use crate::model::handle::{Collection, Handle, Slot};
use crate::model::location::{Location, LocationId};
use crate::model::validation::{require_text, ValidationError};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

pub type DepartmentId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    pub department_id: Option<DepartmentId>,
    pub department_name: String,
    pub location_id: Option<LocationId>,
    #[serde(skip)]
    pub location: Option<Handle<Location>>,
    #[serde(skip)]
    pub employees: Collection<Employee>,
}

impl Department {
    pub fn new(department_name: impl Into<String>) -> Self {
        Self {
            department_id: None,
            department_name: department_name.into(),
            location_id: None,
            location: None,
            employees: Collection::new(),
        }
    }

    pub fn at_location(mut self, location: Handle<Location>) -> Self {
        self.location = Some(location);
        self
    }

    pub fn at_location_id(mut self, location_id: LocationId) -> Self {
        self.location_id = Some(location_id);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepartmentRelation {
    Location,
    Employees,
}

impl Entity for Department {
    type Key = DepartmentId;
    type Relation = DepartmentRelation;

    const KIND: EntityKind = EntityKind::Department;
    const COLUMNS: &'static [&'static str] = &["department_name", "location_id"];

    fn key(&self) -> Option<DepartmentId> {
        self.department_id
    }

    fn set_key(&mut self, key: DepartmentId) {
        self.department_id = Some(key);
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.department_name.clone()),
            self.location_id.map_or(Value::Null, Value::Integer),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            department_id: Some(row.get("department_id")?),
            department_name: row.get("department_name")?,
            location_id: row.get("location_id")?,
            location: None,
            employees: Collection::new(),
        })
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text(Self::KIND, "department_name", &self.department_name)
    }

    fn relation(relation: DepartmentRelation) -> RelationSpec {
        match relation {
            DepartmentRelation::Location => RelationSpec::ToOne {
                column: "location_id",
                target: EntityKind::Location,
            },
            DepartmentRelation::Employees => RelationSpec::ToMany {
                child: EntityKind::Employee,
                column: "department_id",
            },
        }
    }

    fn attach_related(&mut self, relation: DepartmentRelation, related: Vec<Slot>) {
        match relation {
            DepartmentRelation::Location => {
                self.location = related.into_iter().next().map(Handle::from_slot);
            }
            DepartmentRelation::Employees => self.employees.replace_loaded(related),
        }
    }

    fn forget(&mut self, slot: Slot) {
        if self.location.is_some_and(|handle| handle.slot() == slot) {
            self.location = None;
        }
        self.employees.forget(slot);
    }

    fn link(&self, column: &str) -> Option<Link> {
        match column {
            "location_id" => Some(Link::new(
                self.location_id.map(RowKey::Int),
                self.location.map(|handle| handle.slot()),
            )),
            _ => None,
        }
    }

    fn set_link_key(&mut self, column: &str, key: Option<RowKey>) {
        if column == "location_id" {
            self.location_id = key.as_ref().and_then(LocationId::from_row_key);
        }
    }

    fn set_link_target(&mut self, column: &str, target: Option<Slot>) {
        if column == "location_id" {
            self.location = target.map(Handle::from_slot);
        }
    }
}
