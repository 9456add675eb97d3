//! Location entity: an office address inside a country.

use crate::model::country::{Country, CountryId};
use crate::model::department::Department;
use crate::model::entity::{Entity, EntityKey, EntityKind, Link, RelationSpec, RowKey};
use crate::model::handle::{Collection, Handle, Slot};
use crate::model::validation::{require_text, ValidationError};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

pub type LocationId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub location_id: Option<LocationId>,
    pub street_address: Option<String>,
    pub postal_code: Option<String>,
    pub city: String,
    pub state_province: Option<String>,
    pub country_id: Option<CountryId>,
    #[serde(skip)]
    pub country: Option<Handle<Country>>,
    #[serde(skip)]
    pub departments: Collection<Department>,
}

impl Location {
    pub fn new(city: impl Into<String>) -> Self {
        Self {
            location_id: None,
            street_address: None,
            postal_code: None,
            city: city.into(),
            state_province: None,
            country_id: None,
            country: None,
            departments: Collection::new(),
        }
    }

    pub fn at(mut self, street_address: impl Into<String>) -> Self {
        self.street_address = Some(street_address.into());
        self
    }

    pub fn in_country(mut self, country: Handle<Country>) -> Self {
        self.country = Some(country);
        self
    }

    pub fn in_country_id(mut self, country_id: impl Into<CountryId>) -> Self {
        self.country_id = Some(country_id.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationRelation {
    Country,
    Departments,
}

impl Entity for Location {
    type Key = LocationId;
    type Relation = LocationRelation;

    const KIND: EntityKind = EntityKind::Location;
    const COLUMNS: &'static [&'static str] = &[
        "street_address",
        "postal_code",
        "city",
        "state_province",
        "country_id",
    ];

    fn key(&self) -> Option<LocationId> {
        self.location_id
    }

    fn set_key(&mut self, key: LocationId) {
        self.location_id = Some(key);
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            self.street_address.clone().map_or(Value::Null, Value::Text),
            self.postal_code.clone().map_or(Value::Null, Value::Text),
            Value::Text(self.city.clone()),
            self.state_province.clone().map_or(Value::Null, Value::Text),
            self.country_id.clone().map_or(Value::Null, Value::Text),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            location_id: Some(row.get("location_id")?),
            street_address: row.get("street_address")?,
            postal_code: row.get("postal_code")?,
            city: row.get("city")?,
            state_province: row.get("state_province")?,
            country_id: row.get("country_id")?,
            country: None,
            departments: Collection::new(),
        })
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text(Self::KIND, "city", &self.city)
    }

    fn relation(relation: LocationRelation) -> RelationSpec {
        match relation {
            LocationRelation::Country => RelationSpec::ToOne {
                column: "country_id",
                target: EntityKind::Country,
            },
            LocationRelation::Departments => RelationSpec::ToMany {
                child: EntityKind::Department,
                column: "location_id",
            },
        }
    }

    fn attach_related(&mut self, relation: LocationRelation, related: Vec<Slot>) {
        match relation {
            LocationRelation::Country => {
                self.country = related.into_iter().next().map(Handle::from_slot);
            }
            LocationRelation::Departments => self.departments.replace_loaded(related),
        }
    }

    fn forget(&mut self, slot: Slot) {
        if self.country.is_some_and(|handle| handle.slot() == slot) {
            self.country = None;
        }
        self.departments.forget(slot);
    }

    fn link(&self, column: &str) -> Option<Link> {
        match column {
            "country_id" => Some(Link::new(
                self.country_id.clone().map(RowKey::Code),
                self.country.map(|handle| handle.slot()),
            )),
            _ => None,
        }
    }

    fn set_link_key(&mut self, column: &str, key: Option<RowKey>) {
        if column == "country_id" {
            self.country_id = key.as_ref().and_then(CountryId::from_row_key);
        }
    }

    fn set_link_target(&mut self, column: &str, target: Option<Slot>) {
        if column == "country_id" {
            self.country = target.map(Handle::from_slot);
        }
    }
}
