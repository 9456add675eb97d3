//! Country entity, keyed by a caller-supplied two-letter code.

use crate::model::entity::{Entity, EntityKey, EntityKind, Link, RelationSpec, RowKey};
use crate::model::handle::{Collection, Handle, Slot};
use crate::model::location::Location;
use crate::model::region::{Region, RegionId};
use crate::model::validation::{require_country_code, require_text, ValidationError};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

pub type CountryId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Country {
    pub country_id: CountryId,
    pub country_name: String,
    pub region_id: Option<RegionId>,
    /// Object reference; wins over `region_id` at commit.
    #[serde(skip)]
    pub region: Option<Handle<Region>>,
    #[serde(skip)]
    pub locations: Collection<Location>,
}

impl Country {
    pub fn new(country_id: impl Into<CountryId>, country_name: impl Into<String>) -> Self {
        Self {
            country_id: country_id.into(),
            country_name: country_name.into(),
            region_id: None,
            region: None,
            locations: Collection::new(),
        }
    }

    pub fn in_region(mut self, region: Handle<Region>) -> Self {
        self.region = Some(region);
        self
    }

    pub fn in_region_id(mut self, region_id: RegionId) -> Self {
        self.region_id = Some(region_id);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountryRelation {
    Region,
    Locations,
}

impl Entity for Country {
    type Key = CountryId;
    type Relation = CountryRelation;

    const KIND: EntityKind = EntityKind::Country;
    const COLUMNS: &'static [&'static str] = &["country_name", "region_id"];

    fn key(&self) -> Option<CountryId> {
        Some(self.country_id.clone())
    }

    fn set_key(&mut self, key: CountryId) {
        self.country_id = key;
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.country_name.clone()),
            self.region_id.map_or(Value::Null, Value::Integer),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            country_id: row.get("country_id")?,
            country_name: row.get("country_name")?,
            region_id: row.get("region_id")?,
            region: None,
            locations: Collection::new(),
        })
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_country_code(&self.country_id)?;
        require_text(Self::KIND, "country_name", &self.country_name)
    }

    fn relation(relation: CountryRelation) -> RelationSpec {
        match relation {
            CountryRelation::Region => RelationSpec::ToOne {
                column: "region_id",
                target: EntityKind::Region,
            },
            CountryRelation::Locations => RelationSpec::ToMany {
                child: EntityKind::Location,
                column: "country_id",
            },
        }
    }

    fn attach_related(&mut self, relation: CountryRelation, related: Vec<Slot>) {
        match relation {
            CountryRelation::Region => {
                self.region = related.into_iter().next().map(Handle::from_slot);
            }
            CountryRelation::Locations => self.locations.replace_loaded(related),
        }
    }

    fn forget(&mut self, slot: Slot) {
        if self.region.is_some_and(|handle| handle.slot() == slot) {
            self.region = None;
        }
        self.locations.forget(slot);
    }

    fn link(&self, column: &str) -> Option<Link> {
        match column {
            "region_id" => Some(Link::new(
                self.region_id.map(RowKey::Int),
                self.region.map(|handle| handle.slot()),
            )),
            _ => None,
        }
    }

    fn set_link_key(&mut self, column: &str, key: Option<RowKey>) {
        if column == "region_id" {
            self.region_id = key.as_ref().and_then(RegionId::from_row_key);
        }
    }

    fn set_link_target(&mut self, column: &str, target: Option<Slot>) {
        if column == "region_id" {
            self.region = target.map(Handle::from_slot);
        }
    }
}
