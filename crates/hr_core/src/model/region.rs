//! Region entity: top of the geographic hierarchy.

use crate::model::country::Country;
use crate::model::entity::{Entity, EntityKind, RelationSpec};
use crate::model::handle::{Collection, Slot};
use crate::model::validation::{require_text, ValidationError};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

pub type RegionId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// `None` until the store assigns a key.
    pub region_id: Option<RegionId>,
    pub region_name: String,
    #[serde(skip)]
    pub countries: Collection<Country>,
}

impl Region {
    pub fn new(region_name: impl Into<String>) -> Self {
        Self {
            region_id: None,
            region_name: region_name.into(),
            countries: Collection::new(),
        }
    }

    /// Creates a region with a caller-chosen key, as used by seed data.
    pub fn with_id(region_id: RegionId, region_name: impl Into<String>) -> Self {
        Self {
            region_id: Some(region_id),
            ..Self::new(region_name)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionRelation {
    Countries,
}

impl Entity for Region {
    type Key = RegionId;
    type Relation = RegionRelation;

    const KIND: EntityKind = EntityKind::Region;
    const COLUMNS: &'static [&'static str] = &["region_name"];

    fn key(&self) -> Option<RegionId> {
        self.region_id
    }

    fn set_key(&mut self, key: RegionId) {
        self.region_id = Some(key);
    }

    fn column_values(&self) -> Vec<Value> {
        vec![Value::Text(self.region_name.clone())]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            region_id: Some(row.get("region_id")?),
            region_name: row.get("region_name")?,
            countries: Collection::new(),
        })
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text(Self::KIND, "region_name", &self.region_name)
    }

    fn relation(relation: RegionRelation) -> RelationSpec {
        match relation {
            RegionRelation::Countries => RelationSpec::ToMany {
                child: EntityKind::Country,
                column: "region_id",
            },
        }
    }

    fn attach_related(&mut self, relation: RegionRelation, related: Vec<Slot>) {
        match relation {
            RegionRelation::Countries => self.countries.replace_loaded(related),
        }
    }

    fn forget(&mut self, slot: Slot) {
        self.countries.forget(slot);
    }
}
