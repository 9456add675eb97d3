//! HR entity model.
//!
//! # Responsibility
//! - Define the six HR entities as plain data with typed relationships.
//! - Declare the foreign-key/cascade table consulted at commit time.
//!
//! # Invariants
//! - To-one relationships carry both a scalar key and an optional handle; the
//!   handle wins when both are set.
//! - To-many relationships are `Collection`s that start empty.

pub mod country;
pub mod department;
pub mod dependent;
pub mod employee;
pub mod entity;
pub mod handle;
pub mod location;
pub mod region;
pub mod schema;
pub mod validation;

pub use country::{Country, CountryId, CountryRelation};
pub use department::{Department, DepartmentId, DepartmentRelation};
pub use dependent::{Dependent, DependentId, DependentRelation};
pub use employee::{Employee, EmployeeId, EmployeeRelation};
pub use entity::{Entity, EntityKey, EntityKind, Link, RelationSpec, RowKey};
pub use handle::{Collection, Handle, Slot};
pub use location::{Location, LocationId, LocationRelation};
pub use region::{Region, RegionId, RegionRelation};
pub use schema::{DeleteRule, ForeignKey, FOREIGN_KEYS};
pub use validation::ValidationError;
