//! Core domain logic for the HR store.
//! Entities, the unit-of-work session and the query façade live here; the CLI
//! only wires them together.

pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod seed;
pub mod service;
pub mod session;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::{
    Collection, Country, CountryRelation, Department, DepartmentRelation, Dependent,
    DependentRelation, Employee, EmployeeRelation, Entity, EntityKind, Handle, Location,
    LocationRelation, Region, RegionRelation, RowKey, ValidationError,
};
pub use query::Query;
pub use repo::{RepoError, RepoResult};
pub use seed::seed_sample_data;
pub use session::{CommitSummary, EntryState, Session, SessionError, SessionResult, SessionState};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
