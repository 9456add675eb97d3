//! Row store: the SQL boundary of the crate.
//!
//! # Responsibility
//! - Translate entity reads and writes into parameterized SQLite statements.
//! - Keep SQL text out of the session and query layers.
//!
//! # Invariants
//! - Row store functions never validate entities; the session does that
//!   before calling in.
//! - Errors distinguish store failures (`Db`) from missing rows (`NotFound`).

pub mod row_store;

pub use row_store::{ColumnFilter, RepoError, RepoResult};
