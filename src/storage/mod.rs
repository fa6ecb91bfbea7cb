//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - types(type_id, name, mandatory_fields)
//! - cis(ci_id, type_id, <attribute columns>)
//! - hierarchies(hierarchy_id, parent_id, child_id, hierarchy_type)

pub mod schema;
pub mod sqlite;

pub use sqlite::{DbStats, SqliteStore};
