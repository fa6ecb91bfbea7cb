//! # CMDB - Configuration Management Database core
//!
//! Stores configuration items (CIs) and the directed relationships between them.
//!
//! CMDB provides:
//! - Typed configuration items with per-type mandatory attributes
//! - Partial updates, equality filtering and idempotent deletes
//! - Parent → child hierarchy edges with an optional strict policy
//! - SQLite-backed storage
//! - An HTTP API and a CLI over the same services

pub mod item;
pub mod ci_type;
pub mod hierarchy;
pub mod storage;
pub mod service;
pub mod server;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use item::{CiAttributes, CiField, CiPatch, ConfigItem, Environment};
pub use ci_type::{CiType, NewCiType};
pub use hierarchy::{Hierarchy, HierarchyPolicy, NewHierarchy};
pub use service::{CiStore, HierarchyStore, TypeRegistry};
pub use storage::SqliteStore;

/// Result type alias for CMDB operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for CMDB operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Type with id={type_id} does not exist")]
    ReferenceNotFound { type_id: i64 },

    #[error("Missing required fields for type {type_id}: {}", .missing.join(", "))]
    ValidationFailed { type_id: i64, missing: Vec<String> },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration item {ci_id} does not exist")]
    DanglingReference { ci_id: i64 },

    #[error("Hierarchy rejected: {0}")]
    HierarchyRejected(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True when the caller sent something the rules reject, as opposed to
    /// the store failing underneath.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::ReferenceNotFound { .. }
                | Error::ValidationFailed { .. }
                | Error::InvalidInput(_)
                | Error::DanglingReference { .. }
                | Error::HierarchyRejected(_)
        )
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Error::InvalidInput(err.to_string())
    }
}
