//! Services - the CMDB rules over the storage layer
//!
//! - [`CiStore`]: CRUD over configuration items with type-driven validation
//! - [`HierarchyStore`]: creation of parent → child edges under a policy
//! - [`TypeRegistry`]: administrative access to CI types
//!
//! Services are stateless borrows of a [`SqliteStore`](crate::SqliteStore).
//! Every failure is logged here with the operation name and the ids it
//! concerned, then returned unchanged.

/// Log a failed operation. Rejections are warnings, store failures are errors.
///
/// Extra `tracing` fields (ids) go after the error argument.
macro_rules! log_failure {
    ($op:expr, $err:expr $(, $($field:tt)+)?) => {
        if $err.is_rejection() {
            tracing::warn!(op = $op, $($($field)+,)? error = %$err, "operation rejected");
        } else {
            tracing::error!(op = $op, $($($field)+,)? error = %$err, "operation failed");
        }
    };
}

pub(crate) use log_failure;

pub mod items;
pub mod hierarchies;
pub mod types;

pub use hierarchies::HierarchyStore;
pub use items::CiStore;
pub use types::TypeRegistry;
