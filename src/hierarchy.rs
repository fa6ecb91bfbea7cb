//! Hierarchy edges - directed, typed relationships between CIs
//!
//! An edge reads "parent `hierarchy_type` child", e.g. `host-01 hosts app-03`.
//! Edges are created once and never updated.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// A stored parent → child edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hierarchy {
    pub hierarchy_id: i64,
    pub parent_id: i64,
    pub child_id: i64,
    pub hierarchy_type: String,
}

/// Input for creating an edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct NewHierarchy {
    pub parent_id: i64,
    pub child_id: i64,
    #[validate(length(min = 1, max = 50))]
    pub hierarchy_type: String,
}

impl NewHierarchy {
    pub fn new(parent_id: i64, child_id: i64, hierarchy_type: impl Into<String>) -> Self {
        Self {
            parent_id,
            child_id,
            hierarchy_type: hierarchy_type.into(),
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.parent_id == self.child_id
    }
}

/// Graph rules applied when an edge is written.
///
/// The default is fully permissive: dangling endpoints, self-loops,
/// duplicates and cycles are all accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchyPolicy {
    /// Both endpoints must reference existing CIs
    pub require_existing_cis: bool,
    /// Governs `parent_id == child_id` edges on its own, whatever `allow_cycles` says
    pub allow_self_loops: bool,
    /// When false, an edge that would close a longer directed cycle is rejected
    pub allow_cycles: bool,
}

impl Default for HierarchyPolicy {
    fn default() -> Self {
        Self::permissive()
    }
}

impl HierarchyPolicy {
    pub fn permissive() -> Self {
        Self {
            require_existing_cis: false,
            allow_self_loops: true,
            allow_cycles: true,
        }
    }

    pub fn strict() -> Self {
        Self {
            require_existing_cis: true,
            allow_self_loops: false,
            allow_cycles: false,
        }
    }

    /// True when no check has to touch the store
    pub fn is_permissive(&self) -> bool {
        !self.require_existing_cis && self.allow_self_loops && self.allow_cycles
    }
}
