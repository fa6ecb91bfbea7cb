//! Hierarchy Store - relationship edges between CIs

use crate::hierarchy::{Hierarchy, HierarchyPolicy, NewHierarchy};
use crate::storage::SqliteStore;
use crate::Result;
use super::log_failure;

/// Hierarchy edge operations over a store
pub struct HierarchyStore<'a> {
    store: &'a SqliteStore,
    policy: HierarchyPolicy,
}

impl<'a> HierarchyStore<'a> {
    /// Store with the default permissive policy
    pub fn new(store: &'a SqliteStore) -> Self {
        Self::with_policy(store, HierarchyPolicy::default())
    }

    pub fn with_policy(store: &'a SqliteStore, policy: HierarchyPolicy) -> Self {
        Self { store, policy }
    }

    /// Insert a directed edge and return it with its generated id.
    ///
    /// Under the permissive policy endpoints are not checked, and
    /// self-loops, duplicates and cycles are accepted.
    pub fn create_hierarchy(&self, edge: &NewHierarchy) -> Result<Hierarchy> {
        let hierarchy = self
            .store
            .insert_hierarchy(edge, &self.policy)
            .inspect_err(|e| {
                log_failure!(
                    "create_hierarchy",
                    e,
                    parent_id = edge.parent_id,
                    child_id = edge.child_id
                )
            })?;
        tracing::debug!(
            hierarchy_id = hierarchy.hierarchy_id,
            parent_id = hierarchy.parent_id,
            child_id = hierarchy.child_id,
            kind = %hierarchy.hierarchy_type,
            "created hierarchy edge"
        );
        Ok(hierarchy)
    }

    /// Edges touching `ci_id`, or all edges
    pub fn list(&self, ci_id: Option<i64>) -> Result<Vec<Hierarchy>> {
        self.store
            .list_hierarchies(ci_id)
            .inspect_err(|e| log_failure!("list_hierarchies", e, ci_id))
    }
}
