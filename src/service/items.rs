//! CI Store - configuration item operations

use crate::item::{CiAttributes, CiPatch, ConfigItem};
use crate::storage::SqliteStore;
use crate::Result;
use super::log_failure;

/// Configuration item operations over a store
pub struct CiStore<'a> {
    store: &'a SqliteStore,
}

impl<'a> CiStore<'a> {
    pub fn new(store: &'a SqliteStore) -> Self {
        Self { store }
    }

    /// Create a CI after checking its type's mandatory fields.
    ///
    /// Fails with `ReferenceNotFound` for an unknown type and with
    /// `ValidationFailed` listing every missing mandatory field.
    pub fn create(&self, attrs: &CiAttributes) -> Result<ConfigItem> {
        let item = self
            .store
            .create_ci(attrs)
            .inspect_err(|e| log_failure!("create_ci", e, type_id = attrs.type_id))?;
        tracing::debug!(ci_id = item.ci_id, type_id = item.type_id, "created configuration item");
        Ok(item)
    }

    /// All CIs matching every supplied filter field, ordered by `ci_id`
    pub fn get_all(&self, filters: &CiAttributes) -> Result<Vec<ConfigItem>> {
        self.store
            .find_cis(filters)
            .inspect_err(|e| log_failure!("get_all_cis", e))
    }

    /// `None` when no CI has this id
    pub fn get_by_id(&self, ci_id: i64) -> Result<Option<ConfigItem>> {
        self.store
            .get_ci(ci_id)
            .inspect_err(|e| log_failure!("get_ci_by_id", e, ci_id))
    }

    /// Partial update; mandatory fields are not re-checked.
    /// `None` when no CI has this id.
    pub fn update(&self, ci_id: i64, patch: &CiPatch) -> Result<Option<ConfigItem>> {
        let updated = self
            .store
            .update_ci(ci_id, patch)
            .inspect_err(|e| log_failure!("update_ci", e, ci_id))?;
        if updated.is_none() {
            tracing::debug!(ci_id, "update matched no configuration item");
        }
        Ok(updated)
    }

    /// Idempotent delete; removing a missing CI is not an error
    pub fn delete(&self, ci_id: i64) -> Result<()> {
        let removed = self
            .store
            .delete_ci(ci_id)
            .inspect_err(|e| log_failure!("delete_ci", e, ci_id))?;
        tracing::debug!(ci_id, removed, "deleted configuration item");
        Ok(())
    }
}
