//! Type registry - administrative access to CI types

use crate::ci_type::{CiType, NewCiType};
use crate::storage::SqliteStore;
use crate::Result;
use super::log_failure;

pub struct TypeRegistry<'a> {
    store: &'a SqliteStore,
}

impl<'a> TypeRegistry<'a> {
    pub fn new(store: &'a SqliteStore) -> Self {
        Self { store }
    }

    /// Register a type. Field names are stored as given.
    pub fn create_type(&self, new_type: &NewCiType) -> Result<CiType> {
        let ci_type = self
            .store
            .insert_type(new_type)
            .inspect_err(|e| log_failure!("create_type", e))?;
        tracing::info!(
            type_id = ci_type.type_id,
            mandatory = ?ci_type.mandatory_fields,
            "registered CI type"
        );
        Ok(ci_type)
    }

    pub fn get_type(&self, type_id: i64) -> Result<Option<CiType>> {
        self.store
            .get_type(type_id)
            .inspect_err(|e| log_failure!("get_type", e, type_id))
    }

    pub fn list_types(&self) -> Result<Vec<CiType>> {
        self.store
            .list_types()
            .inspect_err(|e| log_failure!("list_types", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_list() {
        let store = SqliteStore::open_in_memory().unwrap();
        let registry = TypeRegistry::new(&store);

        let server = registry
            .create_type(&NewCiType::new(Some("server"), &["name", "serial_number"]))
            .unwrap();
        registry.create_type(&NewCiType::new(None, &[])).unwrap();

        let fetched = registry.get_type(server.type_id).unwrap().unwrap();
        assert_eq!(fetched, server);

        let ids: Vec<i64> = registry.list_types().unwrap().iter().map(|t| t.type_id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids[0] < ids[1]);
    }
}
