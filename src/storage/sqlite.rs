//! SQLite storage implementation

use std::collections::{HashSet, VecDeque};
use std::path::Path;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use crate::{Result, Error};
use crate::ci_type::{CiType, NewCiType};
use crate::hierarchy::{Hierarchy, HierarchyPolicy, NewHierarchy};
use crate::item::{CiAttributes, CiPatch, ConfigItem};
use super::schema::{self, CI_COLUMNS, HIERARCHY_COLUMNS};

/// SQLite-backed storage for types, CIs and hierarchy edges
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    // ========== Type Operations ==========

    /// Register a type
    pub fn insert_type(&self, new_type: &NewCiType) -> Result<CiType> {
        let fields = serde_json::to_string(&new_type.mandatory_fields)?;
        self.conn
            .query_row(
                "INSERT INTO types (name, mandatory_fields) VALUES (?1, ?2) \
                 RETURNING type_id, name, mandatory_fields",
                params![new_type.name, fields],
                row_to_type,
            )
            .map_err(Into::into)
    }

    /// Get a type by id
    pub fn get_type(&self, type_id: i64) -> Result<Option<CiType>> {
        query_type(&self.conn, type_id)
    }

    /// List all types ordered by id
    pub fn list_types(&self) -> Result<Vec<CiType>> {
        let mut stmt = self
            .conn
            .prepare("SELECT type_id, name, mandatory_fields FROM types ORDER BY type_id")?;

        let types = stmt
            .query_map([], row_to_type)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(types)
    }

    // ========== CI Operations ==========

    /// Validate `attrs` against its type and insert it.
    ///
    /// The type lookup and the insert share one transaction, so the type
    /// cannot disappear between the check and the write.
    pub fn create_ci(&self, attrs: &CiAttributes) -> Result<ConfigItem> {
        if attrs.ci_id.is_some() {
            return Err(Error::InvalidInput(
                "ci_id is generated and cannot be supplied".to_string(),
            ));
        }
        let type_id = attrs
            .type_id
            .ok_or_else(|| Error::InvalidInput("type_id is required".to_string()))?;

        let tx = self.conn.unchecked_transaction()?;
        let ci_type = query_type(&tx, type_id)?.ok_or(Error::ReferenceNotFound { type_id })?;
        ci_type.ensure_complete(attrs)?;

        let columns = attrs.columns();
        let names: Vec<&str> = columns.iter().map(|(field, _)| field.as_str()).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO cis ({}) VALUES ({}) RETURNING {}",
            names.join(", "),
            placeholders.join(", "),
            CI_COLUMNS
        );

        let item = tx.query_row(
            &sql,
            params_from_iter(columns.into_iter().map(|(_, value)| value)),
            row_to_ci,
        )?;
        tx.commit()?;
        Ok(item)
    }

    /// Get a CI by id
    pub fn get_ci(&self, ci_id: i64) -> Result<Option<ConfigItem>> {
        let sql = format!("SELECT {} FROM cis WHERE ci_id = ?1", CI_COLUMNS);
        self.conn
            .query_row(&sql, [ci_id], row_to_ci)
            .optional()
            .map_err(Into::into)
    }

    /// Find CIs whose supplied filter fields all match exactly, ordered by id.
    /// An empty filter returns every CI.
    pub fn find_cis(&self, filter: &CiAttributes) -> Result<Vec<ConfigItem>> {
        let columns = filter.columns();
        let predicates: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, (field, _))| format!("{} = ?{}", field.as_str(), i + 1))
            .collect();

        let sql = if predicates.is_empty() {
            format!("SELECT {} FROM cis ORDER BY ci_id", CI_COLUMNS)
        } else {
            format!(
                "SELECT {} FROM cis WHERE {} ORDER BY ci_id",
                CI_COLUMNS,
                predicates.join(" AND ")
            )
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let items = stmt
            .query_map(
                params_from_iter(columns.into_iter().map(|(_, value)| value)),
                row_to_ci,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(items)
    }

    /// Set only the fields present in `patch`.
    /// Returns `None` when no CI has this id.
    pub fn update_ci(&self, ci_id: i64, patch: &CiPatch) -> Result<Option<ConfigItem>> {
        let columns = patch.columns();
        if columns.is_empty() {
            return Err(Error::InvalidInput(
                "update must set at least one field".to_string(),
            ));
        }

        let assignments: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, (field, _))| format!("{} = ?{}", field.as_str(), i + 1))
            .collect();
        let sql = format!(
            "UPDATE cis SET {} WHERE ci_id = ?{} RETURNING {}",
            assignments.join(", "),
            columns.len() + 1,
            CI_COLUMNS
        );

        let values = columns
            .into_iter()
            .map(|(_, value)| value)
            .chain(std::iter::once(rusqlite::types::Value::Integer(ci_id)));

        self.conn
            .query_row(&sql, params_from_iter(values), row_to_ci)
            .optional()
            .map_err(Into::into)
    }

    /// Delete a CI. Returns whether a row was removed.
    pub fn delete_ci(&self, ci_id: i64) -> Result<bool> {
        let removed = self.conn.execute("DELETE FROM cis WHERE ci_id = ?1", [ci_id])?;
        Ok(removed > 0)
    }

    /// Count all CIs
    pub fn count_cis(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM cis", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ========== Hierarchy Operations ==========

    /// Insert an edge after applying `policy`.
    /// Checks that need the store run in the same transaction as the insert.
    pub fn insert_hierarchy(
        &self,
        edge: &NewHierarchy,
        policy: &HierarchyPolicy,
    ) -> Result<Hierarchy> {
        let tx = self.conn.unchecked_transaction()?;

        if !policy.allow_self_loops && edge.is_self_loop() {
            return Err(Error::HierarchyRejected(format!(
                "self-loop on CI {}",
                edge.parent_id
            )));
        }

        if policy.require_existing_cis {
            for ci_id in [edge.parent_id, edge.child_id] {
                if !ci_exists(&tx, ci_id)? {
                    return Err(Error::DanglingReference { ci_id });
                }
            }
        }

        // A self-loop is the shortest cycle; allow_self_loops decides it alone.
        let cycle_checked = !(edge.is_self_loop() && policy.allow_self_loops);
        if !policy.allow_cycles && cycle_checked && reaches(&tx, edge.child_id, edge.parent_id)? {
            return Err(Error::HierarchyRejected(format!(
                "edge {} -> {} would create a cycle",
                edge.parent_id, edge.child_id
            )));
        }

        let sql = format!(
            "INSERT INTO hierarchies (parent_id, child_id, hierarchy_type) VALUES (?1, ?2, ?3) \
             RETURNING {}",
            HIERARCHY_COLUMNS
        );
        let hierarchy = tx.query_row(
            &sql,
            params![edge.parent_id, edge.child_id, edge.hierarchy_type],
            row_to_hierarchy,
        )?;
        tx.commit()?;
        Ok(hierarchy)
    }

    /// Edges where `ci_id` is parent or child, or every edge when `None`
    pub fn list_hierarchies(&self, ci_id: Option<i64>) -> Result<Vec<Hierarchy>> {
        let hierarchies = match ci_id {
            Some(id) => {
                let sql = format!(
                    "SELECT {} FROM hierarchies WHERE parent_id = ?1 OR child_id = ?1 \
                     ORDER BY hierarchy_id",
                    HIERARCHY_COLUMNS
                );
                let mut stmt = self.conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([id], row_to_hierarchy)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM hierarchies ORDER BY hierarchy_id",
                    HIERARCHY_COLUMNS
                );
                let mut stmt = self.conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], row_to_hierarchy)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
        };

        Ok(hierarchies)
    }

    /// Count all hierarchy edges
    pub fn count_hierarchies(&self) -> Result<usize> {
        let count: i64 =
            self.conn.query_row("SELECT COUNT(*) FROM hierarchies", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        let types: i64 = self.conn.query_row("SELECT COUNT(*) FROM types", [], |row| row.get(0))?;
        Ok(DbStats {
            types: types as usize,
            cis: self.count_cis()?,
            hierarchies: self.count_hierarchies()?,
        })
    }
}

fn query_type(conn: &Connection, type_id: i64) -> Result<Option<CiType>> {
    conn.query_row(
        "SELECT type_id, name, mandatory_fields FROM types WHERE type_id = ?1",
        [type_id],
        row_to_type,
    )
    .optional()
    .map_err(Into::into)
}

fn ci_exists(conn: &Connection, ci_id: i64) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM cis WHERE ci_id = ?1", [ci_id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

/// Breadth-first walk along parent → child edges from `from`.
/// True when `to` is reachable (including `from == to`).
fn reaches(conn: &Connection, from: i64, to: i64) -> Result<bool> {
    let mut stmt = conn.prepare("SELECT child_id FROM hierarchies WHERE parent_id = ?1")?;
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from([from]);

    while let Some(current) = queue.pop_front() {
        if current == to {
            return Ok(true);
        }
        if !visited.insert(current) {
            continue;
        }
        let children = stmt
            .query_map([current], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        queue.extend(children.into_iter().filter(|c| !visited.contains(c)));
    }

    Ok(false)
}

/// Helper to convert a row to a CiType
fn row_to_type(row: &rusqlite::Row) -> rusqlite::Result<CiType> {
    let fields_json: String = row.get(2)?;
    let mandatory_fields: Vec<String> = serde_json::from_str(&fields_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(CiType {
        type_id: row.get(0)?,
        name: row.get(1)?,
        mandatory_fields,
    })
}

/// Helper to convert a row (selected with `CI_COLUMNS`) to a ConfigItem
fn row_to_ci(row: &rusqlite::Row) -> rusqlite::Result<ConfigItem> {
    Ok(ConfigItem {
        ci_id: row.get(0)?,
        type_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        serial_number: row.get(4)?,
        version: row.get(5)?,
        acquisition_date: row.get(6)?,
        status: row.get(7)?,
        physical_location: row.get(8)?,
        owner: row.get(9)?,
        environment: row.get(10)?,
        security_level: row.get(11)?,
        license_number: row.get(12)?,
        license_expiration: row.get(13)?,
    })
}

/// Helper to convert a row to a Hierarchy
fn row_to_hierarchy(row: &rusqlite::Row) -> rusqlite::Result<Hierarchy> {
    Ok(Hierarchy {
        hierarchy_id: row.get(0)?,
        parent_id: row.get(1)?,
        child_id: row.get(2)?,
        hierarchy_type: row.get(3)?,
    })
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct DbStats {
    pub types: usize,
    pub cis: usize,
    pub hierarchies: usize,
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Types: {}", self.types)?;
        writeln!(f, "  CIs: {}", self.cis)?;
        writeln!(f, "  Hierarchies: {}", self.hierarchies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Environment;
    use chrono::NaiveDate;

    fn store_with_type(mandatory: &[&str]) -> (SqliteStore, i64) {
        let store = SqliteStore::open_in_memory().unwrap();
        let ci_type = store.insert_type(&NewCiType::new(Some("server"), mandatory)).unwrap();
        (store, ci_type.type_id)
    }

    fn attrs(type_id: i64, name: &str, env: Environment) -> CiAttributes {
        CiAttributes {
            type_id: Some(type_id),
            name: Some(name.to_string()),
            environment: Some(env),
            ..Default::default()
        }
    }

    #[test]
    fn test_type_crud() {
        let (store, type_id) = store_with_type(&["name", "owner"]);

        let ci_type = store.get_type(type_id).unwrap().unwrap();
        assert_eq!(ci_type.name.as_deref(), Some("server"));
        assert_eq!(ci_type.mandatory_fields, vec!["name", "owner"]);

        assert!(store.get_type(999).unwrap().is_none());
        assert_eq!(store.list_types().unwrap().len(), 1);
    }

    #[test]
    fn test_create_echoes_supplied_fields() {
        let (store, type_id) = store_with_type(&["name"]);
        let mut input = attrs(type_id, "web-01", Environment::Prod);
        input.acquisition_date = NaiveDate::from_ymd_opt(2023, 6, 1);
        input.license_number = Some("LIC-42".to_string());

        let item = store.create_ci(&input).unwrap();
        assert!(item.ci_id > 0);
        assert_eq!(item.type_id, type_id);
        assert_eq!(item.name.as_deref(), Some("web-01"));
        assert_eq!(item.environment, Some(Environment::Prod));
        assert_eq!(item.acquisition_date, NaiveDate::from_ymd_opt(2023, 6, 1));
        assert_eq!(item.license_number.as_deref(), Some("LIC-42"));
        assert_eq!(item.owner, None);

        let fetched = store.get_ci(item.ci_id).unwrap().unwrap();
        assert_eq!(fetched, item);
    }

    #[test]
    fn test_create_unknown_type_fails() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store.create_ci(&attrs(42, "x", Environment::Dev)).unwrap_err();
        assert!(matches!(err, Error::ReferenceNotFound { type_id: 42 }));
        assert_eq!(store.count_cis().unwrap(), 0);
    }

    #[test]
    fn test_create_missing_mandatory_fields_fails() {
        let (store, type_id) = store_with_type(&["name", "serial_number", "owner"]);
        let mut input = attrs(type_id, "web-01", Environment::Qa);
        input.owner = Some("".to_string());

        match store.create_ci(&input).unwrap_err() {
            Error::ValidationFailed { missing, .. } => {
                assert_eq!(missing, vec!["serial_number", "owner"]);
            }
            other => panic!("expected ValidationFailed, got {:?}", other),
        }
        assert_eq!(store.count_cis().unwrap(), 0);
    }

    #[test]
    fn test_find_cis_filters_and_orders() {
        let (store, type_id) = store_with_type(&[]);
        let a = store.create_ci(&attrs(type_id, "a", Environment::Prod)).unwrap();
        store.create_ci(&attrs(type_id, "b", Environment::Dev)).unwrap();
        let c = store.create_ci(&attrs(type_id, "c", Environment::Prod)).unwrap();

        let filter = CiAttributes {
            environment: Some(Environment::Prod),
            ..Default::default()
        };
        let prod: Vec<i64> = store.find_cis(&filter).unwrap().iter().map(|i| i.ci_id).collect();
        assert_eq!(prod, vec![a.ci_id, c.ci_id]);

        let all = store.find_cis(&CiAttributes::default()).unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].ci_id < w[1].ci_id));

        let none = CiAttributes {
            environment: Some(Environment::Prod),
            name: Some("b".to_string()),
            ..Default::default()
        };
        assert!(store.find_cis(&none).unwrap().is_empty());
    }

    #[test]
    fn test_find_cis_by_ci_id() {
        let (store, type_id) = store_with_type(&[]);
        store.create_ci(&attrs(type_id, "a", Environment::Prod)).unwrap();
        let b = store.create_ci(&attrs(type_id, "b", Environment::Dev)).unwrap();

        let by_id = CiAttributes {
            ci_id: Some(b.ci_id),
            ..Default::default()
        };
        assert_eq!(store.find_cis(&by_id).unwrap(), vec![b.clone()]);

        let mismatch = CiAttributes {
            ci_id: Some(b.ci_id),
            environment: Some(Environment::Prod),
            ..Default::default()
        };
        assert!(store.find_cis(&mismatch).unwrap().is_empty());
    }

    #[test]
    fn test_create_rejects_supplied_ci_id() {
        let (store, type_id) = store_with_type(&[]);
        let mut input = attrs(type_id, "a", Environment::Dev);
        input.ci_id = Some(99);

        assert!(matches!(store.create_ci(&input), Err(Error::InvalidInput(_))));
        assert_eq!(store.count_cis().unwrap(), 0);
    }

    #[test]
    fn test_update_is_partial() {
        let (store, type_id) = store_with_type(&[]);
        let mut input = attrs(type_id, "A", Environment::Dev);
        input.status = Some("up".to_string());
        let item = store.create_ci(&input).unwrap();

        let patch = CiPatch {
            status: Some(Some("down".to_string())),
            ..Default::default()
        };
        let updated = store.update_ci(item.ci_id, &patch).unwrap().unwrap();
        assert_eq!(updated.name.as_deref(), Some("A"));
        assert_eq!(updated.status.as_deref(), Some("down"));
        assert_eq!(updated.environment, Some(Environment::Dev));
    }

    #[test]
    fn test_update_can_clear_nullable_column() {
        let (store, type_id) = store_with_type(&[]);
        let mut input = attrs(type_id, "A", Environment::Dev);
        input.owner = Some("ops".to_string());
        let item = store.create_ci(&input).unwrap();

        let patch = CiPatch {
            owner: Some(None),
            ..Default::default()
        };
        let updated = store.update_ci(item.ci_id, &patch).unwrap().unwrap();
        assert_eq!(updated.owner, None);
        assert_eq!(updated.name.as_deref(), Some("A"));
    }

    #[test]
    fn test_update_missing_row_is_none() {
        let store = SqliteStore::open_in_memory().unwrap();
        let patch = CiPatch {
            name: Some("ghost".to_string()),
            ..Default::default()
        };
        assert!(store.update_ci(404, &patch).unwrap().is_none());
        assert!(matches!(
            store.update_ci(404, &CiPatch::default()),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (store, type_id) = store_with_type(&[]);
        let item = store.create_ci(&attrs(type_id, "tmp", Environment::Qa)).unwrap();

        assert!(store.delete_ci(item.ci_id).unwrap());
        assert!(!store.delete_ci(item.ci_id).unwrap());
        assert!(store.get_ci(item.ci_id).unwrap().is_none());
    }

    #[test]
    fn test_permissive_hierarchy_allows_dangling_and_loops() {
        let store = SqliteStore::open_in_memory().unwrap();
        let policy = HierarchyPolicy::permissive();

        let edge = store.insert_hierarchy(&NewHierarchy::new(1, 2, "hosts"), &policy).unwrap();
        assert!(edge.hierarchy_id > 0);
        assert_eq!((edge.parent_id, edge.child_id), (1, 2));
        assert_eq!(edge.hierarchy_type, "hosts");

        store.insert_hierarchy(&NewHierarchy::new(1, 2, "hosts"), &policy).unwrap();
        store.insert_hierarchy(&NewHierarchy::new(2, 1, "hosts"), &policy).unwrap();
        store.insert_hierarchy(&NewHierarchy::new(3, 3, "hosts"), &policy).unwrap();
        assert_eq!(store.count_hierarchies().unwrap(), 4);
    }

    #[test]
    fn test_strict_hierarchy_rules() {
        let (store, type_id) = store_with_type(&[]);
        let a = store.create_ci(&attrs(type_id, "a", Environment::Prod)).unwrap().ci_id;
        let b = store.create_ci(&attrs(type_id, "b", Environment::Prod)).unwrap().ci_id;
        let c = store.create_ci(&attrs(type_id, "c", Environment::Prod)).unwrap().ci_id;
        let policy = HierarchyPolicy::strict();

        store.insert_hierarchy(&NewHierarchy::new(a, b, "hosts"), &policy).unwrap();
        store.insert_hierarchy(&NewHierarchy::new(b, c, "hosts"), &policy).unwrap();

        let cycle = store.insert_hierarchy(&NewHierarchy::new(c, a, "depends-on"), &policy);
        assert!(matches!(cycle, Err(Error::HierarchyRejected(_))));

        let self_loop = store.insert_hierarchy(&NewHierarchy::new(a, a, "hosts"), &policy);
        assert!(matches!(self_loop, Err(Error::HierarchyRejected(_))));

        let dangling = store.insert_hierarchy(&NewHierarchy::new(a, 999, "hosts"), &policy);
        assert!(matches!(dangling, Err(Error::DanglingReference { ci_id: 999 })));

        assert_eq!(store.count_hierarchies().unwrap(), 2);
    }

    #[test]
    fn test_self_loops_allowed_without_cycles() {
        let store = SqliteStore::open_in_memory().unwrap();
        let policy = HierarchyPolicy {
            allow_self_loops: true,
            allow_cycles: false,
            ..HierarchyPolicy::permissive()
        };

        store.insert_hierarchy(&NewHierarchy::new(1, 1, "monitors"), &policy).unwrap();
        store.insert_hierarchy(&NewHierarchy::new(1, 2, "hosts"), &policy).unwrap();

        let cycle = store.insert_hierarchy(&NewHierarchy::new(2, 1, "hosts"), &policy);
        assert!(matches!(cycle, Err(Error::HierarchyRejected(_))));
        assert_eq!(store.count_hierarchies().unwrap(), 2);
    }

    #[test]
    fn test_list_hierarchies() {
        let store = SqliteStore::open_in_memory().unwrap();
        let policy = HierarchyPolicy::default();
        store.insert_hierarchy(&NewHierarchy::new(1, 2, "hosts"), &policy).unwrap();
        store.insert_hierarchy(&NewHierarchy::new(2, 3, "hosts"), &policy).unwrap();
        store.insert_hierarchy(&NewHierarchy::new(4, 5, "hosts"), &policy).unwrap();

        assert_eq!(store.list_hierarchies(Some(2)).unwrap().len(), 2);
        assert_eq!(store.list_hierarchies(None).unwrap().len(), 3);
    }

    #[test]
    fn test_stats() {
        let (store, type_id) = store_with_type(&[]);
        store.create_ci(&attrs(type_id, "a", Environment::Dev)).unwrap();
        let stats = store.stats().unwrap();
        assert_eq!((stats.types, stats.cis, stats.hierarchies), (1, 1, 0));
    }
}
