//! Database schema definitions

/// SQL to create the types table.
/// `mandatory_fields` holds a JSON array of attribute names.
pub const CREATE_TYPES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS types (
    type_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT,
    mandatory_fields TEXT NOT NULL DEFAULT '[]'
)
"#;

/// SQL to create the configuration items table
pub const CREATE_CIS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS cis (
    ci_id INTEGER PRIMARY KEY AUTOINCREMENT,
    type_id INTEGER NOT NULL,
    name TEXT,
    description TEXT,
    serial_number TEXT,
    version TEXT,
    acquisition_date TEXT,
    status TEXT,
    physical_location TEXT,
    owner TEXT,
    environment TEXT CHECK (environment IN ('DEV', 'QA', 'PROD')),
    security_level TEXT,
    license_number TEXT,
    license_expiration TEXT
)
"#;

/// SQL to create the hierarchies table.
/// No foreign keys: endpoint existence is a policy decision of the service.
pub const CREATE_HIERARCHIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS hierarchies (
    hierarchy_id INTEGER PRIMARY KEY AUTOINCREMENT,
    parent_id INTEGER NOT NULL,
    child_id INTEGER NOT NULL,
    hierarchy_type TEXT NOT NULL
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_cis_type ON cis(type_id)",
    "CREATE INDEX IF NOT EXISTS idx_cis_environment ON cis(environment)",
    "CREATE INDEX IF NOT EXISTS idx_hierarchies_parent ON hierarchies(parent_id)",
    "CREATE INDEX IF NOT EXISTS idx_hierarchies_child ON hierarchies(child_id)",
];

/// Column list returned for every CI query
pub const CI_COLUMNS: &str = "ci_id, type_id, name, description, serial_number, version, \
    acquisition_date, status, physical_location, owner, environment, security_level, \
    license_number, license_expiration";

/// Column list returned for every hierarchy query
pub const HIERARCHY_COLUMNS: &str = "hierarchy_id, parent_id, child_id, hierarchy_type";

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![CREATE_TYPES_TABLE, CREATE_CIS_TABLE, CREATE_HIERARCHIES_TABLE];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
