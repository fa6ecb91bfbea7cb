use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::hierarchy::HierarchyPolicy;

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CmdbConfig {
    pub database: Option<String>,
    pub port: Option<u16>,
    #[serde(default)]
    pub hierarchy: HierarchyPolicy,
}

impl CmdbConfig {
    /// Database path: explicit override, then config file, then the default
    pub fn database_path(&self, override_path: Option<&Path>, base: &Path) -> PathBuf {
        override_path
            .map(Path::to_path_buf)
            .or_else(|| self.database.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| default_database_path_in(base))
    }

    pub fn port(&self, override_port: Option<u16>) -> u16 {
        override_port.or(self.port).unwrap_or(DEFAULT_PORT)
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("cmdb.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".cmdb").join("cmdb.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<CmdbConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: CmdbConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &CmdbConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

pub fn ensure_gitignore(project_root: &Path) -> anyhow::Result<()> {
    let gitignore_path = project_root.join(".gitignore");
    let entry = ".cmdb/";

    let mut content = String::new();
    if gitignore_path.exists() {
        content = std::fs::read_to_string(&gitignore_path)?;
        if content.lines().any(|line| line.trim() == entry) {
            return Ok(());
        }
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
    }
    content.push_str(entry);
    content.push('\n');
    std::fs::write(&gitignore_path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_config(Some(&dir.path().join("cmdb.toml"))).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cmdb.toml");
        let config = CmdbConfig {
            database: Some("data/cmdb.db".to_string()),
            port: Some(8080),
            hierarchy: HierarchyPolicy::strict(),
        };

        write_config(&path, &config, false).unwrap();
        assert!(write_config(&path, &config, false).is_err());
        write_config(&path, &config, true).unwrap();

        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded.database.as_deref(), Some("data/cmdb.db"));
        assert_eq!(loaded.port(None), 8080);
        assert_eq!(loaded.port(Some(9000)), 9000);
        assert_eq!(loaded.hierarchy, HierarchyPolicy::strict());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: CmdbConfig = toml::from_str("port = 4000\n").unwrap();
        assert!(config.hierarchy.is_permissive());

        let base = Path::new("/srv");
        assert_eq!(config.database_path(None, base), PathBuf::from("/srv/.cmdb/cmdb.db"));
        assert_eq!(
            config.database_path(Some(Path::new("x.db")), base),
            PathBuf::from("x.db")
        );
    }

    #[test]
    fn test_gitignore_entry_added_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "target").unwrap();

        ensure_gitignore(dir.path()).unwrap();
        ensure_gitignore(dir.path()).unwrap();

        let contents = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(contents, "target\n.cmdb/\n");
    }

    #[test]
    fn test_ensure_db_dir_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("nested").join("cmdb.db");
        ensure_db_dir(&db).unwrap();
        assert!(db.parent().unwrap().is_dir());
    }
}
