use std::path::{Path, PathBuf};
use cmdb::config::{self, CmdbConfig};
use cmdb::hierarchy::{HierarchyPolicy, NewHierarchy};
use cmdb::item::{CiAttributes, CiField, CiPatch};
use cmdb::ui::{self, Icons};
use cmdb::{CiStore, HierarchyStore, NewCiType, SqliteStore, TypeRegistry};
use owo_colors::OwoColorize;
use serde::Serialize;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(&self) -> bool {
        matches!(self, OutputMode::Human)
    }
}

/// Print a machine-readable result
pub fn emit_success<T: Serialize>(output_mode: OutputMode, command: &str, data: T) -> anyhow::Result<()> {
    if output_mode == OutputMode::Json {
        let envelope = serde_json::json!({
            "success": true,
            "command": command,
            "data": data,
        });
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    }
    Ok(())
}

/// Resolved settings shared by every subcommand
pub struct Context {
    pub config: CmdbConfig,
    pub database: PathBuf,
    pub output_mode: OutputMode,
}

impl Context {
    pub fn open_store(&self) -> anyhow::Result<SqliteStore> {
        config::ensure_db_dir(&self.database)?;
        Ok(SqliteStore::open(&self.database)?)
    }

    pub fn policy(&self) -> HierarchyPolicy {
        self.config.hierarchy
    }
}

pub fn run_init(ctx: &Context, config_path: &Path, force: bool) -> anyhow::Result<()> {
    let project_root = std::env::current_dir()?;
    let config = CmdbConfig {
        database: Some(ctx.database.to_string_lossy().to_string()),
        port: Some(ctx.config.port(None)),
        hierarchy: ctx.config.hierarchy,
    };

    config::write_config(config_path, &config, force)?;
    let store = ctx.open_store()?;
    config::ensure_gitignore(&project_root)?;
    tracing::info!(database = %ctx.database.display(), "initialized CMDB");

    if ctx.output_mode.is_human() {
        ui::success(&format!("Wrote {}", config_path.display()));
        ui::info("Database", &ctx.database.display().to_string());
        ui::info("Hierarchy policy", if ctx.policy().is_permissive() { "permissive" } else { "checked" });
        println!("{}", store.stats()?);
    } else {
        emit_success(ctx.output_mode, "init", serde_json::json!({
            "config": config_path,
            "database": ctx.database,
        }))?;
    }
    Ok(())
}

pub fn run_stats(ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let stats = store.stats()?;

    if ctx.output_mode.is_human() {
        ui::header(Icons::STATS, &format!("CMDB Statistics ({})", ctx.database.display()));
        println!(
            "{}",
            ui::stats_table(&[
                ("Types", &stats.types.to_string()),
                ("CIs", &stats.cis.to_string()),
                ("Hierarchies", &stats.hierarchies.to_string()),
            ])
        );
    } else {
        emit_success(ctx.output_mode, "stats", &stats)?;
    }
    Ok(())
}

// ========== Types ==========

pub fn run_type_add(ctx: &Context, name: Option<String>, mandatory: Vec<String>) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let unknown: Vec<&str> = mandatory
        .iter()
        .map(String::as_str)
        .filter(|f| f.parse::<CiField>().map_or(true, |field| !field.is_settable()))
        .collect();
    if !unknown.is_empty() {
        ui::warn(&format!(
            "Unknown field names can never be satisfied: {}",
            unknown.join(", ")
        ));
    }

    let ci_type = TypeRegistry::new(&store).create_type(&NewCiType {
        name,
        mandatory_fields: mandatory,
    })?;

    if ctx.output_mode.is_human() {
        ui::success(&format!("Registered type {}", ci_type.type_id));
        println!("{}", ui::type_table(&[ci_type]));
    } else {
        emit_success(ctx.output_mode, "type.add", &ci_type)?;
    }
    Ok(())
}

pub fn run_type_list(ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let types = TypeRegistry::new(&store).list_types()?;

    if ctx.output_mode.is_human() {
        if types.is_empty() {
            ui::empty("No types registered.");
        } else {
            println!("{}", ui::type_table(&types));
        }
    } else {
        emit_success(ctx.output_mode, "type.list", &types)?;
    }
    Ok(())
}

// ========== Configuration items ==========

pub fn run_ci_create(ctx: &Context, data: &str) -> anyhow::Result<()> {
    let attrs: CiAttributes = serde_json::from_str(data)?;
    attrs.validate_for_create()?;

    let store = ctx.open_store()?;
    let item = CiStore::new(&store).create(&attrs)?;

    if ctx.output_mode.is_human() {
        ui::success(&format!("Created CI {}", item.ci_id));
        println!("{}", ui::ci_detail_table(&item));
    } else {
        emit_success(ctx.output_mode, "ci.create", &item)?;
    }
    Ok(())
}

pub fn run_ci_list(ctx: &Context, filters: &[String]) -> anyhow::Result<()> {
    let filter = parse_filters(filters)?;
    let store = ctx.open_store()?;
    let items = CiStore::new(&store).get_all(&filter)?;

    if ctx.output_mode.is_human() {
        if items.is_empty() {
            ui::empty("No configuration items found.");
        } else {
            println!("{}", ui::ci_table(&items));
        }
    } else {
        emit_success(ctx.output_mode, "ci.list", &items)?;
    }
    Ok(())
}

pub fn run_ci_get(ctx: &Context, id: i64) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let Some(item) = CiStore::new(&store).get_by_id(id)? else {
        anyhow::bail!("CI {} not found", id);
    };

    if ctx.output_mode.is_human() {
        let env = item
            .environment
            .map(|e| e.as_str().style(ui::theme().environment(e)).to_string())
            .unwrap_or_default();
        ui::header(Icons::SERVER, &format!("CI {} {}", item.ci_id, env));
        println!("{}", ui::ci_detail_table(&item));

        let edges = HierarchyStore::with_policy(&store, ctx.policy()).list(Some(item.ci_id))?;
        ui::section("Relationships");
        if edges.is_empty() {
            ui::empty("No relationships.");
        } else {
            println!("{}", ui::hierarchy_table(&edges));
        }
    } else {
        emit_success(ctx.output_mode, "ci.get", &item)?;
    }
    Ok(())
}

pub fn run_ci_update(ctx: &Context, id: i64, data: &str) -> anyhow::Result<()> {
    let patch: CiPatch = serde_json::from_str(data)?;
    patch.validate_for_update()?;

    let store = ctx.open_store()?;
    let Some(item) = CiStore::new(&store).update(id, &patch)? else {
        anyhow::bail!("CI {} not found", id);
    };

    if ctx.output_mode.is_human() {
        ui::success(&format!("Updated CI {}", item.ci_id));
        println!("{}", ui::ci_detail_table(&item));
    } else {
        emit_success(ctx.output_mode, "ci.update", &item)?;
    }
    Ok(())
}

pub fn run_ci_delete(ctx: &Context, id: i64) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    CiStore::new(&store).delete(id)?;

    if ctx.output_mode.is_human() {
        println!("{} Deleted CI {}", Icons::DEL, id);
    } else {
        emit_success(ctx.output_mode, "ci.delete", serde_json::json!({ "ci_id": id }))?;
    }
    Ok(())
}

// ========== Hierarchies ==========

pub fn run_hierarchy_create(ctx: &Context, edge: NewHierarchy) -> anyhow::Result<()> {
    edge.validate()?;

    let store = ctx.open_store()?;
    let hierarchy = HierarchyStore::with_policy(&store, ctx.policy()).create_hierarchy(&edge)?;

    if ctx.output_mode.is_human() {
        println!(
            "{} {} {} {}",
            Icons::LINK,
            hierarchy.parent_id,
            hierarchy.hierarchy_type.bold(),
            hierarchy.child_id
        );
        ui::success(&format!("Created relationship {}", hierarchy.hierarchy_id));
    } else {
        emit_success(ctx.output_mode, "hierarchy.create", &hierarchy)?;
    }
    Ok(())
}

pub fn run_hierarchy_list(ctx: &Context, ci: Option<i64>) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let edges = HierarchyStore::with_policy(&store, ctx.policy()).list(ci)?;

    if ctx.output_mode.is_human() {
        if edges.is_empty() {
            ui::empty("No relationships found.");
        } else {
            println!("{}", ui::hierarchy_table(&edges));
        }
    } else {
        emit_success(ctx.output_mode, "hierarchy.list", &edges)?;
    }
    Ok(())
}

/// Turn `field=value` pairs into an equality filter.
/// `ci_id` and `type_id` values must be integers; everything else is taken as text.
pub fn parse_filters(pairs: &[String]) -> anyhow::Result<CiAttributes> {
    let mut map = serde_json::Map::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            anyhow::bail!("filter must look like field=value, got '{}'", pair);
        };
        let field: CiField = key.trim().parse()?;
        let value = match field {
            field if field.is_integer() => serde_json::Value::from(value.trim().parse::<i64>()?),
            _ => serde_json::Value::from(value),
        };
        map.insert(field.as_str().to_string(), value);
    }
    Ok(serde_json::from_value(serde_json::Value::Object(map))?)
}
