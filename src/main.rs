//! CMDB CLI - Command-line interface for the configuration management database

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use cmdb::config;
use cmdb::hierarchy::NewHierarchy;
use commands::{Context, OutputMode};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "cmdb")]
#[command(version)]
#[command(about = "Configuration management database - typed CIs and their relationships")]
#[command(long_about = r#"
CMDB tracks configuration items (servers, licenses, services, ...) and the
directed relationships between them.

Example usage:
  cmdb init
  cmdb type add --name server --mandatory name,serial_number
  cmdb ci create '{"type_id": 1, "name": "web-01", "serial_number": "SN1", "environment": "PROD"}'
  cmdb ci list --filter environment=PROD
  cmdb hierarchy create --parent 1 --child 2 --kind hosts
  cmdb serve --port 3000
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file (overrides the config file)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file and create the database
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Run the HTTP API
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage CI types
    #[command(subcommand)]
    Type(TypeCommands),

    /// Manage configuration items
    #[command(subcommand)]
    Ci(CiCommands),

    /// Manage relationships between configuration items
    #[command(subcommand)]
    Hierarchy(HierarchyCommands),

    /// Show statistics about the database
    Stats,
}

#[derive(Subcommand)]
enum TypeCommands {
    /// Register a new type
    Add {
        /// Human-readable type name
        #[arg(short, long)]
        name: Option<String>,

        /// Comma-separated mandatory attribute names
        #[arg(short, long, value_delimiter = ',')]
        mandatory: Vec<String>,
    },

    /// List registered types
    List,
}

#[derive(Subcommand)]
enum CiCommands {
    /// Create a CI from a JSON attribute object
    Create {
        /// JSON object, e.g. '{"type_id": 1, "environment": "DEV"}'
        data: String,
    },

    /// List CIs, optionally filtered by exact field values
    List {
        /// Filter as field=value (repeatable)
        #[arg(short, long = "filter")]
        filters: Vec<String>,
    },

    /// Show a single CI
    Get { id: i64 },

    /// Update only the fields present in a JSON object
    Update {
        id: i64,
        /// JSON object; null clears a nullable field
        data: String,
    },

    /// Delete a CI (succeeds when it does not exist)
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum HierarchyCommands {
    /// Create a parent → child relationship
    Create {
        #[arg(long)]
        parent: i64,

        #[arg(long)]
        child: i64,

        /// Relationship kind, e.g. hosts, depends-on
        #[arg(long)]
        kind: String,
    },

    /// List relationships
    List {
        /// Only relationships touching this CI
        #[arg(long)]
        ci: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let file_config = config::load_config(Some(&config_path))?.unwrap_or_default();
    let database = file_config.database_path(cli.database.as_deref(), &std::env::current_dir()?);
    let ctx = Context {
        config: file_config,
        database,
        output_mode: if cli.json { OutputMode::Json } else { OutputMode::Human },
    };

    let result = match cli.command {
        Commands::Init { force } => commands::run_init(&ctx, &config_path, force),

        Commands::Serve { port } => {
            let store = ctx.open_store()?;
            let port = ctx.config.port(port);
            if ctx.output_mode.is_human() {
                println!("{} Server running at http://0.0.0.0:{}", cmdb::ui::Icons::ROCKET, port);
            }
            cmdb::server::start_server(port, store, ctx.policy()).await
        }

        Commands::Type(TypeCommands::Add { name, mandatory }) => {
            commands::run_type_add(&ctx, name, mandatory)
        }
        Commands::Type(TypeCommands::List) => commands::run_type_list(&ctx),

        Commands::Ci(CiCommands::Create { data }) => commands::run_ci_create(&ctx, &data),
        Commands::Ci(CiCommands::List { filters }) => commands::run_ci_list(&ctx, &filters),
        Commands::Ci(CiCommands::Get { id }) => commands::run_ci_get(&ctx, id),
        Commands::Ci(CiCommands::Update { id, data }) => commands::run_ci_update(&ctx, id, &data),
        Commands::Ci(CiCommands::Delete { id }) => commands::run_ci_delete(&ctx, id),

        Commands::Hierarchy(HierarchyCommands::Create { parent, child, kind }) => {
            commands::run_hierarchy_create(&ctx, NewHierarchy::new(parent, child, kind))
        }
        Commands::Hierarchy(HierarchyCommands::List { ci }) => {
            commands::run_hierarchy_list(&ctx, ci)
        }

        Commands::Stats => commands::run_stats(&ctx),
    };

    if let Err(e) = result {
        if ctx.output_mode.is_human() {
            cmdb::ui::error(&format!("{:#}", e));
        } else {
            let envelope = serde_json::json!({ "success": false, "message": format!("{:#}", e) });
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
        std::process::exit(1);
    }
    Ok(())
}
