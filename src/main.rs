use anyhow::Context;
use clap::{Parser, Subcommand};
use schematree::config::{self, EngineConfig};
use schematree::{tree::preview, CatalogConfig, TreeRegistry};

/// Schematree - spanning trees over an entity schema
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the tree for a configured alias or an entity name
    Preview {
        /// Tree alias or entity name (defaults to the configured default tree)
        alias: Option<String>,

        /// Catalog YAML file
        #[arg(long)]
        schema: Option<String>,

        /// Engine configuration YAML file (environment is used otherwise)
        #[arg(long)]
        config: Option<String>,

        /// Maximum tree depth
        #[arg(long)]
        max_depth: Option<usize>,

        /// Do not add self-join leaves for self-referential relationships
        #[arg(long)]
        no_self_joins: bool,
    },
}

fn engine_config(
    config_file: Option<String>,
    schema: Option<String>,
    max_depth: Option<usize>,
    no_self_joins: bool,
) -> anyhow::Result<EngineConfig> {
    let base = match config_file {
        Some(path) => EngineConfig::from_yaml_file(&path)
            .with_context(|| format!("Failed to load engine configuration from {}", path))?,
        None => EngineConfig::from_env().context("Invalid engine configuration in environment")?,
    };

    let cli_config = config::CliConfig {
        schema_path: schema.unwrap_or(base.schema_path),
        default_tree: base.default_tree,
        max_depth: max_depth.unwrap_or(base.max_depth),
        self_joins: base.self_joins && !no_self_joins,
    };
    Ok(EngineConfig::from_cli(cli_config)?)
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Preview {
            alias,
            schema,
            config,
            max_depth,
            no_self_joins,
        } => {
            let engine = engine_config(config, schema, max_depth, no_self_joins)?;
            let catalog = CatalogConfig::from_yaml_file(&engine.schema_path)
                .with_context(|| format!("Failed to load catalog from {}", engine.schema_path))?;
            let registry = TreeRegistry::from_config(&catalog, &engine)?;

            let alias = alias.unwrap_or_else(|| registry.default_alias().to_string());
            let tree = registry.get_or_build(&alias)?;
            preview::write_to(&tree, &mut std::io::stdout().lock())?;
        }
    }
    Ok(())
}

fn main() {
    // Initialize logger - defaults to WARN level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // Pick up SCHEMATREE_* settings from a local .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
