//! Lattice CLI entry point

use clap::{Parser, Subcommand};
use lattice_core::EntityType;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "lattice")]
#[command(about = "Local code intelligence: semantic index, dependency graph, change impact", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Workspace root path (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Index the workspace and print the report
    Index,
    /// Show the dependencies and dependents of one file
    Deps {
        file: PathBuf,
    },
    /// Estimate the impact of changing one or more files
    Impact {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Previous version of the file, for a symbol diff (single file only)
        #[arg(long, requires = "new")]
        old: Option<PathBuf>,

        /// New version of the file, for a symbol diff (single file only)
        #[arg(long, requires = "old")]
        new: Option<PathBuf>,
    },
    /// Summarize the dependency graph
    Summary,
    /// List indexed entities
    Entities {
        /// Only entities of this type (model, dto, route, service, ...)
        #[arg(short = 't', long = "type", value_parser = parse_entity_type)]
        entity_type: Option<EntityType>,
    },
}

fn parse_entity_type(tag: &str) -> Result<EntityType, String> {
    EntityType::from_tag(tag).ok_or_else(|| format!("unknown entity type '{tag}'"))
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lattice={log_level}")));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Lattice v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Workspace root: {}", cli.root.display());

    match cli.command {
        Commands::Index => commands::index(&cli.root, cli.json),
        Commands::Deps { file } => commands::deps(&cli.root, &file, cli.json),
        Commands::Impact { files, old, new } => {
            commands::impact(&cli.root, &files, old.zip(new), cli.json)
        }
        Commands::Summary => commands::summary(&cli.root, cli.json),
        Commands::Entities { entity_type } => commands::entities(&cli.root, entity_type, cli.json),
    }
}
