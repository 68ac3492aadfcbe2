//! natureid CLI - place classifier labels in the tree of life and rank predictions.
//!
//! A classifier's label file is reconciled against the iNaturalist reference
//! taxonomy once; the resulting taxonomy file turns score vectors into a path
//! from kingdom down to the most specific supported taxon.
//!
//! # Usage
//!
//! ```bash
//! # Build the taxonomy file for a label file
//! natureid build birds_labelmap.csv
//!
//! # Classify score vectors (JSON array or JSON lines)
//! natureid classify birds_taxonomy.csv scores.json
//!
//! # Resolve one name and show its lineage
//! natureid lookup "Parus major"
//!
//! # View configuration
//! natureid config show
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// natureid - hierarchical classification from flat classifier labels.
#[derive(Parser, Debug)]
#[command(name = "natureid")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the default location
    #[arg(short, long, global = true, env = "NATUREID_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the taxonomy file for a label file
    Build(cli::build::BuildArgs),

    /// Classify score vectors with a taxonomy or label file
    Classify(cli::classify::ClassifyArgs),

    /// Resolve a taxon name against the reference taxonomy
    Lookup(cli::lookup::LookupArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),

    /// Inspect the API response cache
    Cache(cli::cache::CacheArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let loaded = match &cli.config {
        Some(path) => natureid_core::Config::load_from(path),
        None => natureid_core::Config::load(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `natureid config path`."
            );
            natureid_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("natureid v{}", natureid_core::VERSION);

    match cli.command {
        Commands::Build(args) => cli::build::execute(args, config).await,
        Commands::Classify(args) => cli::classify::execute(args, config).await,
        Commands::Lookup(args) => cli::lookup::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args, cli.config).await,
        Commands::Cache(args) => cli::cache::execute(args, config).await,
    }
}
