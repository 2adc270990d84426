//! # permguard-cli
//!
//! Command-line tool for service permission catalogs:
//! - `permguard permissions` - list every permission tag a catalog declares
//! - `permguard check` - dry-run one action against a request context

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use permguard::GuardConfig;
use tracing_subscriber::EnvFilter;

/// Inspect and dry-run action permission catalogs.
#[derive(Parser)]
#[command(name = "permguard", version, about)]
struct Cli {
    /// Guard config file (YAML or JSON). Defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log guard decisions to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every permission declared by the catalog's actions.
    Permissions {
        /// Service catalog file (YAML or JSON).
        #[arg(long)]
        catalog: PathBuf,
    },
    /// Run one action's permission check against a request context.
    Check {
        /// Service catalog file (YAML or JSON).
        #[arg(long)]
        catalog: PathBuf,
        /// Qualified action name (e.g. "users.create").
        #[arg(long)]
        action: String,
        /// JSON file holding the request context.
        #[arg(long)]
        context: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so command output stays clean on stdout.
    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(format!("permguard={}", level).parse()?),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let config = match &cli.config {
        Some(path) => GuardConfig::load(path)?,
        None => GuardConfig::default(),
    };

    match &cli.command {
        Commands::Permissions { catalog } => commands::permissions::execute(catalog, config),
        Commands::Check {
            catalog,
            action,
            context,
        } => commands::check::execute(catalog, action, context, config),
    }
}
