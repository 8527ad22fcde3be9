//! Replica CLI - replica command

use anyhow::Result;
use clap::{Parser, Subcommand};
use replica_core::Checksum;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;
mod config;
mod manifest;
mod util;

/// Replica - content-addressed solution snapshots with incremental sync
#[derive(Parser)]
#[command(name = "replica")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: ./replica.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a solution from a manifest and publish it to a store
    Snapshot {
        /// Manifest describing the solution
        manifest: PathBuf,
        /// Asset store directory
        #[arg(long)]
        store: PathBuf,
    },
    /// Synchronize a baseline snapshot to a target snapshot
    Sync {
        /// Asset store directory
        #[arg(long)]
        store: PathBuf,
        /// Target solution checksum
        #[arg(long)]
        target: Checksum,
        /// Baseline solution checksum (default: build the target from scratch)
        #[arg(long)]
        baseline: Option<Checksum>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show project and document differences between two snapshots
    Diff {
        /// Asset store directory
        #[arg(long)]
        store: PathBuf,
        /// Older solution checksum
        old: Checksum,
        /// Newer solution checksum
        new: Checksum,
        /// Print the differences as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check whether a target can be reached incrementally from a baseline
    Check {
        /// Asset store directory
        #[arg(long)]
        store: PathBuf,
        baseline: Checksum,
        target: Checksum,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref())?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Snapshot { manifest, store } => cmd::snapshot::run(&manifest, &store).await,
        Commands::Sync { store, target, baseline, json } => {
            cmd::sync::run(&config, &store, target, baseline, json).await
        }
        Commands::Diff { store, old, new, json } => {
            cmd::diff::run(&config, &store, old, new, json).await
        }
        Commands::Check { store, baseline, target } => {
            cmd::check::run(&config, &store, baseline, target).await
        }
    }
}
