//! Report whether a target is an incremental update of a baseline

use crate::config::CliConfig;
use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use replica_core::{CancellationToken, Checksum};
use std::path::Path;

pub async fn run(
    config: &CliConfig,
    store: &Path,
    baseline: Checksum,
    target: Checksum,
) -> Result<()> {
    let sync = util::synchronizer(config, store)?;
    let cancel = CancellationToken::new();

    let baseline_solution = sync
        .create_solution(baseline, &cancel)
        .await
        .with_context(|| format!("Failed to load baseline {}", baseline.short()))?;
    let incremental = sync
        .is_incremental_update(&baseline_solution, target, &cancel)
        .await
        .with_context(|| format!("Failed to load target {}", target.short()))?;

    if incremental {
        println!(
            "{} {} -> {}",
            "incremental".green().bold(),
            util::label(&baseline),
            util::label(&target)
        );
    } else {
        println!(
            "{} {} -> {}",
            "not incremental".red().bold(),
            util::label(&baseline),
            util::label(&target)
        );
        println!("  {}", "Solution identity or file path changed; rebuild from scratch".dimmed());
    }
    Ok(())
}
