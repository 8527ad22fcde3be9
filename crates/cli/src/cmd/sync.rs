//! Synchronize a baseline snapshot to a target snapshot

use crate::config::CliConfig;
use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use replica_core::{CancellationToken, Checksum, FetchStats};
use replica_sync::SyncReport;
use std::path::Path;

pub async fn run(
    config: &CliConfig,
    store: &Path,
    target: Checksum,
    baseline: Option<Checksum>,
    json: bool,
) -> Result<()> {
    let sync = util::synchronizer(config, store)?;
    let cancel = CancellationToken::new();

    let Some(baseline) = baseline else {
        // No baseline: the target is built from scratch
        let solution = sync
            .create_solution(target, &cancel)
            .await
            .with_context(|| format!("Failed to build {}", target.short()))?;
        let documents: usize = solution.projects().map(|p| p.document_count()).sum();
        let fetch = sync.provider().stats();

        if json {
            let value = serde_json::json!({
                "target": target,
                "projects": solution.project_count(),
                "documents": documents,
                "fetch": fetch,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        } else {
            util::header("Built From Scratch");
            println!("Target:     {}", util::label(&target));
            println!("Projects:   {}", solution.project_count());
            println!("Documents:  {documents}");
            print_fetch(&fetch);
        }
        return Ok(());
    };

    // 1. Reconstruct the baseline
    let baseline_solution = sync
        .create_solution(baseline, &cancel)
        .await
        .with_context(|| format!("Failed to build baseline {}", baseline.short()))?;

    // 2. Move it to the target
    let outcome = sync
        .synchronize_with_report(&baseline_solution, target, &cancel)
        .await
        .with_context(|| {
            format!("Failed to synchronize {} -> {}", baseline.short(), target.short())
        })?;

    // 3. Report
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.report)?);
    } else {
        print_report(&outcome.report);
    }
    Ok(())
}

fn print_report(report: &SyncReport) {
    util::header("Synchronized");
    println!("From:       {}", util::label(&report.baseline));
    println!("To:         {}", util::label(&report.target));
    println!();

    if report.up_to_date {
        println!("{}", "Already up to date".green());
        return;
    }

    println!(
        "Projects:   {} {} {}",
        format!("+{}", report.projects_added.len()).green(),
        format!("-{}", report.projects_removed.len()).red(),
        format!("~{}", report.projects_updated.len()).yellow()
    );
    println!(
        "Documents:  {} {} {}",
        format!("+{}", report.documents_added).green(),
        format!("-{}", report.documents_removed).red(),
        format!("~{}", report.documents_updated).yellow()
    );

    if report.is_partial() {
        println!();
        println!("{}", "Skipped (unsupported language):".yellow());
        for skipped in &report.skipped_projects {
            println!("  - {} ({})", skipped.name, skipped.language.dimmed());
        }
    }

    println!();
    let validation = match (report.validated, report.used_fallback) {
        (false, _) => "skipped".dimmed().to_string(),
        (true, false) => "passed".green().to_string(),
        (true, true) => "rebuilt from scratch".yellow().to_string(),
    };
    println!("Validation: {validation}");
    print_fetch(&report.fetch);
}

fn print_fetch(fetch: &FetchStats) {
    println!(
        "Fetched:    {} assets in {} round trips {}",
        fetch.assets_fetched,
        fetch.round_trips,
        format!("({} cache hits)", fetch.cache_hits).dimmed()
    );
}
