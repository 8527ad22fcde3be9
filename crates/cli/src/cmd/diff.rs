//! Show differences between two published snapshots
//!
//! Works on checksum trees alone: only the nodes that differ are fetched,
//! never document texts.

use crate::config::CliConfig;
use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use replica_core::{
    diff_collections, AssetProvider, CancellationToken, Checksum, DocumentAttributes,
    DocumentChecksums, DocumentId, DocumentKind, ProjectAttributes, ProjectChecksums, ProjectId,
    ScratchPool, SolutionChecksums,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Serialize)]
struct SnapshotDiff {
    old: Checksum,
    new: Checksum,
    /// Solution-level parts that changed
    solution: Vec<&'static str>,
    projects_added: Vec<ProjectEntry>,
    projects_removed: Vec<ProjectEntry>,
    projects_changed: Vec<ProjectChange>,
}

#[derive(Debug, Serialize)]
struct ProjectEntry {
    id: ProjectId,
    name: String,
}

#[derive(Debug, Serialize)]
struct ProjectChange {
    id: ProjectId,
    name: String,
    /// Project-level parts that changed
    parts: Vec<&'static str>,
    documents: Vec<DocumentChange>,
}

#[derive(Debug, Serialize)]
struct DocumentChange {
    kind: DocumentKind,
    name: String,
    file_path: Option<String>,
    change: Change,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum Change {
    Added,
    Removed,
    Modified,
}

pub async fn run(
    config: &CliConfig,
    store: &Path,
    old: Checksum,
    new: Checksum,
    json: bool,
) -> Result<()> {
    let sync = util::synchronizer(config, store)?;
    let cancel = CancellationToken::new();

    let diff = compute(sync.provider(), sync.pool(), old, new, &cancel)
        .await
        .with_context(|| format!("Failed to diff {} and {}", old.short(), new.short()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&diff)?);
    } else {
        print_diff(&diff);
    }
    Ok(())
}

async fn compute(
    provider: &AssetProvider,
    pool: &ScratchPool,
    old: Checksum,
    new: Checksum,
    cancel: &CancellationToken,
) -> Result<SnapshotDiff> {
    provider.prefetch([old, new], cancel).await?;
    let old_root = provider.get_cached::<SolutionChecksums>(old)?;
    let new_root = provider.get_cached::<SolutionChecksums>(new)?;

    let mut solution = Vec::new();
    if old_root.attributes != new_root.attributes {
        solution.push("attributes");
    }
    if old_root.analyzer_references.checksum() != new_root.analyzer_references.checksum() {
        solution.push("analyzer references");
    }
    if old_root.frozen_document() != new_root.frozen_document() {
        solution.push("frozen document");
    }

    // Only projects whose checksum differs are looked at
    let (removed, added): (Vec<Checksum>, Vec<Checksum>) = {
        let diff = diff_collections(
            pool,
            old_root.projects.members(),
            new_root.projects.members(),
        );
        (
            diff.removed_only.iter().copied().collect(),
            diff.added_only.iter().copied().collect(),
        )
    };
    let old_projects = project_map(provider, &removed, cancel).await?;
    let mut new_projects = project_map(provider, &added, cancel).await?;

    let mut result = SnapshotDiff {
        old,
        new,
        solution,
        projects_added: Vec::new(),
        projects_removed: Vec::new(),
        projects_changed: Vec::new(),
    };

    for (id, (old_tree, old_attributes)) in old_projects {
        match new_projects.remove(&id) {
            None => result.projects_removed.push(ProjectEntry {
                id,
                name: old_attributes.name,
            }),
            Some((new_tree, new_attributes)) => {
                let change =
                    project_change(provider, pool, &old_tree, (&new_tree, new_attributes), cancel)
                        .await?;
                result.projects_changed.push(change);
            }
        }
    }
    result.projects_added = new_projects
        .into_iter()
        .map(|(id, (_, attributes))| ProjectEntry {
            id,
            name: attributes.name,
        })
        .collect();
    Ok(result)
}

/// Project trees and attributes keyed by id
async fn project_map(
    provider: &AssetProvider,
    checksums: &[Checksum],
    cancel: &CancellationToken,
) -> Result<BTreeMap<ProjectId, (ProjectChecksums, ProjectAttributes)>> {
    let trees = provider
        .get_many::<ProjectChecksums>(checksums.iter().copied(), cancel)
        .await?;
    provider
        .prefetch(trees.iter().map(|(_, tree)| tree.attributes), cancel)
        .await?;

    let mut map = BTreeMap::new();
    for (_, tree) in trees {
        let attributes = provider.get_cached::<ProjectAttributes>(tree.attributes)?;
        map.insert(attributes.id, (tree, attributes));
    }
    Ok(map)
}

async fn project_change(
    provider: &AssetProvider,
    pool: &ScratchPool,
    old_tree: &ProjectChecksums,
    (new_tree, new_attributes): (&ProjectChecksums, ProjectAttributes),
    cancel: &CancellationToken,
) -> Result<ProjectChange> {
    let mut parts = Vec::new();
    if old_tree.attributes != new_tree.attributes {
        parts.push("attributes");
    }
    if old_tree.compilation_options != new_tree.compilation_options {
        parts.push("compilation options");
    }
    if old_tree.parse_options != new_tree.parse_options {
        parts.push("parse options");
    }
    if old_tree.project_references.checksum() != new_tree.project_references.checksum() {
        parts.push("project references");
    }
    if old_tree.metadata_references.checksum() != new_tree.metadata_references.checksum() {
        parts.push("metadata references");
    }
    if old_tree.analyzer_references.checksum() != new_tree.analyzer_references.checksum() {
        parts.push("analyzer references");
    }

    let mut documents = Vec::new();
    for kind in DocumentKind::ALL {
        let (removed, added): (Vec<Checksum>, Vec<Checksum>) = {
            let diff = diff_collections(
                pool,
                old_tree.documents_of(kind).members(),
                new_tree.documents_of(kind).members(),
            );
            (
                diff.removed_only.iter().copied().collect(),
                diff.added_only.iter().copied().collect(),
            )
        };
        let old_documents = document_map(provider, &removed, cancel).await?;
        let mut new_documents = document_map(provider, &added, cancel).await?;

        for (id, attributes) in old_documents {
            let change = match new_documents.remove(&id) {
                Some(_) => Change::Modified,
                None => Change::Removed,
            };
            documents.push(DocumentChange {
                kind,
                name: attributes.name,
                file_path: attributes.file_path,
                change,
            });
        }
        documents.extend(new_documents.into_values().map(|attributes| DocumentChange {
            kind,
            name: attributes.name,
            file_path: attributes.file_path,
            change: Change::Added,
        }));
    }

    Ok(ProjectChange {
        id: new_attributes.id,
        name: new_attributes.name,
        parts,
        documents,
    })
}

async fn document_map(
    provider: &AssetProvider,
    checksums: &[Checksum],
    cancel: &CancellationToken,
) -> Result<BTreeMap<DocumentId, DocumentAttributes>> {
    let trees = provider
        .get_many::<DocumentChecksums>(checksums.iter().copied(), cancel)
        .await?;
    let attributes = provider
        .get_many::<DocumentAttributes>(trees.iter().map(|(_, tree)| tree.attributes), cancel)
        .await?;
    Ok(attributes
        .into_iter()
        .map(|(_, attributes)| (attributes.id, attributes))
        .collect())
}

fn print_diff(diff: &SnapshotDiff) {
    util::header("Snapshot Diff");
    println!("From: {}", util::label(&diff.old));
    println!("To:   {}", util::label(&diff.new));
    println!();

    if diff.solution.is_empty()
        && diff.projects_added.is_empty()
        && diff.projects_removed.is_empty()
        && diff.projects_changed.is_empty()
    {
        println!("{}", "No changes".dimmed());
        return;
    }

    for part in &diff.solution {
        println!("{} solution {}", "~".yellow(), part);
    }
    for project in &diff.projects_added {
        println!("{} {}", "+".green(), project.name.green());
    }
    for project in &diff.projects_removed {
        println!("{} {}", "-".red(), project.name.red());
    }
    for project in &diff.projects_changed {
        println!("{} {}", "~".yellow(), project.name.yellow());
        if !project.parts.is_empty() {
            println!("    {}", project.parts.join(", ").dimmed());
        }
        for document in &project.documents {
            let path = document.file_path.as_deref().unwrap_or(&document.name);
            match document.change {
                Change::Added => println!("    {} {}", "A".green(), path),
                Change::Removed => println!("    {} {}", "D".red(), path),
                Change::Modified => println!("    {} {}", "M".yellow(), path),
            }
        }
    }
}
