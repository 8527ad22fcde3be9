//! Randomized edit sequences always converge to the target checksum

mod common;

use common::{document, project, solution, synchronizer, RecordingSource};
use proptest::prelude::*;
use replica_core::{
    AnalyzerReference, CancellationToken, DocumentId, DocumentKind, MetadataReference,
    ProjectReference, SourceText,
};
use replica_snapshot::{ProjectState, Solution};
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Edit {
    Text {
        project: usize,
        kind: usize,
        document: usize,
        text: String,
    },
    AddDocument {
        project: usize,
        kind: usize,
        name: String,
    },
    RemoveDocument {
        project: usize,
        kind: usize,
        document: usize,
    },
    MoveDocument {
        project: usize,
        document: usize,
        from: usize,
        to: usize,
    },
    Folders {
        project: usize,
        document: usize,
        folder: String,
    },
    AddProject { name: String },
    RemoveProject { project: usize },
    Reference { from: usize, to: usize },
    MetadataReference { project: usize, name: String },
    AnalyzerReference {
        project: Option<usize>,
        name: String,
    },
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (0..8usize, 0..3usize, 0..8usize, "[a-z ]{0,24}").prop_map(
            |(project, kind, document, text)| Edit::Text {
                project,
                kind,
                document,
                text,
            }
        ),
        (0..8usize, 0..3usize, "[a-z]{1,8}").prop_map(|(project, kind, name)| {
            Edit::AddDocument {
                project,
                kind,
                name,
            }
        }),
        (0..8usize, 0..3usize, 0..8usize).prop_map(|(project, kind, document)| {
            Edit::RemoveDocument {
                project,
                kind,
                document,
            }
        }),
        (0..8usize, 0..8usize, 0..3usize, 0..3usize).prop_map(
            |(project, document, from, to)| Edit::MoveDocument {
                project,
                document,
                from,
                to,
            }
        ),
        (0..8usize, 0..8usize, "[a-z]{1,6}").prop_map(|(project, document, folder)| {
            Edit::Folders {
                project,
                document,
                folder,
            }
        }),
        "[A-Z][a-z]{1,8}".prop_map(|name| Edit::AddProject { name }),
        (0..8usize).prop_map(|project| Edit::RemoveProject { project }),
        (0..8usize, 0..8usize).prop_map(|(from, to)| Edit::Reference { from, to }),
        (0..8usize, "[a-c]")
            .prop_map(|(project, name)| Edit::MetadataReference { project, name }),
        (prop::option::of(0..8usize), "[a-c]")
            .prop_map(|(project, name)| Edit::AnalyzerReference { project, name }),
    ]
}

/// Three projects with documents of every kind
fn baseline() -> Solution {
    let mut solution = solution();
    for p in 0..3 {
        let docs = (0..3)
            .map(|d| document(&format!("P{p}D{d}.cs"), &format!("class P{p}D{d} {{}}")))
            .collect();
        let info = project(&format!("P{p}"))
            .with_documents(DocumentKind::Document, docs)
            .with_documents(
                DocumentKind::Additional,
                vec![document(&format!("P{p}.txt"), "notes")],
            )
            .with_documents(
                DocumentKind::AnalyzerConfig,
                vec![document(&format!("P{p}.editorconfig"), "root = true")],
            );
        solution = solution.add_project(info).unwrap();
    }
    solution
}

/// Add the item if absent, drop it if present
fn toggle<T>(items: &[Arc<T>], item: T, same: impl Fn(&T, &T) -> bool) -> Vec<Arc<T>> {
    if items.iter().any(|i| same(i.as_ref(), &item)) {
        items
            .iter()
            .filter(|i| !same(i.as_ref(), &item))
            .cloned()
            .collect()
    } else {
        let mut items = items.to_vec();
        items.push(Arc::new(item));
        items
    }
}

fn nth_document(project: &ProjectState, kind: DocumentKind, i: usize) -> Option<DocumentId> {
    let docs: Vec<_> = project.documents(kind).keys().copied().collect();
    docs.get(i % docs.len().max(1)).copied()
}

/// Apply an edit if it makes sense for the current shape; otherwise keep the solution
fn apply(solution: &Solution, edit: &Edit) -> Solution {
    let projects: Vec<_> = solution.projects().cloned().collect();
    let pick = |i: usize| projects.get(i % projects.len().max(1));

    let next = match edit {
        Edit::Text { project, kind, document, text } => pick(*project).and_then(|p| {
            let id = nth_document(p, DocumentKind::ALL[*kind], *document)?;
            solution
                .with_document_text(p.id(), id, SourceText::from(text.as_str()))
                .ok()
        }),
        Edit::AddDocument { project, kind, name } => pick(*project).and_then(|p| {
            let kind = DocumentKind::ALL[*kind];
            solution
                .add_documents(p.id(), kind, vec![document(&format!("{name}.txt"), name)])
                .ok()
        }),
        Edit::RemoveDocument { project, kind, document } => pick(*project).and_then(|p| {
            let kind = DocumentKind::ALL[*kind];
            let id = nth_document(p, kind, *document)?;
            solution.remove_documents(p.id(), kind, &[id]).ok()
        }),
        Edit::MoveDocument { project, document, from, to } => pick(*project).and_then(|p| {
            let (from, to) = (DocumentKind::ALL[*from], DocumentKind::ALL[*to]);
            let id = nth_document(p, from, *document)?;
            let info = p.document(id)?.to_info();
            solution
                .remove_documents(p.id(), from, &[id])
                .and_then(|s| s.add_documents(p.id(), to, vec![info]))
                .ok()
        }),
        Edit::Folders { project, document, folder } => pick(*project).and_then(|p| {
            let id = nth_document(p, DocumentKind::Document, *document)?;
            solution
                .with_document_folders(p.id(), id, vec![folder.clone()])
                .ok()
        }),
        Edit::AddProject { name } => solution.add_project(project(name)).ok(),
        Edit::RemoveProject { project } => {
            pick(*project).and_then(|p| solution.remove_project(p.id()).ok())
        }
        Edit::Reference { from, to } => match (pick(*from), pick(*to)) {
            (Some(from), Some(to)) if from.id() != to.id() => {
                let mut references = from.project_references().to_vec();
                if references.iter().any(|r| r.project_id == to.id()) {
                    references.retain(|r| r.project_id != to.id());
                } else {
                    references.push(ProjectReference::new(to.id()));
                }
                solution.with_project_references(from.id(), references).ok()
            }
            _ => None,
        },
        Edit::MetadataReference { project, name } => pick(*project).and_then(|p| {
            let reference = MetadataReference::new(format!("{name}.dll"));
            let references =
                toggle(p.metadata_references(), reference, |a, b| a.display == b.display);
            solution.with_metadata_references(p.id(), references).ok()
        }),
        Edit::AnalyzerReference { project, name } => {
            let reference = AnalyzerReference::new(format!("/analyzers/{name}.dll"));
            let same = |a: &AnalyzerReference, b: &AnalyzerReference| a.full_path == b.full_path;
            match project {
                Some(project) => pick(*project).and_then(|p| {
                    let references = toggle(p.analyzer_references(), reference, same);
                    solution
                        .with_project_analyzer_references(p.id(), references)
                        .ok()
                }),
                None => {
                    let references = toggle(solution.analyzer_references(), reference, same);
                    Some(solution.with_analyzer_references(references))
                }
            }
        }
    };
    next.unwrap_or_else(|| solution.clone())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_synchronize_reaches_target(edits in prop::collection::vec(edit_strategy(), 1..12)) {
        let baseline = baseline();
        let target = edits.iter().fold(baseline.clone(), |s, e| apply(&s, e));

        let source = Arc::new(RecordingSource::new());
        let target_checksum = source.publish(&target);
        let (sync, pool) = synchronizer(&source);

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let outcome = runtime
            .block_on(sync.synchronize_with_report(
                &baseline,
                target_checksum,
                &CancellationToken::new(),
            ))
            .unwrap();

        prop_assert_eq!(outcome.solution.checksum(), target_checksum);
        prop_assert!(!outcome.report.used_fallback);
        prop_assert_eq!(pool.outstanding(), 0);

        // Untouched projects stay shared
        for project in baseline.projects() {
            if let Some(synced) = outcome.solution.project(project.id()) {
                if synced.checksums().checksum == project.checksums().checksum {
                    prop_assert!(Arc::ptr_eq(project, synced));
                }
            }
        }
    }
}
