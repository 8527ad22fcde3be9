//! Failure handling: protocol violations, lineage changes, unsupported
//! projects and cancellation

mod common;

use common::fixtures::synchronizer_with;
use common::{document, project, solution, synchronizer, RecordingSource};
use replica_core::{
    AssetError, AssetValue, CancellationToken, DocumentKind, ProjectAttributes, ProjectId,
    SourceText,
};
use replica_snapshot::ProjectInfo;
use replica_sync::{SyncConfig, SyncError, ValidationMode};
use std::sync::Arc;

#[tokio::test]
async fn test_unresolvable_asset_is_protocol_violation() {
    let app = project("App").with_documents(DocumentKind::Document, vec![document("a.cs", "a")]);
    let (app_id, doc_id) = (app.attributes.id, app.documents[0].attributes.id);
    let baseline = solution().add_project(app).unwrap();
    let text = SourceText::from("b");
    let text_checksum = text.checksum();
    let target = baseline.with_document_text(app_id, doc_id, text).unwrap();

    let source = Arc::new(RecordingSource::new());
    let target_checksum = source.publish(&target);
    source.store().remove(&text_checksum);
    let (sync, pool) = synchronizer(&source);

    let err = sync
        .synchronize(&baseline, target_checksum, &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        SyncError::ProtocolViolation {
            source: Some(AssetError::Missing { checksum }),
            ..
        } => assert_eq!(checksum, text_checksum),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(pool.outstanding(), 0);
}

#[tokio::test]
async fn test_unknown_target_is_protocol_violation() {
    let source = Arc::new(RecordingSource::new());
    let (sync, _pool) = synchronizer(&source);
    let missing = SourceText::from("never published").checksum();

    let err = sync
        .synchronize(&solution(), missing, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::ProtocolViolation { .. }));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_changed_file_path_is_not_incremental() {
    let baseline = solution().add_project(project("App")).unwrap();
    let mut attributes = baseline.attributes().clone();
    attributes.file_path = Some("/elsewhere/App.sln".into());
    let moved = baseline.with_attributes(attributes).unwrap();

    let source = Arc::new(RecordingSource::new());
    let moved_checksum = source.publish(&moved);
    let (sync, _pool) = synchronizer(&source);
    let cancel = CancellationToken::new();

    assert!(!sync
        .is_incremental_update(&baseline, moved_checksum, &cancel)
        .await
        .unwrap());
    let err = sync
        .synchronize(&baseline, moved_checksum, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::NotIncremental { .. }));

    let same = baseline.add_project(project("Lib")).unwrap();
    let same_checksum = source.publish(&same);
    assert!(sync
        .is_incremental_update(&baseline, same_checksum, &cancel)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_unsupported_project_is_skipped_and_reported() {
    let baseline = solution().add_project(project("App")).unwrap();
    let fsharp = ProjectInfo::new(ProjectAttributes::new(ProjectId::new(), "Script", "F#"))
        .with_documents(DocumentKind::Document, vec![document("Script.fs", "let x = 1")]);
    let fsharp_id = fsharp.attributes.id;
    let supported = project("Lib");
    let supported_id = supported.attributes.id;
    let target = baseline
        .add_project(fsharp)
        .unwrap()
        .add_project(supported)
        .unwrap();

    let source = Arc::new(RecordingSource::new());
    let target_checksum = source.publish(&target);
    let config = SyncConfig {
        validate: ValidationMode::Always,
        supported_languages: vec!["C#".to_string()],
        ..SyncConfig::default()
    };
    let (sync, _pool) = synchronizer_with(&source, config);

    let outcome = sync
        .synchronize_with_report(&baseline, target_checksum, &CancellationToken::new())
        .await
        .unwrap();

    assert!(!outcome.solution.contains_project(fsharp_id));
    assert!(outcome.solution.contains_project(supported_id));
    assert_ne!(outcome.solution.checksum(), target_checksum);
    assert!(outcome.report.is_partial());
    assert_eq!(outcome.report.skipped_projects.len(), 1);
    assert_eq!(outcome.report.skipped_projects[0].id, fsharp_id);
    assert_eq!(outcome.report.skipped_projects[0].language, "F#");
    assert!(!outcome.report.validated);
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let baseline = solution();
    let target = baseline.add_project(project("App")).unwrap();
    let source = Arc::new(RecordingSource::new());
    let target_checksum = source.publish(&target);
    let (sync, pool) = synchronizer(&source);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = sync
        .synchronize(&baseline, target_checksum, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Cancelled));
    assert!(!err.is_fatal());
    assert_eq!(source.request_count(), 0);
    assert_eq!(pool.outstanding(), 0);
}

#[tokio::test]
async fn test_cancelled_mid_flight_releases_scratch_sets() {
    let docs: Vec<_> = (0..4).map(|i| document(&format!("{i}.cs"), "x")).collect();
    let app = project("App").with_documents(DocumentKind::Document, docs);
    let app_id = app.attributes.id;
    let baseline = solution().add_project(app).unwrap();
    let target = baseline
        .remove_project(app_id)
        .unwrap()
        .add_project(project("Other"))
        .unwrap()
        .add_project(
            project("App2").with_documents(DocumentKind::Document, vec![document("n.cs", "n")]),
        )
        .unwrap();

    let source = Arc::new(RecordingSource::new());
    let target_checksum = source.publish(&target);
    let (sync, pool) = synchronizer(&source);

    let cancel = CancellationToken::new();
    // Root and project nodes come back; the project attributes request is cancelled
    source.cancel_on_request(3, cancel.clone());
    let err = sync
        .synchronize(&baseline, target_checksum, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Cancelled));
    assert_eq!(pool.outstanding(), 0);
    assert!(pool.idle() > 0);
}
