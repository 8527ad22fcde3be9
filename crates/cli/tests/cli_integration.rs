//! End-to-end tests for the replica binary
//!
//! Each test builds a solution workspace in a temp directory, publishes
//! snapshots into a directory store and drives the other commands against it.

mod common;

use anyhow::Result;
use common::cli::is_checksum;
use common::workspace::{MANIFEST, STORE};
use common::Workspace;

fn snapshot(workspace: &Workspace) -> Result<String> {
    let result =
        replica!(workspace.path(), "snapshot", MANIFEST, "--store", STORE).assert_success()?;
    result
        .parse_checksum()
        .ok_or_else(|| anyhow::anyhow!("no checksum in output:\n{}", result.stdout))
}

#[test]
fn test_snapshot_is_deterministic() -> Result<()> {
    let workspace = Workspace::new()?;

    let first = snapshot(&workspace)?;
    let second = snapshot(&workspace)?;

    assert!(is_checksum(&first));
    assert_eq!(first, second);
    assert!(workspace.join(STORE).join("objects").is_dir());
    Ok(())
}

#[test]
fn test_sync_reports_document_changes() -> Result<()> {
    let workspace = Workspace::new()?;
    workspace.write("replica.toml", "[sync]\nvalidate = \"always\"\n")?;
    let baseline = snapshot(&workspace)?;

    workspace.write("App/Program.cs", "class Program { static void Main(string[] args) {} }")?;
    workspace.write("App/Services/Clock.cs", "class Clock {}")?;
    workspace.write_manifest("App.sln", &["Program.cs", "Models/User.cs", "Services/Clock.cs"])?;
    let target = snapshot(&workspace)?;
    assert_ne!(baseline, target);

    let result = replica!(
        workspace.path(),
        "sync",
        "--store",
        STORE,
        "--baseline",
        &baseline,
        "--target",
        &target,
        "--json"
    )
    .assert_success()?;
    let report = result.json()?;

    assert_eq!(report["target"], target.as_str());
    assert_eq!(report["up_to_date"], false);
    assert_eq!(report["documents_added"], 1);
    assert_eq!(report["documents_updated"], 1);
    assert_eq!(report["documents_removed"], 0);
    assert_eq!(report["projects_updated"].as_array().map(Vec::len), Some(1));
    assert_eq!(report["validated"], true);
    assert_eq!(report["used_fallback"], false);
    Ok(())
}

#[test]
fn test_sync_to_same_snapshot_is_up_to_date() -> Result<()> {
    let workspace = Workspace::new()?;
    let checksum = snapshot(&workspace)?;

    let result = replica!(
        workspace.path(),
        "sync",
        "--store",
        STORE,
        "--baseline",
        &checksum,
        "--target",
        &checksum,
        "--json"
    )
    .assert_success()?;
    let report = result.json()?;

    assert_eq!(report["up_to_date"], true);
    assert_eq!(report["fetch"]["round_trips"], 0);
    Ok(())
}

#[test]
fn test_sync_without_baseline_builds_from_scratch() -> Result<()> {
    let workspace = Workspace::new()?;
    let checksum = snapshot(&workspace)?;

    let result = replica!(
        workspace.path(),
        "sync",
        "--store",
        STORE,
        "--target",
        &checksum,
        "--json"
    )
    .assert_success()?;
    let summary = result.json()?;

    assert_eq!(summary["projects"], 2);
    assert_eq!(summary["documents"], 4);
    Ok(())
}

#[test]
fn test_diff_lists_changed_documents() -> Result<()> {
    let workspace = Workspace::new()?;
    let old = snapshot(&workspace)?;

    workspace.write("Lib/Lib.cs", "public class Lib { public int Value; }")?;
    workspace.write_manifest("App.sln", &["Program.cs"])?;
    let new = snapshot(&workspace)?;

    let result = replica!(workspace.path(), "diff", "--store", STORE, &old, &new, "--json")
        .assert_success()?;
    let diff = result.json()?;

    assert!(diff["projects_added"].as_array().unwrap().is_empty());
    assert!(diff["projects_removed"].as_array().unwrap().is_empty());
    let changed = diff["projects_changed"].as_array().unwrap();
    assert_eq!(changed.len(), 2);

    let app = changed.iter().find(|p| p["name"] == "App").unwrap();
    let app_documents = app["documents"].as_array().unwrap();
    assert_eq!(app_documents.len(), 1);
    assert_eq!(app_documents[0]["change"], "removed");
    assert_eq!(app_documents[0]["file_path"], "App/Models/User.cs");

    let lib = changed.iter().find(|p| p["name"] == "Lib").unwrap();
    assert_eq!(lib["documents"][0]["change"], "modified");

    // Human-readable form names the same files
    let text = replica!(workspace.path(), "diff", "--store", STORE, &old, &new).assert_success()?;
    assert!(text.contains_stdout("App/Models/User.cs"));
    assert!(text.contains_stdout("Lib/Lib.cs"));
    Ok(())
}

#[test]
fn test_check_detects_lineage_change() -> Result<()> {
    let workspace = Workspace::new()?;
    let baseline = snapshot(&workspace)?;

    workspace.write("App/Program.cs", "// edited")?;
    let edited = snapshot(&workspace)?;
    let result = replica!(workspace.path(), "check", "--store", STORE, &baseline, &edited)
        .assert_success()?;
    assert!(result.contains_stdout("incremental"));
    assert!(!result.contains_stdout("not incremental"));

    // A different solution path is a different solution
    workspace.write_manifest("Renamed.sln", &["Program.cs", "Models/User.cs"])?;
    let renamed = snapshot(&workspace)?;
    let result = replica!(workspace.path(), "check", "--store", STORE, &baseline, &renamed)
        .assert_success()?;
    assert!(result.contains_stdout("not incremental"));

    let failed = replica!(
        workspace.path(),
        "sync",
        "--store",
        STORE,
        "--baseline",
        &baseline,
        "--target",
        &renamed
    )
    .assert_failure()?;
    assert!(failed.contains_stderr("not an incremental update"));
    Ok(())
}

#[test]
fn test_unknown_checksum_fails() -> Result<()> {
    let workspace = Workspace::new()?;
    snapshot(&workspace)?;
    let unknown = "0".repeat(63) + "1";

    let result = replica!(workspace.path(), "sync", "--store", STORE, "--target", &unknown)
        .assert_failure()?;
    assert!(result.contains_stderr("protocol violation"));
    Ok(())
}

#[test]
fn test_missing_store_fails() -> Result<()> {
    let workspace = Workspace::new()?;
    let checksum = "ab".repeat(32);

    let result = replica!(workspace.path(), "sync", "--store", "nowhere", "--target", &checksum)
        .assert_failure()?;
    assert!(result.contains_stderr("No asset store"));
    Ok(())
}

#[test]
fn test_invalid_config_fails() -> Result<()> {
    let workspace = Workspace::new()?;
    workspace.write("broken.toml", "[sync]\nvalidate = \"sometimes\"\n")?;

    let result = replica!(
        workspace.path(),
        "--config",
        "broken.toml",
        "snapshot",
        MANIFEST,
        "--store",
        STORE
    )
    .assert_failure()?;
    assert!(result.contains_stderr("Invalid config"));
    Ok(())
}
