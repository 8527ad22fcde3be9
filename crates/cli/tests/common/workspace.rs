//! Temporary solution workspaces on disk

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const MANIFEST: &str = "solution.toml";
pub const STORE: &str = "store";

/// A temp directory holding a manifest, its documents and a store
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Two-project solution: App references Lib
    pub fn new() -> Result<Self> {
        let workspace = Self {
            dir: tempfile::tempdir()?,
        };
        workspace.write("App/Program.cs", "class Program { static void Main() {} }")?;
        workspace.write("App/Models/User.cs", "class User {}")?;
        workspace.write("App/notes.txt", "release notes")?;
        workspace.write("Lib/Lib.cs", "public class Lib {}")?;
        workspace.write_manifest("App.sln", &["Program.cs", "Models/User.cs"])?;
        Ok(workspace)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, path: &str) -> PathBuf {
        self.dir.path().join(path)
    }

    pub fn write(&self, path: &str, contents: &str) -> Result<()> {
        let path = self.join(path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }

    /// Rewrite the manifest with the given solution path and App documents
    pub fn write_manifest(&self, solution_path: &str, app_documents: &[&str]) -> Result<()> {
        let documents = app_documents
            .iter()
            .map(|d| format!("\"{d}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let manifest = format!(
            r#"
[solution]
path = "{solution_path}"

[[projects]]
name = "App"
path = "App/App.csproj"
references = ["Lib"]
metadata_references = ["System.Runtime.dll"]
documents = [{documents}]
additional_documents = ["notes.txt"]

[[projects]]
name = "Lib"
path = "Lib/Lib.csproj"
documents = ["Lib.cs"]
"#
        );
        self.write(MANIFEST, &manifest)
    }
}
