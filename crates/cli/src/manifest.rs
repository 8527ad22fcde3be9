//! Solution manifests
//!
//! A manifest is a TOML file describing a solution. Document contents are
//! read from disk relative to each project's directory. Ids are derived
//! (UUID v5) from the solution path, project names and document paths, so
//! snapshotting the same manifest twice keeps every identity stable and the
//! second snapshot is an incremental update of the first.
//!
//! ```toml
//! [solution]
//! path = "App.sln"
//! analyzer_references = ["/sdk/Core.Analyzers.dll"]
//!
//! [[projects]]
//! name = "App"
//! path = "App/App.csproj"
//! references = ["Lib"]
//! metadata_references = ["System.Runtime.dll"]
//! documents = ["Program.cs", "Models/User.cs"]
//! additional_documents = ["notes.txt"]
//!
//! [frozen_document]
//! project = "App"
//! hint_name = "Generated.g.cs"
//! path = "App/obj/Generated.g.cs"
//! ```

use anyhow::{bail, Context, Result};
use replica_core::{
    AnalyzerReference, DocumentAttributes, DocumentId, DocumentKind, FrozenDocumentIdentity,
    MetadataReference, OutputKind, ProjectAttributes, ProjectId, ProjectReference,
    SolutionAttributes, SolutionId, SourceText,
};
use replica_snapshot::{DocumentInfo, ProjectInfo, Solution, SolutionInfo};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub solution: SolutionSection,
    #[serde(default)]
    pub projects: Vec<ProjectSection>,
    pub frozen_document: Option<FrozenSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolutionSection {
    /// Solution file, relative to the manifest; also the solution's identity
    pub path: String,
    #[serde(default = "default_version")]
    pub version: u64,
    #[serde(default)]
    pub analyzer_references: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectSection {
    pub name: String,
    #[serde(default = "default_language")]
    pub language: String,
    /// Project file relative to the manifest; its directory holds the documents
    pub path: Option<String>,
    pub assembly_name: Option<String>,
    pub default_namespace: Option<String>,
    pub output_kind: Option<OutputKind>,
    #[serde(default)]
    pub optimize: bool,
    #[serde(default)]
    pub allow_unsafe: bool,
    pub language_version: Option<String>,
    #[serde(default)]
    pub preprocessor_symbols: Vec<String>,
    /// Names of referenced projects
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub metadata_references: Vec<String>,
    #[serde(default)]
    pub analyzer_references: Vec<String>,
    #[serde(default)]
    pub documents: Vec<String>,
    #[serde(default)]
    pub additional_documents: Vec<String>,
    #[serde(default)]
    pub analyzer_config_documents: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrozenSection {
    pub project: String,
    pub hint_name: String,
    /// Generated file, relative to the manifest
    pub path: String,
}

fn default_version() -> u64 {
    1
}

fn default_language() -> String {
    "C#".to_string()
}

impl ProjectSection {
    /// Directory the project's document paths are relative to
    fn directory(&self) -> PathBuf {
        match &self.path {
            Some(path) => Path::new(path)
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
            None => PathBuf::from(&self.name),
        }
    }

    fn document_paths(&self, kind: DocumentKind) -> &[String] {
        match kind {
            DocumentKind::Document => &self.documents,
            DocumentKind::Additional => &self.additional_documents,
            DocumentKind::AnalyzerConfig => &self.analyzer_config_documents,
        }
    }
}

impl Manifest {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read a manifest file and build the solution it describes
    pub fn load(path: &Path) -> Result<Solution> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        let manifest = Self::parse(&text)
            .with_context(|| format!("Invalid manifest {}", path.display()))?;
        let root = path.parent().unwrap_or_else(|| Path::new("."));
        manifest.build(root)
    }

    /// Build the solution, reading documents relative to `root`
    pub fn build(&self, root: &Path) -> Result<Solution> {
        let solution_path = portable(Path::new(&self.solution.path));
        let solution_id = SolutionId::from_name(&Uuid::NAMESPACE_URL, &solution_path);

        // Names resolve to ids before any project is built so references can point forward
        let mut ids = HashMap::new();
        for project in &self.projects {
            let id = ProjectId::from_name(solution_id.as_uuid(), &project.name);
            if ids.insert(project.name.as_str(), id).is_some() {
                bail!("Duplicate project name '{}'", project.name);
            }
        }

        let mut info = SolutionInfo::new(SolutionAttributes {
            id: solution_id,
            file_path: Some(solution_path),
            version: self.solution.version,
        });
        info.analyzer_references = analyzer_references(&self.solution.analyzer_references);
        for project in &self.projects {
            info.projects.push(self.project_info(root, project, &ids)?);
        }

        let mut solution = Solution::from_info(info)?;
        if let Some(frozen) = &self.frozen_document {
            let Some(project_id) = ids.get(frozen.project.as_str()).copied() else {
                bail!("Frozen document names unknown project '{}'", frozen.project);
            };
            let relative = portable(Path::new(&frozen.path));
            let document_id =
                DocumentId::from_name(project_id.as_uuid(), &format!("frozen:{relative}"));
            let identity = FrozenDocumentIdentity {
                document_id,
                project_id,
                hint_name: frozen.hint_name.clone(),
                file_path: relative,
            };
            let text = read_text(&root.join(&frozen.path))?;
            solution = solution.with_frozen_document(identity, text)?;
        }
        Ok(solution)
    }

    fn project_info(
        &self,
        root: &Path,
        section: &ProjectSection,
        ids: &HashMap<&str, ProjectId>,
    ) -> Result<ProjectInfo> {
        let id = ids[section.name.as_str()];
        let mut attributes = ProjectAttributes::new(id, &section.name, &section.language);
        attributes.file_path = section.path.as_deref().map(|p| portable(Path::new(p)));
        attributes.default_namespace = section.default_namespace.clone();
        if let Some(assembly_name) = &section.assembly_name {
            attributes.assembly_name = assembly_name.clone();
        }

        let mut info = ProjectInfo::new(attributes);
        if let Some(output_kind) = section.output_kind {
            info.compilation_options.output_kind = output_kind;
        }
        info.compilation_options.optimize = section.optimize;
        info.compilation_options.allow_unsafe = section.allow_unsafe;
        if let Some(version) = &section.language_version {
            info.parse_options.language_version = version.clone();
        }
        info.parse_options.preprocessor_symbols = section.preprocessor_symbols.clone();

        info.project_references = section
            .references
            .iter()
            .map(|name| match ids.get(name.as_str()) {
                Some(target) => Ok(ProjectReference::new(*target)),
                None => bail!("Project '{}' references unknown project '{}'", section.name, name),
            })
            .collect::<Result<_>>()?;
        info.metadata_references = section
            .metadata_references
            .iter()
            .map(|display| Arc::new(MetadataReference::new(display.as_str())))
            .collect();
        info.analyzer_references = analyzer_references(&section.analyzer_references);

        let directory = section.directory();
        for kind in DocumentKind::ALL {
            let documents = section
                .document_paths(kind)
                .iter()
                .map(|path| document_info(root, &directory, id, kind, path))
                .collect::<Result<Vec<_>>>()?;
            *info.documents_mut(kind) = documents;
        }
        Ok(info)
    }
}

fn document_info(
    root: &Path,
    directory: &Path,
    project: ProjectId,
    kind: DocumentKind,
    path: &str,
) -> Result<DocumentInfo> {
    let relative = Path::new(path);
    if relative.is_absolute() || relative.components().any(|c| c == Component::ParentDir) {
        bail!("Document path '{}' must stay inside its project directory", path);
    }
    let Some(name) = relative.file_name().and_then(|n| n.to_str()) else {
        bail!("Document path '{}' has no file name", path);
    };

    let file_path = portable(&directory.join(relative));
    let mut attributes = DocumentAttributes::new(
        DocumentId::from_name(project.as_uuid(), &format!("{kind:?}:{file_path}")),
        name,
    );
    attributes.folders = relative
        .parent()
        .into_iter()
        .flat_map(Path::components)
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str().map(str::to_string),
            _ => None,
        })
        .collect();
    attributes.file_path = Some(file_path);

    let text = read_text(&root.join(directory).join(relative))?;
    Ok(DocumentInfo::new(attributes, text))
}

fn analyzer_references(paths: &[String]) -> Vec<Arc<AnalyzerReference>> {
    paths
        .iter()
        .map(|path| Arc::new(AnalyzerReference::new(path.as_str())))
        .collect()
}

fn read_text(path: &Path) -> Result<SourceText> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(SourceText::from(text))
}

/// Forward-slash path string, stable across platforms
fn portable(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
