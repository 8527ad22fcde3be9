//! Value types carried by a snapshot
//!
//! These are the attribute sets, options and references that hang off the
//! solution, project and document nodes. They are plain immutable values:
//! each one is stored as its own asset and identified by its checksum.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

macro_rules! node_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Fresh random id
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Stable id derived from a name (UUID v5), so the same input
            /// produces the same identity across snapshots
            pub fn from_name(namespace: &Uuid, name: &str) -> Self {
                Self(Uuid::new_v5(namespace, name.as_bytes()))
            }

            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

node_id!(
    /// Identity of a solution (one lineage of snapshots)
    SolutionId
);
node_id!(
    /// Identity of a project within a solution
    ProjectId
);
node_id!(
    /// Identity of a document within a project
    DocumentId
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionAttributes {
    pub id: SolutionId,
    pub file_path: Option<String>,
    pub version: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceHashAlgorithm {
    Sha1,
    Sha256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectAttributes {
    pub id: ProjectId,
    pub language: String,
    pub name: String,
    pub assembly_name: String,
    pub file_path: Option<String>,
    pub output_file_path: Option<String>,
    pub output_ref_file_path: Option<String>,
    pub default_namespace: Option<String>,
    pub is_submission: bool,
    pub has_all_information: bool,
    pub run_analyzers: bool,
    pub checksum_algorithm: SourceHashAlgorithm,
}

impl ProjectAttributes {
    /// Attributes with conventional defaults for everything but identity
    pub fn new(id: ProjectId, name: impl Into<String>, language: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id,
            language: language.into(),
            assembly_name: name.clone(),
            name,
            file_path: None,
            output_file_path: None,
            output_ref_file_path: None,
            default_namespace: None,
            is_submission: false,
            has_all_information: true,
            run_analyzers: true,
            checksum_algorithm: SourceHashAlgorithm::Sha256,
        }
    }
}

/// Kind of binary a project compiles to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputKind {
    ConsoleApplication,
    WindowsApplication,
    DynamicallyLinkedLibrary,
    NetModule,
    WindowsRuntimeMetadata,
    WindowsRuntimeApplication,
}

impl OutputKind {
    pub const ALL: [OutputKind; 6] = [
        OutputKind::ConsoleApplication,
        OutputKind::WindowsApplication,
        OutputKind::DynamicallyLinkedLibrary,
        OutputKind::NetModule,
        OutputKind::WindowsRuntimeMetadata,
        OutputKind::WindowsRuntimeApplication,
    ];

    /// Numeric code used by project systems, 0 through 5
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether a raw code names an output kind
    pub fn is_valid(code: u8) -> bool {
        usize::from(code) < Self::ALL.len()
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }

    pub fn default_extension(self) -> &'static str {
        match self {
            OutputKind::ConsoleApplication
            | OutputKind::WindowsApplication
            | OutputKind::WindowsRuntimeApplication => ".exe",
            OutputKind::DynamicallyLinkedLibrary => ".dll",
            OutputKind::NetModule => ".netmodule",
            OutputKind::WindowsRuntimeMetadata => ".winmdobj",
        }
    }

    pub fn is_application(self) -> bool {
        matches!(
            self,
            OutputKind::ConsoleApplication
                | OutputKind::WindowsApplication
                | OutputKind::WindowsRuntimeApplication
        )
    }

    pub fn is_net_module(self) -> bool {
        self == OutputKind::NetModule
    }

    pub fn is_windows_runtime(self) -> bool {
        self == OutputKind::WindowsRuntimeMetadata
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NullableContext {
    Disabled,
    Warnings,
    Annotations,
    Enabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilationOptions {
    pub output_kind: OutputKind,
    pub optimize: bool,
    pub allow_unsafe: bool,
    pub warning_level: u8,
    pub nullable_context: NullableContext,
}

impl Default for CompilationOptions {
    fn default() -> Self {
        Self {
            output_kind: OutputKind::DynamicallyLinkedLibrary,
            optimize: false,
            allow_unsafe: false,
            warning_level: 4,
            nullable_context: NullableContext::Disabled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentationMode {
    None,
    Parse,
    Diagnose,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseOptions {
    pub language_version: String,
    pub preprocessor_symbols: Vec<String>,
    pub documentation_mode: DocumentationMode,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            language_version: "latest".to_string(),
            preprocessor_symbols: Vec::new(),
            documentation_mode: DocumentationMode::Parse,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectReference {
    pub project_id: ProjectId,
    pub aliases: Vec<String>,
    pub embed_interop_types: bool,
}

impl ProjectReference {
    pub fn new(project_id: ProjectId) -> Self {
        Self {
            project_id,
            aliases: Vec::new(),
            embed_interop_types: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetadataReference {
    pub display: String,
    pub aliases: Vec<String>,
    pub embed_interop_types: bool,
}

impl MetadataReference {
    pub fn new(display: impl Into<String>) -> Self {
        Self {
            display: display.into(),
            aliases: Vec::new(),
            embed_interop_types: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalyzerReference {
    pub full_path: String,
    pub display: String,
}

impl AnalyzerReference {
    pub fn new(full_path: impl Into<String>) -> Self {
        let full_path = full_path.into();
        let display = full_path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(full_path.as_str())
            .to_string();
        Self { full_path, display }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    Regular,
    Script,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentAttributes {
    pub id: DocumentId,
    pub name: String,
    pub folders: Vec<String>,
    pub source_kind: SourceKind,
    pub file_path: Option<String>,
    pub is_generated: bool,
    pub design_time_only: bool,
}

impl DocumentAttributes {
    pub fn new(id: DocumentId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            folders: Vec::new(),
            source_kind: SourceKind::Regular,
            file_path: None,
            is_generated: false,
            design_time_only: false,
        }
    }
}

/// Which of a project's three document collections a document lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    Document,
    Additional,
    AnalyzerConfig,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 3] = [
        DocumentKind::Document,
        DocumentKind::Additional,
        DocumentKind::AnalyzerConfig,
    ];
}

/// Immutable document text, shared between snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceText(Arc<str>);

impl SourceText {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for SourceText {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for SourceText {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

/// Identity of a provisional generated document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrozenDocumentIdentity {
    pub document_id: DocumentId,
    pub project_id: ProjectId,
    pub hint_name: String,
    pub file_path: String,
}
