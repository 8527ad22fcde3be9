//! Errors raised by persistent snapshot operations

use replica_core::{DocumentId, DocumentKind, ProjectId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    #[error("project {id} is not part of the solution")]
    UnknownProject { id: ProjectId },

    #[error("project {id} is already part of the solution")]
    DuplicateProject { id: ProjectId },

    #[error("document {id} is not part of project {project}")]
    UnknownDocument { project: ProjectId, id: DocumentId },

    #[error("document {id} is already part of project {project}")]
    DuplicateDocument { project: ProjectId, id: DocumentId },

    #[error("project references of {project} would form a cycle")]
    CyclicReference { project: ProjectId },

    #[error("{node} field '{field}' cannot change once created")]
    ImmutableField {
        node: &'static str,
        field: &'static str,
    },

    #[error("cannot {operation} on {kind:?} document {id}")]
    WrongDocumentKind {
        id: DocumentId,
        kind: DocumentKind,
        operation: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, SnapshotError>;
