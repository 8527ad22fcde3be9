//! Replica Snapshot - persistent, structurally shared solution snapshots
//!
//! A [`Solution`] is an immutable tree of projects and documents. Updates
//! return a new tree that shares every untouched node with the old one, and
//! each node memoizes its checksums so comparing against a remote checksum
//! tree only hashes what changed.

pub mod document;
pub mod error;
pub mod info;
pub mod project;
pub mod publish;
pub mod references;
pub mod solution;

pub use document::DocumentState;
pub use error::{Result, SnapshotError};
pub use info::{DocumentInfo, ProjectInfo, SolutionInfo};
pub use project::{DocumentMap, ProjectState};
pub use references::ReferenceCache;
pub use solution::{FrozenDocument, Solution};
