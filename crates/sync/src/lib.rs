//! Replica Sync - checksum-driven incremental solution synchronization
//!
//! Given a baseline [`replica_snapshot::Solution`] and the checksum of a
//! target solution held by an asset store, the [`Synchronizer`]:
//! - diffs the target's checksum tree against the baseline, layer by layer
//! - bulk-fetches only the assets that are new
//! - applies the smallest set of persistent edits, so every unchanged
//!   project and document stays shared with the baseline
//! - optionally re-hashes the result and falls back to a full rebuild

pub mod config;
mod documents;
pub mod error;
pub mod materialize;
mod projects;
pub mod report;
pub mod synchronizer;
pub mod validate;

pub use config::{SyncConfig, ValidationMode};
pub use error::{ConfigError, Result, SyncError};
pub use materialize::ProjectMaterializer;
pub use report::{SkippedProject, SyncOutcome, SyncReport};
pub use synchronizer::Synchronizer;
pub use validate::diverging_projects;
