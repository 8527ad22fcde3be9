//! Error types for synchronization and its configuration

use replica_core::{AssetError, Checksum, SolutionId};
use replica_snapshot::SnapshotError;

/// Synchronization failures
///
/// Everything except `Cancelled` is fatal: the caller must not keep using a
/// tree built from a store it disagrees with.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("protocol violation: {reason}")]
    ProtocolViolation {
        reason: String,
        #[source]
        source: Option<AssetError>,
    },

    #[error("{target} is not an incremental update of solution {solution}: {reason}")]
    NotIncremental {
        solution: SolutionId,
        target: Checksum,
        reason: &'static str,
    },

    #[error("snapshot update failed: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("rebuilt solution hashes to {actual}, requested {expected}")]
    ConsistencyFailure {
        expected: Checksum,
        actual: Checksum,
    },

    #[error("synchronization cancelled")]
    Cancelled,
}

impl SyncError {
    pub(crate) fn protocol(reason: impl Into<String>) -> Self {
        SyncError::ProtocolViolation {
            reason: reason.into(),
            source: None,
        }
    }

    pub fn is_fatal(&self) -> bool {
        !matches!(self, SyncError::Cancelled)
    }
}

impl From<AssetError> for SyncError {
    fn from(err: AssetError) -> Self {
        match err {
            AssetError::Cancelled => SyncError::Cancelled,
            err => SyncError::ProtocolViolation {
                reason: "asset store cannot satisfy the checksum tree".to_string(),
                source: Some(err),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid value for {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}
