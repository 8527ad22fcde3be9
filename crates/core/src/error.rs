//! Errors raised while resolving assets

use crate::asset::AssetKind;
use crate::hash::Checksum;

/// Asset resolution errors.
///
/// Everything except `Cancelled` means the two sides disagree about the
/// content of the store and the caller must not continue with the tree.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("no asset stored for checksum {checksum}")]
    Missing { checksum: Checksum },

    #[error("asset {checksum} is a {actual:?}, expected {expected:?}")]
    KindMismatch {
        checksum: Checksum,
        expected: AssetKind,
        actual: AssetKind,
    },

    #[error("asset stored under {requested} hashes to {actual}")]
    Corrupt {
        requested: Checksum,
        actual: Checksum,
    },

    #[error("failed to decode asset: {reason}")]
    Decode { reason: String },

    #[error("asset store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("asset fetch cancelled")]
    Cancelled,
}

impl AssetError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AssetError::Cancelled)
    }
}
