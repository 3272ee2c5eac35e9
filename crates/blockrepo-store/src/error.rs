use blockrepo_blob::BlobError;
use blockrepo_types::{Cid, TypeError};

/// Errors from block store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The block's identifier does not describe its payload.
    #[error("invalid block {cid}: {reason}")]
    InvalidBlock { cid: Cid, reason: String },

    /// The identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] TypeError),

    /// No block is stored under the identifier.
    #[error("block not found: {0}")]
    NotFound(Cid),

    /// Stored bytes no longer hash to their identifier.
    #[error("corrupt block {cid}: payload hashes to {computed}")]
    Corrupt { cid: Cid, computed: Cid },

    /// Error from the underlying blob backend.
    #[error("backend error: {0}")]
    Backend(#[from] BlobError),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
