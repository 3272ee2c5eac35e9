/// Errors from blob backend operations.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// No value is stored under the key.
    #[error("blob not found: {key}")]
    NotFound { key: String },

    /// The key is not a valid backend path.
    #[error("invalid blob key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// I/O error from the underlying storage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend was opened read-only.
    #[error("blob backend is read-only")]
    ReadOnly,
}

impl BlobError {
    /// Returns `true` for [`BlobError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result alias for blob operations.
pub type BlobResult<T> = Result<T, BlobError>;
