//! Error types for configuration operations.

use blockrepo_blob::BlobError;
use blockrepo_lock::LockError;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration has been written yet.
    #[error("configuration not found")]
    NotFound,

    /// The document has no value at the requested key.
    #[error("config key not found: {key}")]
    KeyNotFound { key: String },

    /// The dotted key is malformed or crosses a non-object value.
    #[error("invalid config key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// The document could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The stored bytes are not a JSON object.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// The configuration lock could not be taken or released.
    #[error("lock error: {0}")]
    Lock(#[from] LockError),

    /// Error from the underlying blob backend.
    #[error("backend error: {0}")]
    Backend(#[from] BlobError),
}

impl ConfigError {
    /// Returns `true` if the lock timed out (the caller may retry).
    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, Self::Lock(e) if e.is_timeout())
    }
}

/// Convenience type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
