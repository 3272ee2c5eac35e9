use std::time::Duration;

/// Errors from lock coordination.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// The lock was not acquired within the configured bound.
    #[error("timed out after {waited:?} waiting for lock {name}")]
    Timeout { name: String, waited: Duration },

    /// `unlock` was called with a token that does not hold this lock.
    #[error("lock state violation on {name}: {reason}")]
    State { name: String, reason: String },

    /// I/O error from the lock file.
    #[error("lock I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LockError {
    /// Returns `true` if retrying later may succeed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Result alias for lock operations.
pub type LockResult<T> = Result<T, LockError>;
