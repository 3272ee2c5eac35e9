use std::fs::File;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::LockResult;

static NEXT_OWNER: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-unique owner id for a coordinator.
pub(crate) fn next_owner_id() -> u64 {
    NEXT_OWNER.fetch_add(1, Ordering::Relaxed)
}

/// Proof of a successful acquisition.
///
/// Tokens cannot be built outside this crate and are consumed by
/// [`LockCoordinator::unlock`], so a token can be released at most once.
#[derive(Debug)]
#[must_use = "a lock token must be passed back to unlock"]
pub struct LockToken {
    pub(crate) owner: u64,
    pub(crate) ticket: u64,
    pub(crate) file: Option<File>,
}

impl LockToken {
    pub(crate) fn new(owner: u64, ticket: u64) -> Self {
        Self {
            owner,
            ticket,
            file: None,
        }
    }

    pub(crate) fn with_file(owner: u64, ticket: u64, file: File) -> Self {
        Self {
            owner,
            ticket,
            file: Some(file),
        }
    }

    /// Sequence number of this acquisition.
    pub fn ticket(&self) -> u64 {
        self.ticket
    }
}

/// Exclusive lock over a single named resource.
///
/// Implementations must guarantee at most one outstanding token at a time.
pub trait LockCoordinator: Send + Sync + std::fmt::Debug {
    /// Block until the resource is free, then take it.
    ///
    /// Fails with [`LockError::Timeout`](crate::LockError::Timeout) if the
    /// coordinator has a timeout and it elapses first.
    fn lock(&self) -> LockResult<LockToken>;

    /// Release the resource held by `token`.
    ///
    /// Fails with [`LockError::State`](crate::LockError::State) if `token` was
    /// not issued by this coordinator or does not hold the lock. A rejected
    /// token is still consumed. What that means for the issuing coordinator
    /// depends on how it holds the lock: a [`MemoryLock`](crate::MemoryLock)
    /// stays held because no other token can release it, while a
    /// [`FileLock`](crate::FileLock) token owns its file handle, so dropping
    /// it releases the lock at the OS level.
    fn unlock(&self, token: LockToken) -> LockResult<()>;

    /// Name of the guarded resource, for diagnostics.
    fn name(&self) -> &str;
}
