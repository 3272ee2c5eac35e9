//! Mutual exclusion for repository configuration writes.
//!
//! A [`LockCoordinator`] hands out a single [`LockToken`] at a time.
//! Callers give the token back through [`LockCoordinator::unlock`]; the
//! [`with_lock`] helper and [`LockGuard`] make sure that happens on every
//! exit path, including early returns and panics.
//!
//! # Coordinators
//!
//! - [`MemoryLock`] -- condvar-based lock shared by name within the process
//! - [`FileLock`] -- advisory `flock`-style lock on a file, shared by every
//!   process on the host
//!
//! Waiters are not served in FIFO order. Callers may rely on exclusivity only.

pub mod error;
pub mod file;
pub mod guard;
pub mod memory;
pub mod traits;

pub use error::{LockError, LockResult};
pub use file::FileLock;
pub use guard::{with_lock, LockGuard};
pub use memory::MemoryLock;
pub use traits::{LockCoordinator, LockToken};
