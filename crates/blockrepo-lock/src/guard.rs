use tracing::warn;

use crate::error::{LockError, LockResult};
use crate::traits::{LockCoordinator, LockToken};

/// Scoped acquisition: releases the lock when dropped.
///
/// Prefer [`LockGuard::release`] on the normal path so release errors are
/// observed; the drop path only logs them.
pub struct LockGuard<'a, L: LockCoordinator + ?Sized> {
    locks: &'a L,
    token: Option<LockToken>,
}

impl<'a, L: LockCoordinator + ?Sized> LockGuard<'a, L> {
    /// Acquire `locks`.
    pub fn acquire(locks: &'a L) -> LockResult<Self> {
        let token = locks.lock()?;
        Ok(Self {
            locks,
            token: Some(token),
        })
    }

    /// Release now, reporting any error.
    pub fn release(mut self) -> LockResult<()> {
        match self.token.take() {
            Some(token) => self.locks.unlock(token),
            None => Ok(()),
        }
    }
}

impl<L: LockCoordinator + ?Sized> Drop for LockGuard<'_, L> {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            if let Err(e) = self.locks.unlock(token) {
                warn!(lock = self.locks.name(), error = %e, "failed to release lock on drop");
            }
        }
    }
}

/// Run `f` while holding `locks`.
///
/// The lock is released on every exit path. If `f` fails, its error is
/// returned even when the release also fails; a release error surfaces only
/// when `f` succeeded.
pub fn with_lock<L, T, E, F>(locks: &L, f: F) -> Result<T, E>
where
    L: LockCoordinator + ?Sized,
    E: From<LockError>,
    F: FnOnce() -> Result<T, E>,
{
    let guard = LockGuard::acquire(locks)?;
    let outcome = f();
    let released = guard.release();
    let value = outcome?;
    released?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryLock;
    use std::time::Duration;

    #[derive(Debug)]
    enum TestError {
        Lock(LockError),
        Work(&'static str),
    }

    impl From<LockError> for TestError {
        fn from(e: LockError) -> Self {
            Self::Lock(e)
        }
    }

    #[test]
    fn with_lock_returns_value_and_releases() {
        let locks = MemoryLock::new("test").with_timeout(Duration::from_millis(50));
        let v: Result<u32, TestError> = with_lock(&locks, || Ok(7));
        assert_eq!(v.unwrap(), 7);
        let token = locks.lock().expect("lock should be free again");
        locks.unlock(token).unwrap();
    }

    #[test]
    fn with_lock_releases_on_error() {
        let locks = MemoryLock::new("test").with_timeout(Duration::from_millis(50));
        let v: Result<(), TestError> = with_lock(&locks, || Err(TestError::Work("boom")));
        assert!(matches!(v, Err(TestError::Work("boom"))));
        assert!(!locks.is_held());
    }

    #[test]
    fn with_lock_reports_timeout_without_running() {
        let locks = MemoryLock::new("test").with_timeout(Duration::from_millis(20));
        let held = locks.lock().unwrap();
        let mut ran = false;
        let v: Result<(), TestError> = with_lock(&locks, || {
            ran = true;
            Ok(())
        });
        assert!(matches!(v, Err(TestError::Lock(LockError::Timeout { .. }))));
        assert!(!ran);
        locks.unlock(held).unwrap();
    }

    #[test]
    fn guard_releases_on_panic() {
        let locks = std::sync::Arc::new(MemoryLock::new("test"));
        let inner = std::sync::Arc::clone(&locks);
        let result = std::thread::spawn(move || {
            let _guard = LockGuard::acquire(inner.as_ref()).unwrap();
            panic!("worker died");
        })
        .join();
        assert!(result.is_err());
        assert!(!locks.is_held());
    }
}
