use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use fs4::FileExt;
use tracing::{debug, warn};

use crate::error::{LockError, LockResult};
use crate::traits::{next_owner_id, LockCoordinator, LockToken};

const INITIAL_BACKOFF: Duration = Duration::from_millis(2);
const MAX_BACKOFF: Duration = Duration::from_millis(50);

/// Advisory exclusive lock on a file.
///
/// Every acquisition opens its own handle on the lock file, so the lock
/// excludes other threads of this process as well as other processes. The
/// OS drops the lock if the holder exits without unlocking.
#[derive(Debug)]
pub struct FileLock {
    id: u64,
    name: String,
    path: PathBuf,
    timeout: Option<Duration>,
    tickets: AtomicU64,
}

impl FileLock {
    /// Lock coordinator backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            id: next_owner_id(),
            name: path.display().to_string(),
            path,
            timeout: None,
            tickets: AtomicU64::new(0),
        }
    }

    /// Give up waiting after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> LockResult<File> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.path)?;
        Ok(file)
    }

    fn acquire_bounded(&self, file: &File, timeout: Duration) -> LockResult<()> {
        let started = Instant::now();
        let mut backoff = INITIAL_BACKOFF;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(()),
                Err(err) if is_contended(&err) => {}
                Err(err) => return Err(err.into()),
            }
            let waited = started.elapsed();
            if waited >= timeout {
                warn!(lock = %self.name, ?waited, "lock acquisition timed out");
                return Err(LockError::Timeout {
                    name: self.name.clone(),
                    waited,
                });
            }
            thread::sleep(backoff.min(timeout - waited));
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    if err.kind() == ErrorKind::WouldBlock {
        return true;
    }
    #[cfg(windows)]
    if matches!(err.raw_os_error(), Some(32 | 33)) {
        return true;
    }
    false
}

impl LockCoordinator for FileLock {
    fn lock(&self) -> LockResult<LockToken> {
        let file = self.open()?;
        match self.timeout {
            Some(timeout) => self.acquire_bounded(&file, timeout)?,
            None => file.lock_exclusive()?,
        }
        let ticket = self.tickets.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(lock = %self.name, ticket, "file lock acquired");
        Ok(LockToken::with_file(self.id, ticket, file))
    }

    fn unlock(&self, token: LockToken) -> LockResult<()> {
        if token.owner != self.id {
            if token.file.is_some() {
                warn!(lock = %self.name, ticket = token.ticket, "foreign file lock token dropped");
            }
            return Err(LockError::State {
                name: self.name.clone(),
                reason: "token was issued by a different lock".into(),
            });
        }
        let Some(file) = token.file else {
            return Err(LockError::State {
                name: self.name.clone(),
                reason: "token carries no lock file handle".into(),
            });
        };
        FileExt::unlock(&file)?;
        debug!(lock = %self.name, ticket = token.ticket, "file lock released");
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryLock;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn lock_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let locks = FileLock::new(dir.path().join("nested").join("repo.lock"));
        let token = locks.lock().unwrap();
        assert!(locks.path().exists());
        locks.unlock(token).unwrap();
    }

    #[test]
    fn second_acquirer_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repo.lock");
        let first = FileLock::new(&path);
        let second = FileLock::new(&path).with_timeout(Duration::from_millis(40));
        let token = first.lock().unwrap();
        assert!(second.lock().unwrap_err().is_timeout());
        first.unlock(token).unwrap();
        let token = second.lock().unwrap();
        second.unlock(token).unwrap();
    }

    #[test]
    fn token_from_other_coordinator_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let locks = FileLock::new(dir.path().join("repo.lock"));
        let other = MemoryLock::new("other");
        let token = other.lock().unwrap();
        assert!(matches!(locks.unlock(token), Err(LockError::State { .. })));
    }

    #[test]
    fn rejected_file_token_releases_its_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repo.lock");
        let issuer = FileLock::new(&path);
        let stranger = FileLock::new(&path).with_timeout(Duration::from_millis(40));

        let token = issuer.lock().unwrap();
        assert!(stranger.lock().unwrap_err().is_timeout());
        assert!(matches!(stranger.unlock(token), Err(LockError::State { .. })));

        // The handle travelled with the token, so the file is free again.
        let token = stranger.lock().unwrap();
        stranger.unlock(token).unwrap();
    }

    #[test]
    fn threads_are_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let locks = Arc::new(FileLock::new(dir.path().join("repo.lock")));
        let inside = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..6)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                thread::spawn(move || {
                    for _ in 0..10 {
                        let token = locks.lock().unwrap();
                        assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                        thread::sleep(Duration::from_millis(1));
                        inside.fetch_sub(1, Ordering::SeqCst);
                        locks.unlock(token).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }
    }
}
