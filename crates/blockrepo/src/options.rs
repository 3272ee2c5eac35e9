use std::path::Path;
use std::time::Duration;

use blockrepo_types::{Codec, HashAlgorithm};
use serde::{Deserialize, Serialize};

use crate::error::{RepoError, RepoResult};

/// File name of the options file inside a repository root.
pub const OPTIONS_FILE: &str = "options.toml";

/// Which lock coordinator guards configuration writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockKind {
    /// Advisory lock on `repo.lock`; excludes other processes too.
    #[default]
    File,
    /// Process-wide in-memory lock keyed by the repository path.
    Memory,
}

/// Tunables for opening a repository.
///
/// These describe how the repository is stored, not what it stores; the
/// configuration document is separate user data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoOptions {
    /// Hash function for newly derived identifiers.
    pub hash: HashAlgorithm,
    /// Re-hash payloads on read and report mismatches as corruption.
    pub verify_on_read: bool,
    /// `fsync` each committed blob before it becomes visible.
    pub fsync: bool,
    /// Lock coordinator for configuration writes.
    pub lock: LockKind,
    /// Give up on the configuration lock after this many milliseconds.
    /// Zero waits indefinitely.
    pub lock_timeout_ms: u64,
}

impl Default for RepoOptions {
    fn default() -> Self {
        Self {
            hash: HashAlgorithm::default(),
            verify_on_read: true,
            fsync: false,
            lock: LockKind::default(),
            lock_timeout_ms: 10_000,
        }
    }
}

impl RepoOptions {
    /// Options for tests and embedding: in-memory lock, short timeout.
    pub fn ephemeral() -> Self {
        Self {
            lock: LockKind::Memory,
            lock_timeout_ms: 1_000,
            ..Default::default()
        }
    }

    pub fn lock_timeout(&self) -> Option<Duration> {
        (self.lock_timeout_ms > 0).then(|| Duration::from_millis(self.lock_timeout_ms))
    }

    pub fn codec(&self) -> Codec {
        Codec::new(self.hash)
    }

    pub fn from_toml_str(s: &str) -> RepoResult<Self> {
        toml::from_str(s).map_err(|e| RepoError::Options(e.to_string()))
    }

    pub fn to_toml_string(&self) -> RepoResult<String> {
        toml::to_string_pretty(self).map_err(|e| RepoError::Options(e.to_string()))
    }

    /// Load from `path`, or defaults if the file does not exist.
    pub fn load_or_default(path: &Path) -> RepoResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() {
        let o = RepoOptions::default();
        assert_eq!(o.hash, HashAlgorithm::Blake3);
        assert!(o.verify_on_read);
        assert_eq!(o.lock, LockKind::File);
        assert_eq!(o.lock_timeout(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn toml_roundtrip() {
        let o = RepoOptions {
            hash: HashAlgorithm::Sha2_256,
            fsync: true,
            lock_timeout_ms: 0,
            ..Default::default()
        };
        let text = o.to_toml_string().unwrap();
        assert!(text.contains("sha2-256"));
        assert_eq!(o.lock_timeout(), None);
        assert_eq!(RepoOptions::from_toml_str(&text).unwrap(), o);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let o = RepoOptions::from_toml_str("lock = \"memory\"\n").unwrap();
        assert_eq!(o.lock, LockKind::Memory);
        assert_eq!(o.hash, HashAlgorithm::Blake3);
        assert!(o.verify_on_read);
    }

    #[test]
    fn bad_toml_is_options_error() {
        assert!(matches!(
            RepoOptions::from_toml_str("hash = \"md5\""),
            Err(RepoError::Options(_))
        ));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let o = RepoOptions::load_or_default(&dir.path().join(OPTIONS_FILE)).unwrap();
        assert_eq!(o, RepoOptions::default());
    }
}
