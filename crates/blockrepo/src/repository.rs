use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use blockrepo_blob::{BlobBackend, BlobError, FsBlobBackend, InMemoryBlobBackend};
use blockrepo_config::{ConfigStore, Document};
use blockrepo_lock::{FileLock, LockCoordinator, MemoryLock};
use blockrepo_store::BlockStore;
use tracing::{debug, info};

use crate::error::{RepoError, RepoResult};
use crate::options::{LockKind, RepoOptions, OPTIONS_FILE};

/// On-disk format version written by [`Repo::init`].
pub const REPO_VERSION: u32 = 1;

const VERSION_KEY: &str = "version";
const LOCK_FILE: &str = "repo.lock";
const BLOCKS_DIR: &str = "blocks";

/// A repository: a block store and a configuration document sharing one
/// backend.
pub struct Repo {
    root: Option<PathBuf>,
    options: RepoOptions,
    backend: Arc<dyn BlobBackend>,
    blocks: BlockStore,
    config: ConfigStore,
}

impl Repo {
    /// Create a repository at `path` with an empty configuration document.
    pub fn init(path: impl AsRef<Path>, options: RepoOptions) -> RepoResult<Self> {
        Self::init_with_config(path, options, &Document::new())
    }

    /// Create a repository at `path` seeded with `config`.
    pub fn init_with_config(
        path: impl AsRef<Path>,
        options: RepoOptions,
        config: &Document,
    ) -> RepoResult<Self> {
        let root = path.as_ref().to_path_buf();
        if Self::exists(&root) {
            return Err(RepoError::AlreadyInitialized(root.display().to_string()));
        }
        fs::create_dir_all(root.join(BLOCKS_DIR))?;
        fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(root.join(LOCK_FILE))?;

        let backend = FsBlobBackend::open(&root)?.with_fsync(options.fsync);
        backend.write(OPTIONS_FILE, options.to_toml_string()?.as_bytes())?;
        let repo = Self::assemble(Some(root.clone()), options, Arc::new(backend))?;
        if !repo.config.exists()? {
            repo.config.set(config)?;
        }
        // Written last: a repository without a version entry is not initialized.
        repo.backend
            .write(VERSION_KEY, format!("{REPO_VERSION}\n").as_bytes())?;

        info!(root = %root.display(), hash = %repo.options.hash, "initialized repository");
        Ok(repo)
    }

    /// Open an existing repository at `path`.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Self::open_with(path.as_ref(), false)
    }

    /// Open an existing repository for reads only. Every write through the
    /// returned handle fails with [`BlobError::ReadOnly`].
    pub fn open_read_only(path: impl AsRef<Path>) -> RepoResult<Self> {
        Self::open_with(path.as_ref(), true)
    }

    fn open_with(path: &Path, read_only: bool) -> RepoResult<Self> {
        let root = path.to_path_buf();
        if !Self::exists(&root) {
            return Err(RepoError::NotInitialized(root.display().to_string()));
        }
        let options = RepoOptions::load_or_default(&root.join(OPTIONS_FILE))?;
        let backend = if read_only {
            FsBlobBackend::open_read_only(&root)?
        } else {
            FsBlobBackend::open(&root)?.with_fsync(options.fsync)
        };
        let repo = Self::assemble(Some(root.clone()), options, Arc::new(backend))?;

        let found = repo.version()?;
        if found != REPO_VERSION {
            return Err(RepoError::VersionMismatch {
                expected: REPO_VERSION,
                found,
            });
        }
        info!(root = %root.display(), read_only, "opened repository");
        Ok(repo)
    }

    /// A repository that lives only in memory.
    pub fn in_memory() -> RepoResult<Self> {
        let repo = Self::assemble(
            None,
            RepoOptions::ephemeral(),
            Arc::new(InMemoryBlobBackend::new()),
        )?;
        repo.config.set(&Document::new())?;
        repo.backend
            .write(VERSION_KEY, format!("{REPO_VERSION}\n").as_bytes())?;
        Ok(repo)
    }

    /// Returns `true` if `path` holds an initialized repository.
    pub fn exists(path: impl AsRef<Path>) -> bool {
        path.as_ref().join(VERSION_KEY).is_file()
    }

    fn assemble(
        root: Option<PathBuf>,
        options: RepoOptions,
        backend: Arc<dyn BlobBackend>,
    ) -> RepoResult<Self> {
        let locks = lock_for(root.as_deref(), &options);
        debug!(lock = locks.name(), kind = ?options.lock, "configuration lock selected");
        let blocks = BlockStore::new(Arc::clone(&backend))
            .with_codec(options.codec())
            .with_verify_on_read(options.verify_on_read);
        let config = ConfigStore::new(Arc::clone(&backend), locks);
        Ok(Self {
            root,
            options,
            backend,
            blocks,
            config,
        })
    }

    // ---- Accessors ----

    pub fn blocks(&self) -> &BlockStore {
        &self.blocks
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn options(&self) -> &RepoOptions {
        &self.options
    }

    /// Root directory, or `None` for an in-memory repository.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Format version recorded in the repository.
    pub fn version(&self) -> RepoResult<u32> {
        let bytes = match self.backend.read(VERSION_KEY) {
            Ok(bytes) => bytes,
            Err(BlobError::NotFound { .. }) => {
                return Err(RepoError::NotInitialized(self.describe()))
            }
            Err(e) => return Err(e.into()),
        };
        let text = String::from_utf8_lossy(&bytes);
        text.trim()
            .parse()
            .map_err(|_| RepoError::InvalidVersion(text.trim().to_string()))
    }

    fn describe(&self) -> String {
        match &self.root {
            Some(root) => root.display().to_string(),
            None => "<memory>".into(),
        }
    }
}

impl std::fmt::Debug for Repo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repo")
            .field("root", &self.root)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn lock_for(root: Option<&Path>, options: &RepoOptions) -> Arc<dyn LockCoordinator> {
    let timeout = options.lock_timeout();
    match (options.lock, root) {
        (LockKind::File, Some(root)) => {
            let lock = FileLock::new(root.join(LOCK_FILE));
            Arc::new(match timeout {
                Some(t) => lock.with_timeout(t),
                None => lock,
            })
        }
        (LockKind::Memory, Some(root)) => {
            let key = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
            let lock = MemoryLock::shared(format!("blockrepo:{}", key.display()));
            Arc::new(match timeout {
                Some(t) => lock.with_timeout(t),
                None => lock,
            })
        }
        (_, None) => {
            let lock = MemoryLock::new("blockrepo:memory");
            Arc::new(match timeout {
                Some(t) => lock.with_timeout(t),
                None => lock,
            })
        }
    }
}
