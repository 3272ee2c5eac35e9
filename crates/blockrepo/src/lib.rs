//! blockrepo: a content-addressed block store with a locked configuration
//! document.
//!
//! This crate wires the lower layers into a repository directory and is the
//! main entry point for applications embedding blockrepo.
//!
//! ```text
//! {root}/
//! ├── options.toml   # RepoOptions (hash, locking, durability)
//! ├── repo.lock      # advisory lock guarding config writes
//! ├── version        # repository format version
//! ├── config         # configuration document (JSON)
//! └── blocks/        # one file per block, named by Cid
//! ```

pub mod r#async;
pub mod error;
pub mod options;
pub mod repository;

pub use error::{RepoError, RepoResult};
pub use options::{LockKind, RepoOptions};
pub use r#async::AsyncRepo;
pub use repository::{Repo, REPO_VERSION};

// Re-export key types
pub use blockrepo_config::{ConfigError, ConfigStore, Document};
pub use blockrepo_store::{Block, BlockStats, BlockStore, StoreError};
pub use blockrepo_types::{Cid, Codec, HashAlgorithm, ToCid};
