use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("repository not initialized at {0}")]
    NotInitialized(String),

    #[error("repository already initialized at {0}")]
    AlreadyInitialized(String),

    #[error("repository version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("unreadable repository version: {0:?}")]
    InvalidVersion(String),

    #[error("invalid repository options: {0}")]
    Options(String),

    #[error("store error: {0}")]
    Store(#[from] blockrepo_store::StoreError),

    #[error("config error: {0}")]
    Config(#[from] blockrepo_config::ConfigError),

    #[error("backend error: {0}")]
    Backend(#[from] blockrepo_blob::BlobError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("background task failed: {0}")]
    Task(String),
}

pub type RepoResult<T> = Result<T, RepoError>;
