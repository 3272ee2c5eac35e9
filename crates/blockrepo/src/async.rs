//! Async access to a [`Repo`] for tokio applications.
//!
//! Every call runs the blocking operation on tokio's blocking pool, so lock
//! waits and file I/O never stall the async executor.

use std::sync::Arc;

use blockrepo_config::Document;
use blockrepo_store::{Block, BlockStats};
use blockrepo_types::Cid;
use serde_json::Value;

use crate::error::{RepoError, RepoResult};
use crate::repository::Repo;

/// Cheaply cloneable async handle on a [`Repo`].
#[derive(Clone, Debug)]
pub struct AsyncRepo {
    inner: Arc<Repo>,
}

impl AsyncRepo {
    pub fn new(repo: Repo) -> Self {
        Self {
            inner: Arc::new(repo),
        }
    }

    /// The wrapped repository, for synchronous calls.
    pub fn blocking(&self) -> &Repo {
        &self.inner
    }

    async fn run<T, F>(&self, f: F) -> RepoResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Repo) -> RepoResult<T> + Send + 'static,
    {
        let repo = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(&repo))
            .await
            .map_err(|e| RepoError::Task(e.to_string()))?
    }

    // ---- Blocks ----

    pub async fn put(&self, block: Block) -> RepoResult<()> {
        self.run(move |repo| Ok(repo.blocks().put(&block)?)).await
    }

    pub async fn put_many(&self, blocks: Vec<Block>) -> RepoResult<()> {
        self.run(move |repo| Ok(repo.blocks().put_many(&blocks)?))
            .await
    }

    pub async fn get(&self, cid: Cid) -> RepoResult<Block> {
        self.run(move |repo| Ok(repo.blocks().get(&cid)?)).await
    }

    pub async fn has(&self, cid: Cid) -> RepoResult<bool> {
        self.run(move |repo| Ok(repo.blocks().has(&cid)?)).await
    }

    pub async fn delete(&self, cid: Cid) -> RepoResult<()> {
        self.run(move |repo| Ok(repo.blocks().delete(&cid)?)).await
    }

    pub async fn stat(&self) -> RepoResult<BlockStats> {
        self.run(|repo| Ok(repo.blocks().stat()?)).await
    }

    // ---- Configuration ----

    pub async fn config_get(&self) -> RepoResult<Document> {
        self.run(|repo| Ok(repo.config().get()?)).await
    }

    pub async fn config_set(&self, doc: Document) -> RepoResult<()> {
        self.run(move |repo| Ok(repo.config().set(&doc)?)).await
    }

    pub async fn get_value(&self, key: String) -> RepoResult<Value> {
        self.run(move |repo| Ok(repo.config().get_value(&key)?))
            .await
    }

    pub async fn set_value(&self, key: String, value: Value) -> RepoResult<()> {
        self.run(move |repo| Ok(repo.config().set_value(&key, value)?))
            .await
    }
}

impl From<Repo> for AsyncRepo {
    fn from(repo: Repo) -> Self {
        Self::new(repo)
    }
}
