//! The repository configuration document.
//!
//! A repository carries exactly one configuration document: a JSON object
//! stored as UTF-8 under the backend key [`CONFIG_KEY`]. Reads go straight to
//! the backend. Every mutation runs under a
//! [`LockCoordinator`](blockrepo_lock::LockCoordinator), so concurrent writers
//! are serialized and the lock is released whether the write succeeds or not.

pub mod error;
pub mod path;
pub mod store;

pub use error::{ConfigError, ConfigResult};
pub use store::{ConfigStore, Document, CONFIG_KEY};
