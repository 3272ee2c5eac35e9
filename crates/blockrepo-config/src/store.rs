use std::sync::Arc;

use blockrepo_blob::{BlobBackend, BlobError};
use blockrepo_lock::{with_lock, LockCoordinator};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::path;

/// Backend key holding the configuration document.
pub const CONFIG_KEY: &str = "config";

/// The configuration document: a JSON object.
pub type Document = Map<String, Value>;

/// Durable, lock-serialized storage for the configuration document.
///
/// `get` takes no lock and relies on the backend's atomic replace, so a
/// reader racing a writer sees the old or the new document, never a torn
/// one. `set` and the read-modify-write helpers hold the lock for the whole
/// write and always release it before returning.
#[derive(Clone)]
pub struct ConfigStore {
    backend: Arc<dyn BlobBackend>,
    locks: Arc<dyn LockCoordinator>,
}

impl ConfigStore {
    pub fn new(backend: Arc<dyn BlobBackend>, locks: Arc<dyn LockCoordinator>) -> Self {
        Self { backend, locks }
    }

    /// Read the current document.
    pub fn get(&self) -> ConfigResult<Document> {
        let bytes = match self.backend.read(CONFIG_KEY) {
            Ok(bytes) => bytes,
            Err(BlobError::NotFound { .. }) => return Err(ConfigError::NotFound),
            Err(e) => return Err(e.into()),
        };
        decode(&bytes)
    }

    /// Returns `true` if a document has been written.
    pub fn exists(&self) -> ConfigResult<bool> {
        Ok(self.backend.exists(CONFIG_KEY)?)
    }

    /// Replace the whole document.
    ///
    /// The document is encoded before the lock is requested, so an encoding
    /// failure never touches the lock, and a lock failure never writes.
    pub fn set(&self, doc: &Document) -> ConfigResult<()> {
        let bytes = encode(doc)?;
        with_lock(self.locks.as_ref(), || self.write(&bytes))?;
        debug!(keys = doc.len(), "configuration replaced");
        Ok(())
    }

    /// Read the document into a typed value.
    pub fn get_as<T: DeserializeOwned>(&self) -> ConfigResult<T> {
        let doc = self.get()?;
        serde_json::from_value(Value::Object(doc))
            .map_err(|e| ConfigError::Deserialization(e.to_string()))
    }

    /// Replace the document with a typed value that serializes to an object.
    pub fn set_from<T: Serialize>(&self, value: &T) -> ConfigResult<()> {
        match serde_json::to_value(value) {
            Ok(Value::Object(doc)) => self.set(&doc),
            Ok(other) => Err(ConfigError::Serialization(format!(
                "expected a JSON object, got {}",
                kind_of(&other)
            ))),
            Err(e) => Err(ConfigError::Serialization(e.to_string())),
        }
    }

    /// Read one value by dotted key.
    pub fn get_value(&self, key: &str) -> ConfigResult<Value> {
        let doc = self.get()?;
        path::lookup(&doc, key)?
            .cloned()
            .ok_or_else(|| ConfigError::KeyNotFound {
                key: key.to_string(),
            })
    }

    /// Set one value by dotted key, creating intermediate objects.
    pub fn set_value(&self, key: &str, value: Value) -> ConfigResult<()> {
        self.update(|doc| path::assign(doc, key, value))?;
        debug!(key, "configuration value set");
        Ok(())
    }

    /// Locked read-modify-write of the document.
    ///
    /// The current document (empty if none exists) is read after the lock is
    /// taken, so no concurrent update is lost. If `f` fails nothing is
    /// written.
    pub fn update<F>(&self, f: F) -> ConfigResult<()>
    where
        F: FnOnce(&mut Document) -> ConfigResult<()>,
    {
        with_lock(self.locks.as_ref(), || {
            let mut doc = match self.get() {
                Ok(doc) => doc,
                Err(ConfigError::NotFound) => Document::new(),
                Err(e) => return Err(e),
            };
            f(&mut doc)?;
            let bytes = encode(&doc)?;
            self.write(&bytes)
        })
    }

    fn write(&self, bytes: &[u8]) -> ConfigResult<()> {
        self.backend.write(CONFIG_KEY, bytes)?;
        Ok(())
    }
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("backend", &self.backend)
            .field("lock", &self.locks.name())
            .finish()
    }
}

fn encode(doc: &Document) -> ConfigResult<Vec<u8>> {
    serde_json::to_vec_pretty(doc).map_err(|e| ConfigError::Serialization(e.to_string()))
}

fn decode(bytes: &[u8]) -> ConfigResult<Document> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(doc)) => Ok(doc),
        Ok(other) => Err(ConfigError::Deserialization(format!(
            "expected a JSON object, found {}",
            kind_of(&other)
        ))),
        Err(e) => Err(ConfigError::Deserialization(e.to_string())),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
