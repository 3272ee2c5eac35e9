use std::collections::HashMap;
use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, RwLock};

use crate::error::{BlobError, BlobResult};
use crate::traits::{validate_key, BlobBackend, BlobSink};

/// In-memory, HashMap-based blob backend.
///
/// Intended for tests and embedding. Values are held behind a `RwLock`;
/// a sink buffers its bytes and swaps them in under the write lock on commit,
/// so readers never see a partial value.
pub struct InMemoryBlobBackend {
    blobs: RwLock<HashMap<String, Arc<[u8]>>>,
}

impl InMemoryBlobBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of values currently stored.
    pub fn len(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the backend is empty.
    pub fn is_empty(&self) -> bool {
        self.blobs.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored values.
    pub fn total_bytes(&self) -> u64 {
        self.blobs
            .read()
            .expect("lock poisoned")
            .values()
            .map(|v| v.len() as u64)
            .sum()
    }

    /// Remove every value.
    pub fn clear(&self) {
        self.blobs.write().expect("lock poisoned").clear();
    }

    fn publish(&self, key: String, data: Vec<u8>) {
        let mut map = self.blobs.write().expect("lock poisoned");
        map.insert(key, Arc::from(data));
    }
}

impl Default for InMemoryBlobBackend {
    fn default() -> Self {
        Self::new()
    }
}

struct MemorySink<'a> {
    backend: &'a InMemoryBlobBackend,
    key: String,
    buf: Vec<u8>,
}

impl Write for MemorySink<'_> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl BlobSink for MemorySink<'_> {
    fn commit(self: Box<Self>) -> BlobResult<()> {
        let MemorySink { backend, key, buf } = *self;
        backend.publish(key, buf);
        Ok(())
    }
}

impl BlobBackend for InMemoryBlobBackend {
    fn read_stream(&self, key: &str) -> BlobResult<Box<dyn Read + Send + '_>> {
        validate_key(key)?;
        let map = self.blobs.read().expect("lock poisoned");
        let value = map.get(key).cloned().ok_or_else(|| BlobError::NotFound {
            key: key.to_string(),
        })?;
        Ok(Box::new(Cursor::new(value)))
    }

    fn write_stream(&self, key: &str) -> BlobResult<Box<dyn BlobSink + '_>> {
        validate_key(key)?;
        Ok(Box::new(MemorySink {
            backend: self,
            key: key.to_string(),
            buf: Vec::new(),
        }))
    }

    fn exists(&self, key: &str) -> BlobResult<bool> {
        validate_key(key)?;
        let map = self.blobs.read().expect("lock poisoned");
        Ok(map.contains_key(key))
    }

    fn remove(&self, key: &str) -> BlobResult<bool> {
        validate_key(key)?;
        let mut map = self.blobs.write().expect("lock poisoned");
        Ok(map.remove(key).is_some())
    }

    fn keys(&self, prefix: &str) -> BlobResult<Vec<String>> {
        let map = self.blobs.read().expect("lock poisoned");
        let mut keys: Vec<String> = map
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

impl std::fmt::Debug for InMemoryBlobBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobBackend")
            .field("blob_count", &self.len())
            .finish()
    }
}
