use std::io::{Read, Write};

use crate::error::{BlobError, BlobResult};

/// The write half of a blob: bytes are buffered or staged until
/// [`commit`](BlobSink::commit) publishes them under the key.
///
/// Dropping a sink without committing discards everything written to it.
pub trait BlobSink: Write + Send {
    /// Publish the written bytes atomically, replacing any previous value.
    fn commit(self: Box<Self>) -> BlobResult<()>;
}

/// Key to bytes storage with streamed access.
///
/// All implementations must satisfy these invariants:
/// - A committed write is atomic per key: concurrent readers observe either
///   the previous value or the new one.
/// - Concurrent writers to the same key do not corrupt each other; the last
///   commit wins.
/// - `NotFound` is reported only for absence, never for I/O failures.
pub trait BlobBackend: Send + Sync + std::fmt::Debug {
    /// Open a reader over the value stored at `key`.
    ///
    /// Returns [`BlobError::NotFound`] if nothing is stored there.
    fn read_stream(&self, key: &str) -> BlobResult<Box<dyn Read + Send + '_>>;

    /// Open a sink that will replace the value at `key` when committed.
    fn write_stream(&self, key: &str) -> BlobResult<Box<dyn BlobSink + '_>>;

    /// Check whether a value is stored at `key`.
    fn exists(&self, key: &str) -> BlobResult<bool>;

    /// Remove the value at `key`. Returns `true` if it existed.
    fn remove(&self, key: &str) -> BlobResult<bool>;

    /// All keys starting with `prefix`, sorted.
    fn keys(&self, prefix: &str) -> BlobResult<Vec<String>>;

    /// Read the whole value at `key`.
    fn read(&self, key: &str) -> BlobResult<Vec<u8>> {
        let mut reader = self.read_stream(key)?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Replace the value at `key` with `data`.
    fn write(&self, key: &str, data: &[u8]) -> BlobResult<()> {
        let mut sink = self.write_stream(key)?;
        sink.write_all(data)?;
        sink.commit()
    }
}

/// Check that `key` is a well-formed backend path.
pub fn validate_key(key: &str) -> BlobResult<()> {
    let invalid = |reason: &str| BlobError::InvalidKey {
        key: key.to_string(),
        reason: reason.into(),
    };

    if key.is_empty() {
        return Err(invalid("empty key"));
    }
    for segment in key.split('/') {
        if segment.is_empty() {
            return Err(invalid("empty path segment"));
        }
        if segment == "." || segment == ".." {
            return Err(invalid("relative path segment"));
        }
        if segment.starts_with(".tmp") {
            return Err(invalid("reserved prefix '.tmp'"));
        }
        if !segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            return Err(invalid("unsupported character"));
        }
    }
    Ok(())
}
