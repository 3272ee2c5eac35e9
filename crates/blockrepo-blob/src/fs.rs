use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{BlobError, BlobResult};
use crate::traits::{validate_key, BlobBackend, BlobSink};

/// Prefix of in-flight temporary files. Keys may not use it.
const TEMP_PREFIX: &str = ".tmp-";

/// Filesystem blob backend: one file per key below `root`.
///
/// Writes go to a temporary file in the destination directory and are
/// renamed over the destination on commit. Rename is atomic within a
/// filesystem, so readers always see a complete file.
#[derive(Clone, Debug)]
pub struct FsBlobBackend {
    root: PathBuf,
    fsync: bool,
    read_only: bool,
}

impl FsBlobBackend {
    /// Open (or create) a backend rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> BlobResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            fsync: false,
            read_only: false,
        })
    }

    /// Open an existing root for reads only.
    pub fn open_read_only(root: impl Into<PathBuf>) -> BlobResult<Self> {
        Ok(Self {
            root: root.into(),
            fsync: false,
            read_only: true,
        })
    }

    /// `fsync` every committed file before the rename.
    pub fn with_fsync(mut self, fsync: bool) -> Self {
        self.fsync = fsync;
        self
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path backing `key`.
    pub fn path_for(&self, key: &str) -> BlobResult<PathBuf> {
        validate_key(key)?;
        Ok(key.split('/').fold(self.root.clone(), |p, seg| p.join(seg)))
    }
}

/// Staged write: a temp file next to the destination.
struct FsSink {
    file: BufWriter<NamedTempFile>,
    dest: PathBuf,
    fsync: bool,
}

impl Write for FsSink {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.file.write(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl BlobSink for FsSink {
    fn commit(self: Box<Self>) -> BlobResult<()> {
        let FsSink { file, dest, fsync } = *self;
        let tmp = file.into_inner().map_err(|e| e.into_error())?;
        if fsync {
            tmp.as_file().sync_all()?;
        }
        tmp.persist(&dest).map_err(|e| e.error)?;
        debug!(path = %dest.display(), "blob committed");
        Ok(())
    }
}

impl BlobBackend for FsBlobBackend {
    fn read_stream(&self, key: &str) -> BlobResult<Box<dyn Read + Send + '_>> {
        let path = self.path_for(key)?;
        match File::open(&path) {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(BlobError::NotFound {
                key: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn write_stream(&self, key: &str) -> BlobResult<Box<dyn BlobSink + '_>> {
        if self.read_only {
            return Err(BlobError::ReadOnly);
        }
        let dest = self.path_for(key)?;
        let parent = dest.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent)?;
        let tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(parent)?;
        Ok(Box::new(FsSink {
            file: BufWriter::new(tmp),
            dest,
            fsync: self.fsync,
        }))
    }

    fn exists(&self, key: &str) -> BlobResult<bool> {
        match fs::metadata(self.path_for(key)?) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn remove(&self, key: &str) -> BlobResult<bool> {
        if self.read_only {
            return Err(BlobError::ReadOnly);
        }
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self, prefix: &str) -> BlobResult<Vec<String>> {
        let mut keys = Vec::new();
        if !self.root.exists() {
            return Ok(keys);
        }
        for entry in WalkDir::new(&self.root).min_depth(1) {
            let entry = entry.map_err(|e| {
                e.into_io_error()
                    .unwrap_or_else(|| io::Error::new(ErrorKind::Other, "filesystem loop"))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let segments: Option<Vec<&str>> =
                rel.components().map(|c| c.as_os_str().to_str()).collect();
            let Some(segments) = segments else {
                warn!(path = %entry.path().display(), "skipping non-UTF-8 path");
                continue;
            };
            if segments.iter().any(|s| s.starts_with(TEMP_PREFIX)) {
                continue;
            }
            let key = segments.join("/");
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}
