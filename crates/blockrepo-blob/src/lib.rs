//! Blob backends for blockrepo.
//!
//! A blob backend is a flat key to bytes store with streamed reads and
//! writes. Higher layers (the block store and the config store) only ever
//! talk to the [`BlobBackend`] trait.
//!
//! # Backends
//!
//! - [`InMemoryBlobBackend`] -- `HashMap`-based store for tests and embedding
//! - [`FsBlobBackend`] -- one file per key under a root directory
//!
//! # Contract
//!
//! 1. A write becomes visible only when its sink is committed; a dropped sink
//!    leaves the previous value untouched.
//! 2. A committed write replaces the whole value at once. Readers see the old
//!    bytes or the new bytes, never a mix.
//! 3. Keys are `/`-separated paths of `[A-Za-z0-9._-]` segments.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use error::{BlobError, BlobResult};
pub use fs::FsBlobBackend;
pub use memory::InMemoryBlobBackend;
pub use traits::{validate_key, BlobBackend, BlobSink};
