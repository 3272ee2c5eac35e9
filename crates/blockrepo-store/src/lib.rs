//! Content-addressed block storage for blockrepo.
//!
//! A [`Block`] is an immutable pair of a [`Cid`](blockrepo_types::Cid) and the
//! payload it was derived from. The [`BlockStore`] persists payloads in a
//! [`BlobBackend`](blockrepo_blob::BlobBackend) under a key computed from the
//! identifier alone.
//!
//! # Design Rules
//!
//! 1. Blocks are verified before they are written: the identifier must be the
//!    digest of the payload.
//! 2. The store never takes locks. Equal identifiers mean equal payloads, so
//!    concurrent writers of the same block write the same bytes.
//! 3. Reads re-verify the payload against the identifier; a mismatch is
//!    reported as corruption, never as absence.
//! 4. Batch writes stop at the first failure and keep what was written.
//! 5. All backend errors are propagated, never silently ignored.

pub mod block;
pub mod error;
pub mod store;

pub use block::Block;
pub use error::{StoreError, StoreResult};
pub use store::{BlockStats, BlockStore};
