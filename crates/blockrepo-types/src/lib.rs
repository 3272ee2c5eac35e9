//! Content identifiers for blockrepo.
//!
//! Every block in a repository is addressed by a [`Cid`]: a small,
//! self-describing value that records the identifier version, the payload
//! codec, the hash function, and the digest of the payload. Identical bytes
//! always produce the same `Cid`; any change to the bytes produces a
//! different one.
//!
//! # Key Types
//!
//! - [`Cid`] -- Versioned content identifier (binary and text forms)
//! - [`HashAlgorithm`] -- Supported digest functions (BLAKE3, SHA2-256)
//! - [`Codec`] -- Derives identifiers from payloads and maps them to storage keys
//! - [`ToCid`] -- Anything that can be interpreted as an identifier

pub mod cid;
pub mod codec;
pub mod error;
pub mod multihash;

pub use cid::{Cid, CID_VERSION, RAW_CODEC};
pub use codec::{Codec, ToCid};
pub use error::TypeError;
pub use multihash::{HashAlgorithm, DIGEST_LEN};
