use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::TypeError;

/// Length in bytes of every supported digest.
pub const DIGEST_LEN: usize = 32;

/// Hash function used to derive a [`Cid`](crate::Cid).
///
/// The numeric codes follow the multicodec table so identifiers stay
/// self-describing: a reader can tell which function produced a digest
/// without any out-of-band information.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// BLAKE3 with a 256-bit output.
    #[default]
    #[serde(rename = "blake3")]
    Blake3,
    /// SHA2-256.
    #[serde(rename = "sha2-256")]
    Sha2_256,
}

impl HashAlgorithm {
    /// Multicodec code for this function.
    pub const fn code(self) -> u8 {
        match self {
            Self::Blake3 => 0x1e,
            Self::Sha2_256 => 0x12,
        }
    }

    /// Look up a function by its multicodec code.
    pub fn from_code(code: u8) -> Result<Self, TypeError> {
        match code {
            0x1e => Ok(Self::Blake3),
            0x12 => Ok(Self::Sha2_256),
            other => Err(TypeError::UnknownHash(other)),
        }
    }

    /// Canonical lowercase name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Blake3 => "blake3",
            Self::Sha2_256 => "sha2-256",
        }
    }

    /// Digest `data` with this function.
    pub fn digest(self, data: &[u8]) -> [u8; DIGEST_LEN] {
        match self {
            Self::Blake3 => *blake3::hash(data).as_bytes(),
            Self::Sha2_256 => Sha256::digest(data).into(),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "blake3" => Ok(Self::Blake3),
            "sha2-256" | "sha256" => Ok(Self::Sha2_256),
            _ => Err(TypeError::UnknownHashName(s.to_string())),
        }
    }
}
