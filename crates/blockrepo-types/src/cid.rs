use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;
use crate::multihash::{HashAlgorithm, DIGEST_LEN};

/// The only identifier version this crate produces or accepts.
pub const CID_VERSION: u8 = 1;

/// Payload codec tag for opaque bytes.
pub const RAW_CODEC: u8 = 0x55;

const HEADER_LEN: usize = 4;

/// Multibase prefix for lowercase base16.
const MULTIBASE_HEX: char = 'f';

/// Content identifier for a stored block.
///
/// Binary layout:
/// ```text
/// [1 byte: version][1 byte: codec][1 byte: hash code][1 byte: digest length][digest]
/// ```
///
/// The text form is the binary layout in lowercase hex behind an `f`
/// multibase prefix. Two `Cid`s are equal exactly when their bytes are.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cid {
    algorithm: HashAlgorithm,
    digest: [u8; DIGEST_LEN],
}

impl Cid {
    /// Length of the binary encoding.
    pub const ENCODED_LEN: usize = HEADER_LEN + DIGEST_LEN;

    /// Derive the identifier of `data` using `algorithm`.
    pub fn derive(algorithm: HashAlgorithm, data: &[u8]) -> Self {
        Self {
            algorithm,
            digest: algorithm.digest(data),
        }
    }

    /// Build from a precomputed digest.
    pub fn from_digest(algorithm: HashAlgorithm, digest: [u8; DIGEST_LEN]) -> Self {
        Self { algorithm, digest }
    }

    pub fn version(&self) -> u8 {
        CID_VERSION
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn digest(&self) -> &[u8; DIGEST_LEN] {
        &self.digest
    }

    /// Returns `true` if `data` hashes to this identifier.
    pub fn matches(&self, data: &[u8]) -> bool {
        self.algorithm.digest(data) == self.digest
    }

    /// Binary encoding.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::ENCODED_LEN);
        out.push(CID_VERSION);
        out.push(RAW_CODEC);
        out.push(self.algorithm.code());
        out.push(DIGEST_LEN as u8);
        out.extend_from_slice(&self.digest);
        out
    }

    /// Decode the binary encoding.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypeError> {
        if bytes.len() != Self::ENCODED_LEN {
            return Err(TypeError::InvalidLength {
                expected: Self::ENCODED_LEN,
                actual: bytes.len(),
            });
        }
        if bytes[0] != CID_VERSION {
            return Err(TypeError::UnsupportedVersion(bytes[0]));
        }
        if bytes[1] != RAW_CODEC {
            return Err(TypeError::UnsupportedCodec(bytes[1]));
        }
        let algorithm = HashAlgorithm::from_code(bytes[2])?;
        if bytes[3] as usize != DIGEST_LEN {
            return Err(TypeError::InvalidLength {
                expected: DIGEST_LEN,
                actual: bytes[3] as usize,
            });
        }
        let mut digest = [0u8; DIGEST_LEN];
        digest.copy_from_slice(&bytes[HEADER_LEN..]);
        Ok(Self { algorithm, digest })
    }

    /// Lowercase hex of the binary encoding, without the multibase prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Parse bare hex (no multibase prefix).
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Short form for logs: the first 8 hex characters of the digest.
    pub fn short(&self) -> String {
        hex::encode(&self.digest[..4])
    }
}

impl fmt::Debug for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cid({}:{})", self.algorithm, self.short())
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{MULTIBASE_HEX}{}", self.to_hex())
    }
}

impl FromStr for Cid {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix(MULTIBASE_HEX)
            .ok_or_else(|| TypeError::MissingPrefix(s.to_string()))?;
        Self::from_hex(hex)
    }
}

impl TryFrom<&[u8]> for Cid {
    type Error = TypeError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::from_bytes(bytes)
    }
}

impl Serialize for Cid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
