use crate::cid::Cid;
use crate::error::TypeError;
use crate::multihash::HashAlgorithm;

/// Namespace under which block payloads live in the blob backend.
const BLOCK_NAMESPACE: &str = "blocks/";

/// Identifier codec: derives identifiers from payloads and maps them to
/// backend keys.
///
/// Key derivation is a pure function of the identifier, so two writers of the
/// same content always target the same key without coordinating.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Codec {
    algorithm: HashAlgorithm,
}

impl Codec {
    /// Codec using BLAKE3.
    pub const BLAKE3: Self = Self {
        algorithm: HashAlgorithm::Blake3,
    };
    /// Codec using SHA2-256.
    pub const SHA2_256: Self = Self {
        algorithm: HashAlgorithm::Sha2_256,
    };

    pub const fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    /// The hash function used for newly derived identifiers.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Derive the identifier of `payload`.
    pub fn derive(&self, payload: &[u8]) -> Cid {
        Cid::derive(self.algorithm, payload)
    }

    /// Backend key for `cid`.
    pub fn storage_key(cid: &Cid) -> String {
        format!("{BLOCK_NAMESPACE}{}", cid.to_hex())
    }

    /// Inverse of [`Codec::storage_key`].
    pub fn from_storage_key(key: &str) -> Result<Cid, TypeError> {
        let hex = key
            .strip_prefix(BLOCK_NAMESPACE)
            .ok_or_else(|| TypeError::ForeignKey(key.to_string()))?;
        Cid::from_hex(hex)
    }

    /// Decode a binary identifier.
    pub fn parse(bytes: &[u8]) -> Result<Cid, TypeError> {
        Cid::from_bytes(bytes)
    }

    /// Returns `true` if `key` belongs to the block namespace.
    pub fn is_block_key(key: &str) -> bool {
        key.starts_with(BLOCK_NAMESPACE)
    }

    /// The block namespace prefix, for listing.
    pub fn namespace() -> &'static str {
        BLOCK_NAMESPACE
    }
}

/// A value that can be interpreted as a [`Cid`].
///
/// Lets store operations accept an already-parsed identifier, its text form,
/// or its binary form. Anything malformed surfaces as a [`TypeError`].
pub trait ToCid {
    fn to_cid(&self) -> Result<Cid, TypeError>;
}

impl ToCid for Cid {
    fn to_cid(&self) -> Result<Cid, TypeError> {
        Ok(*self)
    }
}

impl ToCid for str {
    fn to_cid(&self) -> Result<Cid, TypeError> {
        self.parse()
    }
}

impl ToCid for String {
    fn to_cid(&self) -> Result<Cid, TypeError> {
        self.as_str().parse()
    }
}

impl ToCid for [u8] {
    fn to_cid(&self) -> Result<Cid, TypeError> {
        Cid::from_bytes(self)
    }
}

impl ToCid for Vec<u8> {
    fn to_cid(&self) -> Result<Cid, TypeError> {
        Cid::from_bytes(self)
    }
}

impl<T: ToCid + ?Sized> ToCid for &T {
    fn to_cid(&self) -> Result<Cid, TypeError> {
        (**self).to_cid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_codec_is_blake3() {
        assert_eq!(Codec::default().algorithm(), HashAlgorithm::Blake3);
    }

    #[test]
    fn storage_key_roundtrip() {
        let cid = Codec::SHA2_256.derive(b"hello world");
        let key = Codec::storage_key(&cid);
        assert!(key.starts_with("blocks/"));
        assert!(Codec::is_block_key(&key));
        assert_eq!(Codec::from_storage_key(&key).unwrap(), cid);
    }

    #[test]
    fn storage_key_is_one_to_one() {
        let a = Codec::BLAKE3.derive(b"a");
        let b = Codec::BLAKE3.derive(b"b");
        assert_ne!(Codec::storage_key(&a), Codec::storage_key(&b));
    }

    #[test]
    fn foreign_keys_are_rejected() {
        assert!(matches!(
            Codec::from_storage_key("config"),
            Err(TypeError::ForeignKey(_))
        ));
    }

    #[test]
    fn to_cid_accepts_every_form() {
        let cid = Codec::BLAKE3.derive(b"forms");
        let text = cid.to_string();
        let bytes = cid.to_bytes();
        assert_eq!(cid.to_cid().unwrap(), cid);
        assert_eq!(text.as_str().to_cid().unwrap(), cid);
        assert_eq!(text.to_cid().unwrap(), cid);
        assert_eq!(bytes.as_slice().to_cid().unwrap(), cid);
        assert_eq!(Codec::parse(&bytes).unwrap(), cid);
    }

    #[test]
    fn to_cid_rejects_malformed() {
        assert!("woot".to_cid().is_err());
        assert!(vec![1u8, 2, 3].to_cid().is_err());
    }
}
