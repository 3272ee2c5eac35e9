use bytes::Bytes;
use blockrepo_types::{Cid, Codec};

use crate::error::{StoreError, StoreResult};

/// An immutable (identifier, payload) pair.
///
/// Blocks built with [`Block::new`] or [`Block::with_codec`] are valid by
/// construction. [`Block::from_parts`] checks the pairing eagerly, while
/// [`Block::new_unchecked`] defers the check to the store, which refuses to
/// persist a block whose identifier does not match its payload.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Block {
    cid: Cid,
    data: Bytes,
}

impl Block {
    /// Build a block, deriving its identifier with the default codec.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self::with_codec(&Codec::default(), data)
    }

    /// Build a block, deriving its identifier with `codec`.
    pub fn with_codec(codec: &Codec, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let cid = codec.derive(&data);
        Self { cid, data }
    }

    /// Pair an identifier with a payload, verifying that they match.
    pub fn from_parts(cid: Cid, data: impl Into<Bytes>) -> StoreResult<Self> {
        let block = Self::new_unchecked(cid, data);
        block.verify()?;
        Ok(block)
    }

    /// Pair an identifier with a payload without checking them.
    pub fn new_unchecked(cid: Cid, data: impl Into<Bytes>) -> Self {
        Self {
            cid,
            data: data.into(),
        }
    }

    pub fn cid(&self) -> &Cid {
        &self.cid
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_parts(self) -> (Cid, Bytes) {
        (self.cid, self.data)
    }

    /// Check that the identifier is the digest of the payload.
    pub fn verify(&self) -> StoreResult<()> {
        if self.cid.matches(&self.data) {
            Ok(())
        } else {
            Err(StoreError::InvalidBlock {
                cid: self.cid,
                reason: format!(
                    "payload of {} bytes hashes to {}",
                    self.data.len(),
                    Cid::derive(self.cid.algorithm(), &self.data)
                ),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockrepo_types::HashAlgorithm;

    #[test]
    fn new_derives_matching_cid() {
        let block = Block::new(&b"hello world"[..]);
        assert_eq!(block.cid(), &Codec::default().derive(b"hello world"));
        assert!(block.verify().is_ok());
    }

    #[test]
    fn with_codec_respects_algorithm() {
        let block = Block::with_codec(&Codec::SHA2_256, &b"hello"[..]);
        assert_eq!(block.cid().algorithm(), HashAlgorithm::Sha2_256);
    }

    #[test]
    fn empty_payload_is_valid() {
        let block = Block::new(Bytes::new());
        assert!(block.is_empty());
        assert!(block.verify().is_ok());
    }

    #[test]
    fn from_parts_rejects_mismatch() {
        let cid = Codec::default().derive(b"one");
        let err = Block::from_parts(cid, &b"two"[..]).unwrap_err();
        assert!(matches!(err, StoreError::InvalidBlock { .. }));
    }

    #[test]
    fn from_parts_accepts_match() {
        let cid = Codec::SHA2_256.derive(b"same");
        let block = Block::from_parts(cid, &b"same"[..]).unwrap();
        assert_eq!(block.len(), 4);
    }

    #[test]
    fn unchecked_block_fails_verify() {
        let cid = Codec::default().derive(b"claimed");
        let block = Block::new_unchecked(cid, &b"actual"[..]);
        assert!(block.verify().is_err());
    }

    #[test]
    fn equality_is_by_value() {
        let a = Block::new(vec![1u8, 2, 3]);
        let b = Block::new(vec![1u8, 2, 3]);
        assert_eq!(a, b);
        let (cid, data) = a.into_parts();
        assert_eq!(&cid, b.cid());
        assert_eq!(&data[..], &[1, 2, 3]);
    }
}
