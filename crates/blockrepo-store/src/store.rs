use std::sync::Arc;

use blockrepo_blob::{BlobBackend, BlobError};
use blockrepo_types::{Cid, Codec, ToCid};
use tracing::{debug, warn};

use crate::block::Block;
use crate::error::{StoreError, StoreResult};

/// Summary of the blocks currently stored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockStats {
    pub count: usize,
    pub total_bytes: u64,
}

/// Content-addressed block store over a blob backend.
///
/// All operations are safe to call concurrently from many threads, for any
/// identifiers including the same one. Nothing here takes a lock: the key of
/// a block is a pure function of its identifier, and equal identifiers carry
/// equal payloads, so racing writers are write-equivalent.
#[derive(Clone)]
pub struct BlockStore {
    backend: Arc<dyn BlobBackend>,
    codec: Codec,
    verify_on_read: bool,
}

impl BlockStore {
    /// Create a store over `backend` using the default codec.
    pub fn new(backend: Arc<dyn BlobBackend>) -> Self {
        Self {
            backend,
            codec: Codec::default(),
            verify_on_read: true,
        }
    }

    /// Use `codec` for blocks built through [`BlockStore::put_bytes`].
    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    /// Toggle re-hashing of payloads on read.
    pub fn with_verify_on_read(mut self, verify: bool) -> Self {
        self.verify_on_read = verify;
        self
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// Store a block.
    ///
    /// Idempotent: storing a block that is already present and intact is a
    /// no-op. A stored entry that no longer verifies is rewritten.
    pub fn put(&self, block: &Block) -> StoreResult<()> {
        block.verify()?;
        let key = Codec::storage_key(block.cid());
        // Skip only when the stored bytes still hash to the identifier.
        match self.backend.read(&key) {
            Ok(stored) if block.cid().matches(&stored) => {
                debug!(cid = %block.cid().short(), "block already present");
                return Ok(());
            }
            Ok(_) => warn!(cid = %block.cid().short(), "replacing corrupt block"),
            Err(BlobError::NotFound { .. }) => {}
            Err(e) => return Err(e.into()),
        }
        self.backend.write(&key, block.data())?;
        debug!(cid = %block.cid().short(), size = block.len(), "block stored");
        Ok(())
    }

    /// Build a block from `data` with this store's codec and store it.
    pub fn put_bytes(&self, data: impl Into<bytes::Bytes>) -> StoreResult<Cid> {
        let block = Block::with_codec(&self.codec, data);
        self.put(&block)?;
        Ok(*block.cid())
    }

    /// Store every block in order.
    ///
    /// Stops at the first failure and returns it; blocks stored before the
    /// failure remain stored.
    pub fn put_many<'a, I>(&self, blocks: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = &'a Block>,
    {
        let mut stored = 0usize;
        for block in blocks {
            if let Err(e) = self.put(block) {
                warn!(stored, cid = %block.cid().short(), error = %e, "batch put aborted");
                return Err(e);
            }
            stored += 1;
        }
        debug!(stored, "batch put complete");
        Ok(())
    }

    /// Fetch a block by identifier.
    pub fn get<K: ToCid + ?Sized>(&self, id: &K) -> StoreResult<Block> {
        let cid = id.to_cid()?;
        let key = Codec::storage_key(&cid);
        let data = match self.backend.read(&key) {
            Ok(data) => data,
            Err(BlobError::NotFound { .. }) => return Err(StoreError::NotFound(cid)),
            Err(e) => return Err(e.into()),
        };
        if self.verify_on_read && !cid.matches(&data) {
            let computed = Cid::derive(cid.algorithm(), &data);
            warn!(cid = %cid, computed = %computed, "stored payload failed verification");
            return Err(StoreError::Corrupt { cid, computed });
        }
        Ok(Block::new_unchecked(cid, data))
    }

    /// Fetch several blocks; fails on the first missing or unreadable one.
    pub fn get_many<'a, K, I>(&self, ids: I) -> StoreResult<Vec<Block>>
    where
        K: ToCid + ?Sized + 'a,
        I: IntoIterator<Item = &'a K>,
    {
        ids.into_iter().map(|id| self.get(id)).collect()
    }

    /// Check whether a block is stored. Absence is `Ok(false)`.
    pub fn has<K: ToCid + ?Sized>(&self, id: &K) -> StoreResult<bool> {
        let cid = id.to_cid()?;
        Ok(self.backend.exists(&Codec::storage_key(&cid))?)
    }

    /// Remove a block. Removing an absent block is not an error.
    pub fn delete<K: ToCid + ?Sized>(&self, id: &K) -> StoreResult<()> {
        let cid = id.to_cid()?;
        let existed = self.backend.remove(&Codec::storage_key(&cid))?;
        debug!(cid = %cid.short(), existed, "block deleted");
        Ok(())
    }

    /// Identifiers of every stored block, sorted by storage key.
    ///
    /// Keys in the block namespace that do not decode are skipped.
    pub fn cids(&self) -> StoreResult<Vec<Cid>> {
        let keys = self.backend.keys(Codec::namespace())?;
        Ok(keys
            .iter()
            .filter_map(|key| match Codec::from_storage_key(key) {
                Ok(cid) => Some(cid),
                Err(e) => {
                    warn!(key = %key, error = %e, "skipping unrecognized block key");
                    None
                }
            })
            .collect())
    }

    /// Count and total payload size of stored blocks.
    pub fn stat(&self) -> StoreResult<BlockStats> {
        let mut stats = BlockStats::default();
        for cid in self.cids()? {
            let data = self.backend.read(&Codec::storage_key(&cid))?;
            stats.count += 1;
            stats.total_bytes += data.len() as u64;
        }
        Ok(stats)
    }
}

impl std::fmt::Debug for BlockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockStore")
            .field("backend", &self.backend)
            .field("codec", &self.codec)
            .field("verify_on_read", &self.verify_on_read)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockrepo_blob::{FsBlobBackend, InMemoryBlobBackend};
    use blockrepo_types::TypeError;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::thread;

    fn memory_store() -> (Arc<InMemoryBlobBackend>, BlockStore) {
        let backend = Arc::new(InMemoryBlobBackend::new());
        let store = BlockStore::new(backend.clone());
        (backend, store)
    }

    fn random_blocks(n: usize, tag: &str) -> Vec<Block> {
        (0..n)
            .map(|i| Block::new(format!("{tag}-{i}-{}", rand::random::<u64>()).into_bytes()))
            .collect()
    }

    // -----------------------------------------------------------------------
    // put / get
    // -----------------------------------------------------------------------

    #[test]
    fn put_and_get() {
        let (_, store) = memory_store();
        let block = Block::new(&b"hello world"[..]);
        store.put(&block).unwrap();
        assert_eq!(store.get(block.cid()).unwrap(), block);
    }

    #[test]
    fn put_twice_is_idempotent() {
        let (backend, store) = memory_store();
        let block = Block::new(&b"twice"[..]);
        store.put(&block).unwrap();
        store.put(&block).unwrap();
        assert_eq!(backend.len(), 1);
        assert_eq!(store.get(block.cid()).unwrap(), block);
    }

    #[test]
    fn empty_payload_roundtrips() {
        let (_, store) = memory_store();
        let block = Block::new(Vec::new());
        store.put(&block).unwrap();
        let back = store.get(block.cid()).unwrap();
        assert!(back.is_empty());
        assert_eq!(back, block);
    }

    #[test]
    fn put_rejects_mismatched_block() {
        let (backend, store) = memory_store();
        let cid = Codec::default().derive(b"claimed");
        let forged = Block::new_unchecked(cid, &b"actual"[..]);
        assert!(matches!(
            store.put(&forged),
            Err(StoreError::InvalidBlock { .. })
        ));
        assert!(backend.is_empty());
    }

    #[test]
    fn put_bytes_uses_store_codec() {
        let (_, store) = memory_store();
        let store = store.with_codec(Codec::SHA2_256);
        let cid = store.put_bytes(&b"sha"[..]).unwrap();
        assert_eq!(cid, Codec::SHA2_256.derive(b"sha"));
        assert!(store.has(&cid).unwrap());
    }

    #[test]
    fn get_by_text_form() {
        let (_, store) = memory_store();
        let block = Block::new(&b"by text"[..]);
        store.put(&block).unwrap();
        let text = block.cid().to_string();
        assert_eq!(store.get(text.as_str()).unwrap(), block);
    }

    #[test]
    fn get_missing_is_not_found() {
        let (_, store) = memory_store();
        let cid = Codec::default().derive(b"never stored");
        assert!(matches!(store.get(&cid), Err(StoreError::NotFound(c)) if c == cid));
    }

    #[test]
    fn get_malformed_identifier() {
        let (_, store) = memory_store();
        let err = store.get("woot").unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidIdentifier(TypeError::MissingPrefix(_))
        ));
    }

    #[test]
    fn get_detects_corruption() {
        let (backend, store) = memory_store();
        let block = Block::new(&b"pristine"[..]);
        store.put(&block).unwrap();
        backend
            .write(&Codec::storage_key(block.cid()), b"tampered")
            .unwrap();
        assert!(matches!(
            store.get(block.cid()),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn put_repairs_corrupt_entry() {
        let (backend, store) = memory_store();
        let block = Block::new(&b"pristine"[..]);
        store.put(&block).unwrap();
        backend
            .write(&Codec::storage_key(block.cid()), b"tampered")
            .unwrap();
        assert!(matches!(
            store.get(block.cid()),
            Err(StoreError::Corrupt { .. })
        ));

        store.put(&block).unwrap();
        assert_eq!(store.get(block.cid()).unwrap(), block);
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn verification_can_be_disabled() {
        let (backend, store) = memory_store();
        let store = store.with_verify_on_read(false);
        let block = Block::new(&b"pristine"[..]);
        store.put(&block).unwrap();
        backend
            .write(&Codec::storage_key(block.cid()), b"tampered")
            .unwrap();
        assert_eq!(&store.get(block.cid()).unwrap().data()[..], b"tampered");
    }

    // -----------------------------------------------------------------------
    // has / delete
    // -----------------------------------------------------------------------

    #[test]
    fn has_reports_existence() {
        let (_, store) = memory_store();
        let block = Block::new(&b"present"[..]);
        store.put(&block).unwrap();
        assert!(store.has(block.cid()).unwrap());
        let absent = Codec::default().derive(b"absent");
        assert!(!store.has(&absent).unwrap());
    }

    #[test]
    fn has_malformed_identifier_errors() {
        let (_, store) = memory_store();
        assert!(matches!(
            store.has("not-a-cid"),
            Err(StoreError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            store.has(&[1u8, 2, 3][..]),
            Err(StoreError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn delete_then_has_is_false() {
        let (_, store) = memory_store();
        let block = Block::new(&b"to delete"[..]);
        store.put(&block).unwrap();
        store.delete(block.cid()).unwrap();
        assert!(!store.has(block.cid()).unwrap());
        store.delete(block.cid()).unwrap();
    }

    // -----------------------------------------------------------------------
    // batches
    // -----------------------------------------------------------------------

    #[test]
    fn put_many_then_get_each() {
        let (_, store) = memory_store();
        let blocks = random_blocks(50, "many");
        store.put_many(&blocks).unwrap();
        let cids: Vec<Cid> = blocks.iter().map(|b| *b.cid()).collect();
        let fetched: HashSet<Block> = store.get_many(&cids).unwrap().into_iter().collect();
        let expected: HashSet<Block> = blocks.into_iter().collect();
        assert_eq!(fetched, expected);
    }

    #[test]
    fn put_many_keeps_prefix_on_failure() {
        let (backend, store) = memory_store();
        let good = random_blocks(3, "good");
        let forged = Block::new_unchecked(Codec::default().derive(b"x"), &b"y"[..]);
        let tail = Block::new(&b"never written"[..]);
        let batch = vec![good[0].clone(), good[1].clone(), forged, tail.clone()];

        assert!(matches!(
            store.put_many(&batch),
            Err(StoreError::InvalidBlock { .. })
        ));
        assert_eq!(backend.len(), 2);
        assert!(store.has(good[0].cid()).unwrap());
        assert!(store.has(good[1].cid()).unwrap());
        assert!(!store.has(tail.cid()).unwrap());
    }

    #[test]
    fn cids_and_stat() {
        let (backend, store) = memory_store();
        backend.write("config", b"{}").unwrap();
        let a = Block::new(&b"12345"[..]);
        let b = Block::new(&b"123456789"[..]);
        store.put_many([&a, &b]).unwrap();

        let cids: HashSet<Cid> = store.cids().unwrap().into_iter().collect();
        assert_eq!(cids, HashSet::from([*a.cid(), *b.cid()]));
        assert_eq!(
            store.stat().unwrap(),
            BlockStats {
                count: 2,
                total_bytes: 14
            }
        );
    }

    #[test]
    fn cids_skips_foreign_keys() {
        let (backend, store) = memory_store();
        backend.write("blocks/not-hex", b"").unwrap();
        assert!(store.cids().unwrap().is_empty());
    }

    // -----------------------------------------------------------------------
    // concurrency
    // -----------------------------------------------------------------------

    #[test]
    fn concurrent_put_same_block_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(FsBlobBackend::open(dir.path()).unwrap());
        let store = BlockStore::new(backend);
        let block = Block::new(&b"Concurrent Data"[..]);

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let store = store.clone();
                let block = block.clone();
                thread::spawn(move || store.put(&block))
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic").unwrap();
        }
        assert_eq!(store.get(block.cid()).unwrap(), block);
        assert_eq!(store.cids().unwrap(), vec![*block.cid()]);
    }

    #[test]
    fn massive_parallel_read() {
        let (_, store) = memory_store();
        let blocks = random_blocks(100, "hello");
        store.put_many(&blocks).unwrap();
        let blocks = Arc::new(blocks);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                let blocks = Arc::clone(&blocks);
                thread::spawn(move || {
                    for i in 0..250 {
                        let expected = &blocks[(t * 250 + i) % blocks.len()];
                        let got = store.get(expected.cid()).unwrap();
                        assert_eq!(got.data(), expected.data());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }
    }

    proptest! {
        #[test]
        fn any_payload_roundtrips(data in proptest::collection::vec(any::<u8>(), 0..1024)) {
            let (_, store) = memory_store();
            let block = Block::new(data);
            store.put(&block).unwrap();
            prop_assert_eq!(store.get(block.cid()).unwrap(), block);
        }
    }
}
