//! Content-addressable chunk cache.
//!
//! Each side of a connection keeps its own cache. The encoder fills its
//! cache as it declares chunks, and the decoder fills its cache from the
//! Declare frames it receives, in the same order. Both caches must therefore
//! evict the same entries at the same moments. That only works if eviction
//! depends on nothing but the insert sequence:
//!
//! - eviction is least-recently-**inserted** (FIFO);
//! - [`ChunkCache::lookup`] and [`ChunkCache::contains`] never reorder
//!   entries;
//! - the FIFO index and byte accounting live here, above the backing
//!   [`Store`], so memory and disk caches behave identically.
//!
//! - [`ChunkCache`] - bounded FIFO cache over a memory or disk store
//! - [`CacheEpoch`] - cache generation identifier
//! - [`Insert`] - outcome of an insert, including evicted hashes

mod epoch;
mod store;

pub use epoch::CacheEpoch;

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::io;
use std::path::Path;

use bytes::Bytes;

use crate::chunk::ChunkHash;
use crate::config::{CacheBacking, CacheCapacity, CacheConfig};
use crate::error::{CacheError, Result};
use store::{DiskStore, Store};

/// Outcome of [`ChunkCache::insert`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Insert {
    /// False if the hash was already resident; the cache is then unchanged.
    pub inserted: bool,

    /// Hashes evicted to make room, oldest first.
    pub evicted: Vec<ChunkHash>,
}

/// A bounded chunk cache with deterministic FIFO eviction.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use xcodec::{CacheCapacity, CacheEpoch, Chunk, ChunkCache};
///
/// let mut cache = ChunkCache::memory(CacheCapacity::entries(2), CacheEpoch::generate());
///
/// let a = Chunk::new(Bytes::from_static(b"AAAA"));
/// let b = Chunk::new(Bytes::from_static(b"BBBB"));
/// let c = Chunk::new(Bytes::from_static(b"CCCC"));
///
/// cache.insert(a.hash(), a.data().clone())?;
/// cache.insert(b.hash(), b.data().clone())?;
/// let outcome = cache.insert(c.hash(), c.data().clone())?;
///
/// assert_eq!(outcome.evicted, vec![a.hash()]);
/// assert!(!cache.contains(&a.hash()));
/// # Ok::<(), xcodec::CodecError>(())
/// ```
pub struct ChunkCache {
    store: Store,
    /// Resident hashes and their lengths.
    index: HashMap<ChunkHash, usize>,
    /// Insertion order, oldest at the front.
    order: VecDeque<ChunkHash>,
    bytes_used: usize,
    capacity: CacheCapacity,
    epoch: CacheEpoch,
}

impl ChunkCache {
    fn with_store(store: Store, capacity: CacheCapacity, epoch: CacheEpoch) -> Self {
        Self {
            store,
            index: HashMap::new(),
            order: VecDeque::new(),
            bytes_used: 0,
            capacity,
            epoch,
        }
    }

    /// Creates an empty in-memory cache.
    pub fn memory(capacity: CacheCapacity, epoch: CacheEpoch) -> Self {
        Self::with_store(Store::memory(), capacity, epoch)
    }

    /// Opens an empty disk-backed cache in a new directory under
    /// `root/<epoch>/`.
    ///
    /// Every call gets its own directory, so several caches may share one
    /// root and epoch. The directory is removed when the cache is dropped.
    pub fn disk(root: impl AsRef<Path>, capacity: CacheCapacity, epoch: CacheEpoch) -> Result<Self> {
        let store = DiskStore::open(root.as_ref(), &epoch).map_err(CacheError::Io)?;
        Ok(Self::with_store(Store::Disk(store), capacity, epoch))
    }

    /// Validates `config` and builds the cache it describes.
    pub fn open(config: &CacheConfig) -> Result<Self> {
        config.validate()?;
        match &config.backing {
            CacheBacking::Memory => Ok(Self::memory(config.capacity, config.epoch)),
            CacheBacking::Disk { root } => Self::disk(root, config.capacity, config.epoch),
        }
    }

    /// Returns true if `hash` is resident.
    pub fn contains(&self, hash: &ChunkHash) -> bool {
        self.index.contains_key(hash)
    }

    /// Returns the bytes for `hash`, if resident.
    ///
    /// Lookups have no side effects; in particular they do not protect an
    /// entry from eviction.
    ///
    /// # Errors
    ///
    /// [`CacheError::Io`] if the store cannot be read, or if it no longer
    /// holds a chunk the index says is resident.
    pub fn lookup(&self, hash: &ChunkHash) -> Result<Option<Bytes>, CacheError> {
        if !self.contains(hash) {
            return Ok(None);
        }
        match self.store.get(hash)? {
            Some(data) => Ok(Some(data)),
            None => Err(CacheError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("chunk {hash} missing from {} store", self.store.kind()),
            ))),
        }
    }

    /// Inserts a chunk, evicting the oldest entries until it fits.
    ///
    /// Re-inserting a resident hash is a no-op and keeps its position.
    ///
    /// # Errors
    ///
    /// [`CacheError::Capacity`] if the chunk could not fit even in an empty
    /// cache; nothing is evicted in that case. [`CacheError::Io`] if the
    /// disk store fails.
    pub fn insert(&mut self, hash: ChunkHash, data: Bytes) -> Result<Insert, CacheError> {
        if self.contains(&hash) {
            return Ok(Insert::default());
        }

        let len = data.len();
        if !self.capacity.admits(len) {
            return Err(CacheError::Capacity {
                needed: len,
                budget: self.capacity.max_bytes.unwrap_or(0),
            });
        }

        let mut evicted = Vec::new();
        while self.needs_room(len) {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            let old_len = self.index.remove(&oldest).unwrap_or(0);
            self.bytes_used -= old_len;
            self.store.remove(&oldest)?;
            tracing::trace!(hash = %oldest, len = old_len, "chunk evicted");
            evicted.push(oldest);
        }

        self.store.put(hash, data)?;
        self.index.insert(hash, len);
        self.order.push_back(hash);
        self.bytes_used += len;
        tracing::trace!(hash = %hash, len, entries = self.order.len(), "chunk cached");

        Ok(Insert {
            inserted: true,
            evicted,
        })
    }

    fn needs_room(&self, incoming: usize) -> bool {
        let over_entries = self
            .capacity
            .max_entries
            .is_some_and(|max| self.order.len() >= max);
        let over_bytes = self
            .capacity
            .max_bytes
            .is_some_and(|max| self.bytes_used + incoming > max);
        over_entries || over_bytes
    }

    /// Drops every entry.
    pub fn clear(&mut self) -> Result<(), CacheError> {
        self.store.clear()?;
        self.index.clear();
        self.order.clear();
        self.bytes_used = 0;
        Ok(())
    }

    /// Resident hashes, oldest first. This is the order they will be evicted in.
    pub fn hashes(&self) -> impl Iterator<Item = &ChunkHash> + '_ {
        self.order.iter()
    }

    /// Number of resident chunks.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if no chunk is resident.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Total bytes of resident chunk data.
    pub fn bytes_used(&self) -> usize {
        self.bytes_used
    }

    /// The configured bounds.
    pub fn capacity(&self) -> &CacheCapacity {
        &self.capacity
    }

    /// The cache generation.
    pub fn epoch(&self) -> &CacheEpoch {
        &self.epoch
    }

    /// Directory holding chunk files, for a disk-backed cache.
    pub fn directory(&self) -> Option<&Path> {
        match &self.store {
            Store::Disk(disk) => Some(disk.dir()),
            Store::Memory(_) => None,
        }
    }
}

impl fmt::Debug for ChunkCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkCache")
            .field("backing", &self.store.kind())
            .field("entries", &self.order.len())
            .field("bytes_used", &self.bytes_used)
            .field("capacity", &self.capacity)
            .field("epoch", &self.epoch)
            .finish()
    }
}
