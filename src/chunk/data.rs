//! The Chunk type - a hashed run of source bytes.

use bytes::Bytes;
use std::fmt;

use super::ChunkHash;
use crate::hash::Blake3Hasher;

/// A chunk of source bytes together with its content hash.
///
/// Chunks are immutable: the hash is always the BLAKE3 digest of `data`,
/// which is what lets both peers key their caches identically.
///
/// # Example
///
/// ```
/// use xcodec::Chunk;
/// use bytes::Bytes;
///
/// let chunk = Chunk::new(Bytes::from_static(b"hello world"));
/// assert_eq!(chunk.len(), 11);
/// assert!(chunk.verify(&chunk.hash()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    data: Bytes,
    hash: ChunkHash,
}

impl Chunk {
    /// Creates a chunk, hashing its data.
    pub fn new(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let hash = Blake3Hasher::hash(&data);
        Self { data, hash }
    }

    /// Creates a chunk from data whose hash is already known.
    pub(crate) fn from_parts(data: Bytes, hash: ChunkHash) -> Self {
        debug_assert_eq!(Blake3Hasher::hash(&data), hash);
        Self { data, hash }
    }

    /// Returns the length of the chunk data.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the chunk has no data.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns a reference to the chunk data.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Returns the content hash.
    pub fn hash(&self) -> ChunkHash {
        self.hash
    }

    /// Returns true if `claimed` is this chunk's content hash.
    pub fn verify(&self, claimed: &ChunkHash) -> bool {
        self.hash == *claimed
    }

    /// Splits the chunk into (data, hash).
    pub fn into_parts(self) -> (Bytes, ChunkHash) {
        (self.data, self.hash)
    }
}

impl From<Bytes> for Chunk {
    fn from(data: Bytes) -> Self {
        Self::new(data)
    }
}

impl From<Vec<u8>> for Chunk {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Chunk({} bytes, hash={})", self.len(), self.hash)
    }
}
