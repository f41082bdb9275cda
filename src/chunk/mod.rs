//! Chunk types.
//!
//! - [`Chunk`] - Hashed run of source bytes, the unit of deduplication
//! - [`ChunkHash`] - 32-byte BLAKE3 content hash

mod data;
mod hash;

pub use data::Chunk;
pub use hash::ChunkHash;
