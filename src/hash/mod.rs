//! Strong hash implementation for chunk identity.
//!
//! Every chunk is keyed by its BLAKE3 digest. Both peers must agree on the
//! function, so it is fixed rather than configurable.
//!
//! - [`Blake3Hasher`] - incremental BLAKE3 hasher producing [`ChunkHash`](crate::ChunkHash)

mod blake3;

pub use self::blake3::Blake3Hasher;
