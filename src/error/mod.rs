//! Error types for xcodec.
//!
//! Errors fall into four groups:
//!
//! - [`ProtocolError`] - malformed frames or handshakes, fatal to the stream
//! - [`CodecError::CacheDesync`] - a reference the local cache cannot resolve, fatal
//! - [`CacheError::Capacity`] - a chunk that cannot fit, absorbed by the encoder
//! - [`CodecError::InvalidConfig`] - rejected before any bytes are exchanged

use thiserror::Error;
use uuid::Uuid;

use crate::chunk::ChunkHash;

/// Convenience alias used throughout the crate.
pub type Result<T, E = CodecError> = std::result::Result<T, E>;

/// Errors produced by the encoder, decoder, cache and handshake.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The peer sent bytes that do not form a valid frame.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A reference named a hash the local cache does not hold.
    ///
    /// The two caches have diverged and cannot be repaired mid-stream.
    #[error("cache desync: no entry for {hash}")]
    CacheDesync {
        /// The unresolved hash.
        hash: ChunkHash,
    },

    /// A cache operation failed.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Invalid configuration parameter.
    #[error("invalid config: {message}")]
    InvalidConfig {
        /// Description of what was invalid.
        message: &'static str,
    },

    /// The peer runs a different cache generation.
    #[error("cache epoch mismatch: local {local}, remote {remote}")]
    EpochMismatch {
        /// Our epoch.
        local: Uuid,
        /// The epoch the peer announced.
        remote: Uuid,
    },

    /// The peer speaks a different protocol version.
    #[error("protocol version mismatch: local {local}, remote {remote}")]
    VersionMismatch {
        /// Our version.
        local: u8,
        /// The version the peer announced.
        remote: u8,
    },

    /// The peer's [`Hello`](crate::Hello) has not been accepted yet.
    #[error("peer handshake not accepted")]
    HandshakeRequired,

    /// The stream was already flushed or failed.
    #[error("codec stream terminated")]
    Terminated,

    /// An I/O error occurred while reading input data.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodecError {
    /// Returns true if the connection must be torn down.
    ///
    /// Only capacity pressure is recoverable; the encoder absorbs it by
    /// falling back to literal frames.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, CodecError::Cache(CacheError::Capacity { .. }))
    }
}

/// Malformed wire input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The frame opcode is not Escape, Declare or Reference.
    #[error("unknown opcode {0:#04x}")]
    UnknownOpcode(u8),

    /// The length field is inconsistent with the opcode.
    #[error("invalid length {length} for opcode {opcode:#04x}")]
    InvalidLength {
        /// Opcode of the offending frame.
        opcode: u8,
        /// Length field as received.
        length: u32,
    },

    /// A declared chunk does not hash to the hash it was declared under.
    #[error("declared hash {declared} does not match content hash {actual}")]
    HashMismatch {
        /// Hash carried by the frame.
        declared: ChunkHash,
        /// Hash of the carried bytes.
        actual: ChunkHash,
    },

    /// The stream ended in the middle of a frame.
    #[error("stream ended with {pending} bytes of an incomplete frame")]
    TruncatedFrame {
        /// Bytes left over.
        pending: usize,
    },

    /// The handshake did not start with the protocol magic.
    #[error("bad handshake magic")]
    BadMagic,

    /// The handshake had the wrong size.
    #[error("bad handshake length {0}")]
    BadHello(usize),
}

/// Chunk cache failures.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The chunk cannot fit even in an empty cache.
    #[error("chunk of {needed} bytes exceeds cache budget of {budget}")]
    Capacity {
        /// Size of the chunk.
        needed: usize,
        /// Budget it was measured against.
        budget: usize,
    },

    /// The disk backend failed.
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),
}
