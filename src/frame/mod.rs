//! Wire format for coded frames.
//!
//! Every frame is a 5-byte header followed by an opcode-specific payload:
//!
//! ```text
//! +--------+----------------+---------------------------------------+
//! | opcode | length (u32 BE)| payload (length bytes)                |
//! +--------+----------------+---------------------------------------+
//!   0x01     n                Escape:    literal bytes (n >= 1)
//!   0x02     32 + n           Declare:   hash[32] ++ literal bytes (n >= 1)
//!   0x03     32               Reference: hash[32]
//! ```
//!
//! The layout is identical in both directions. Length rules are checked as
//! soon as the header is visible, before any payload is buffered, so a
//! corrupt length cannot make the decoder wait on gigabytes.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::chunk::ChunkHash;
use crate::error::ProtocolError;

/// Largest literal payload a single frame may carry (16 MiB).
pub const MAX_PAYLOAD_LEN: usize = 16 * 1024 * 1024;

/// Size of the opcode + length header.
pub const HEADER_LEN: usize = 5;

/// Frame opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Literal bytes, no deduplication.
    Escape = 0x01,
    /// First sighting of a chunk: hash and content.
    Declare = 0x02,
    /// Later sighting of a chunk: hash only.
    Reference = 0x03,
}

impl Opcode {
    /// Checks a length field against this opcode's rules.
    fn check_length(self, length: u32) -> Result<(), ProtocolError> {
        let len = length as usize;
        let ok = match self {
            Opcode::Escape => (1..=MAX_PAYLOAD_LEN).contains(&len),
            Opcode::Declare => (ChunkHash::SIZE + 1..=ChunkHash::SIZE + MAX_PAYLOAD_LEN).contains(&len),
            Opcode::Reference => len == ChunkHash::SIZE,
        };
        if ok {
            Ok(())
        } else {
            Err(ProtocolError::InvalidLength {
                opcode: self as u8,
                length,
            })
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x01 => Ok(Opcode::Escape),
            0x02 => Ok(Opcode::Declare),
            0x03 => Ok(Opcode::Reference),
            other => Err(ProtocolError::UnknownOpcode(other)),
        }
    }
}

/// A single transmissible unit of the coded stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Literal payload.
    Escape(Bytes),
    /// First sighting of a chunk.
    Declare {
        /// Content hash of `data`.
        hash: ChunkHash,
        /// Chunk content.
        data: Bytes,
    },
    /// Back-reference to a declared chunk.
    Reference(ChunkHash),
}

impl Frame {
    /// Returns the frame's opcode.
    pub fn opcode(&self) -> Opcode {
        match self {
            Frame::Escape(_) => Opcode::Escape,
            Frame::Declare { .. } => Opcode::Declare,
            Frame::Reference(_) => Opcode::Reference,
        }
    }

    /// Returns the total encoded size including the header.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN
            + match self {
                Frame::Escape(data) => data.len(),
                Frame::Declare { data, .. } => ChunkHash::SIZE + data.len(),
                Frame::Reference(_) => ChunkHash::SIZE,
            }
    }

    /// Appends the encoded frame to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        match self {
            Frame::Escape(data) => put_escape(dst, data),
            Frame::Declare { hash, data } => put_declare(dst, hash, data),
            Frame::Reference(hash) => put_reference(dst, hash),
        }
    }

    /// Removes one complete frame from the front of `src`.
    ///
    /// Returns `Ok(None)` and leaves `src` untouched if the frame is not
    /// complete yet. The payload is split off `src` without copying.
    pub fn decode(src: &mut BytesMut) -> Result<Option<Frame>, ProtocolError> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        let opcode = Opcode::try_from(src[0])?;
        let length = u32::from_be_bytes([src[1], src[2], src[3], src[4]]);
        opcode.check_length(length)?;

        let total = HEADER_LEN + length as usize;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(HEADER_LEN);
        let payload = src.split_to(length as usize).freeze();

        let frame = match opcode {
            Opcode::Escape => Frame::Escape(payload),
            Opcode::Declare => Frame::Declare {
                hash: hash_prefix(&payload),
                data: payload.slice(ChunkHash::SIZE..),
            },
            Opcode::Reference => Frame::Reference(hash_prefix(&payload)),
        };
        Ok(Some(frame))
    }
}

/// Reads the leading hash of a payload whose length was already checked.
fn hash_prefix(payload: &[u8]) -> ChunkHash {
    let mut bytes = [0u8; ChunkHash::SIZE];
    bytes.copy_from_slice(&payload[..ChunkHash::SIZE]);
    ChunkHash::new(bytes)
}

fn put_header(dst: &mut BytesMut, opcode: Opcode, length: usize) {
    debug_assert!(opcode.check_length(length as u32).is_ok());
    dst.reserve(HEADER_LEN + length);
    dst.put_u8(opcode as u8);
    dst.put_u32(length as u32);
}

/// Appends an Escape frame carrying `data`.
pub(crate) fn put_escape(dst: &mut BytesMut, data: &[u8]) {
    put_header(dst, Opcode::Escape, data.len());
    dst.put_slice(data);
}

/// Appends a Declare frame for `data` under `hash`.
pub(crate) fn put_declare(dst: &mut BytesMut, hash: &ChunkHash, data: &[u8]) {
    put_header(dst, Opcode::Declare, ChunkHash::SIZE + data.len());
    dst.put_slice(hash.as_bytes());
    dst.put_slice(data);
}

/// Appends a Reference frame for `hash`.
pub(crate) fn put_reference(dst: &mut BytesMut, hash: &ChunkHash) {
    put_header(dst, Opcode::Reference, ChunkHash::SIZE);
    dst.put_slice(hash.as_bytes());
}
