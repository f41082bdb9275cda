//! Connection handshake.
//!
//! Before any frame flows, each side sends one `Hello`:
//!
//! ```text
//! +------------+---------+--------------------+
//! | "XCDC" (4) | ver (1) | cache epoch (16)   |
//! +------------+---------+--------------------+
//! ```
//!
//! A peer whose version or epoch differs is refused. Reference frames are
//! only meaningful between caches of the same generation.

use bytes::{Buf, BufMut, BytesMut};

use crate::cache::CacheEpoch;
use crate::error::{CodecError, ProtocolError, Result};

/// Magic prefix of the handshake.
pub const HELLO_MAGIC: [u8; 4] = *b"XCDC";

/// Wire protocol version spoken by this crate.
pub const PROTOCOL_VERSION: u8 = 1;

/// Encoded size of a [`Hello`].
pub const HELLO_LEN: usize = 4 + 1 + 16;

/// Handshake message announcing protocol version and cache epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hello {
    /// Protocol version.
    pub version: u8,
    /// Cache epoch of the sender.
    pub epoch: CacheEpoch,
}

impl Hello {
    /// Creates a hello for `epoch` at the current protocol version.
    pub fn new(epoch: CacheEpoch) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            epoch,
        }
    }

    /// Appends the encoded hello to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(HELLO_LEN);
        dst.put_slice(&HELLO_MAGIC);
        dst.put_u8(self.version);
        dst.put_slice(self.epoch.as_bytes());
    }

    /// Returns the encoded hello.
    pub fn to_bytes(&self) -> [u8; HELLO_LEN] {
        let mut out = [0u8; HELLO_LEN];
        out[..4].copy_from_slice(&HELLO_MAGIC);
        out[4] = self.version;
        out[5..].copy_from_slice(self.epoch.as_bytes());
        out
    }

    /// Parses a complete hello.
    pub fn from_bytes(src: &[u8]) -> Result<Self, ProtocolError> {
        if src.len() != HELLO_LEN {
            return Err(ProtocolError::BadHello(src.len()));
        }
        Self::parse(src)
    }

    /// Removes a hello from the front of a stream buffer.
    ///
    /// Returns `Ok(None)` until all [`HELLO_LEN`] bytes have arrived. A wrong
    /// magic is reported as soon as the first four bytes are visible.
    pub fn decode(src: &mut BytesMut) -> Result<Option<Self>, ProtocolError> {
        let visible = src.len().min(HELLO_MAGIC.len());
        if src[..visible] != HELLO_MAGIC[..visible] {
            return Err(ProtocolError::BadMagic);
        }
        if src.len() < HELLO_LEN {
            return Ok(None);
        }

        let hello = Self::parse(&src[..HELLO_LEN])?;
        src.advance(HELLO_LEN);
        Ok(Some(hello))
    }

    fn parse(src: &[u8]) -> Result<Self, ProtocolError> {
        if src[..4] != HELLO_MAGIC {
            return Err(ProtocolError::BadMagic);
        }
        let mut epoch = [0u8; 16];
        epoch.copy_from_slice(&src[5..HELLO_LEN]);
        Ok(Self {
            version: src[4],
            epoch: CacheEpoch::from_bytes(epoch),
        })
    }

    /// Checks a peer's hello against our own epoch.
    ///
    /// # Errors
    ///
    /// [`CodecError::VersionMismatch`] or [`CodecError::EpochMismatch`].
    pub fn accept(&self, local: &CacheEpoch) -> Result<()> {
        if self.version != PROTOCOL_VERSION {
            return Err(CodecError::VersionMismatch {
                local: PROTOCOL_VERSION,
                remote: self.version,
            });
        }
        local.ensure_matches(&self.epoch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let epoch = CacheEpoch::from_bytes([0xAB; 16]);
        let bytes = Hello::new(epoch).to_bytes();

        assert_eq!(&bytes[..4], b"XCDC");
        assert_eq!(bytes[4], PROTOCOL_VERSION);
        assert_eq!(&bytes[5..], &[0xAB; 16]);

        let mut buf = BytesMut::new();
        Hello::new(epoch).encode(&mut buf);
        assert_eq!(&buf[..], &bytes[..]);
    }

    #[test]
    fn test_from_bytes() {
        let hello = Hello::new(CacheEpoch::generate());
        assert_eq!(Hello::from_bytes(&hello.to_bytes()).unwrap(), hello);

        assert_eq!(
            Hello::from_bytes(&hello.to_bytes()[..20]),
            Err(ProtocolError::BadHello(20))
        );

        let mut bad = hello.to_bytes();
        bad[0] = b'Y';
        assert_eq!(Hello::from_bytes(&bad), Err(ProtocolError::BadMagic));
    }

    #[test]
    fn test_streaming_decode() {
        let hello = Hello::new(CacheEpoch::generate());
        let mut buf = BytesMut::new();

        buf.extend_from_slice(&hello.to_bytes()[..10]);
        assert_eq!(Hello::decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(&hello.to_bytes()[10..]);
        buf.extend_from_slice(b"frames");
        assert_eq!(Hello::decode(&mut buf).unwrap(), Some(hello));
        assert_eq!(&buf[..], b"frames");
    }

    #[test]
    fn test_early_bad_magic() {
        let mut buf = BytesMut::from(&b"XQ"[..]);
        assert_eq!(Hello::decode(&mut buf), Err(ProtocolError::BadMagic));
    }

    #[test]
    fn test_accept() {
        let epoch = CacheEpoch::generate();
        assert!(Hello::new(epoch).accept(&epoch).is_ok());

        let other = CacheEpoch::generate();
        assert!(matches!(
            Hello::new(other).accept(&epoch),
            Err(CodecError::EpochMismatch { .. })
        ));

        let future = Hello {
            version: PROTOCOL_VERSION + 1,
            epoch,
        };
        assert!(matches!(
            future.accept(&epoch),
            Err(CodecError::VersionMismatch { local: 1, remote: 2 })
        ));
    }
}
