//! The codec: encoder, decoder, handshake, and the per-connection pair.
//!
//! - [`Encoder`] - raw bytes to frames, one direction
//! - [`Decoder`] - frames to raw bytes, one direction
//! - [`Hello`] - handshake carrying version and cache epoch
//! - [`Codec`] - one encoder and one decoder sharing a configuration

mod decoder;
mod encoder;
mod hello;
mod state;

pub use decoder::Decoder;
pub use encoder::Encoder;
pub use hello::{HELLO_LEN, HELLO_MAGIC, Hello, PROTOCOL_VERSION};
pub use state::{FrameCounts, StreamState};

use bytes::BytesMut;

use crate::cache::{CacheEpoch, ChunkCache};
use crate::config::{CacheBacking, CodecConfig};
use crate::error::{CodecError, Result};

/// Byte counters kept when [`CodecConfig::counting`] is enabled.
///
/// "Request" is the direction this endpoint encodes, "response" the
/// direction it decodes. Calls that fail are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CodecStats {
    /// Raw bytes handed to the encoder.
    pub request_input_bytes: u64,
    /// Coded bytes the encoder produced.
    pub request_output_bytes: u64,
    /// Coded bytes handed to the decoder.
    pub response_input_bytes: u64,
    /// Raw bytes the decoder produced.
    pub response_output_bytes: u64,
}

impl CodecStats {
    /// Raw bytes the encoder kept off the wire. Negative when framing
    /// overhead outweighed deduplication.
    pub fn request_saved_bytes(&self) -> i64 {
        self.request_input_bytes as i64 - self.request_output_bytes as i64
    }
}

/// Encoder and decoder for one connection.
///
/// Each half owns a separate cache. With a disk backing they live in the
/// `send/` and `recv/` subdirectories of the configured root, each in a
/// directory of its own, so any number of codecs may share one config.
///
/// [`encode`](Codec::encode) and [`decode`](Codec::decode) refuse to run
/// until the peer's [`Hello`] has been [`accept`](Codec::accept)ed. The
/// halves returned by [`into_parts`](Codec::into_parts) carry no such check.
///
/// # Example
///
/// ```
/// use bytes::BytesMut;
/// use xcodec::{CacheConfig, CacheEpoch, ChunkConfig, Codec, CodecConfig};
///
/// let epoch = CacheEpoch::generate();
/// let config = CodecConfig::new(ChunkConfig::default(), CacheConfig::memory(epoch))?;
///
/// let mut local = Codec::new(config.clone())?;
/// let mut remote = Codec::new(config)?;
/// local.accept(&remote.hello())?;
/// remote.accept(&local.hello())?;
///
/// let mut wire = BytesMut::new();
/// local.encode(b"some request bytes", &mut wire)?;
/// local.flush(&mut wire);
///
/// let mut plain = BytesMut::new();
/// remote.decode(&wire, &mut plain)?;
/// remote.finish()?;
/// assert_eq!(&plain[..], b"some request bytes");
/// # Ok::<(), xcodec::CodecError>(())
/// ```
#[derive(Debug)]
pub struct Codec {
    encoder: Encoder,
    decoder: Decoder,
    config: CodecConfig,
    stats: Option<CodecStats>,
    peer_accepted: bool,
}

impl Codec {
    /// Builds a codec pair from a validated configuration.
    ///
    /// # Errors
    ///
    /// [`CodecError::InvalidConfig`](crate::CodecError::InvalidConfig) if the
    /// configuration is invalid, or a cache error if a disk cache cannot be
    /// opened.
    pub fn new(config: CodecConfig) -> Result<Self> {
        config.validate()?;
        let cache = config.cache_config();

        let (send, recv) = match &cache.backing {
            CacheBacking::Memory => (
                ChunkCache::memory(cache.capacity, cache.epoch),
                ChunkCache::memory(cache.capacity, cache.epoch),
            ),
            CacheBacking::Disk { root } => (
                ChunkCache::disk(root.join("send"), cache.capacity, cache.epoch)?,
                ChunkCache::disk(root.join("recv"), cache.capacity, cache.epoch)?,
            ),
        };

        let encoder = Encoder::new(*config.chunk_config(), send)?;
        let decoder = Decoder::new(recv);
        tracing::debug!(
            epoch = %cache.epoch,
            backing = ?cache.backing,
            counting = config.counting(),
            "codec created"
        );

        Ok(Self {
            encoder,
            decoder,
            stats: config.counting().then(CodecStats::default),
            config,
            peer_accepted: false,
        })
    }

    /// Returns our handshake.
    pub fn hello(&self) -> Hello {
        Hello::new(self.epoch())
    }

    /// Checks the peer's handshake and, if it matches, unlocks
    /// [`encode`](Codec::encode) and [`decode`](Codec::decode).
    ///
    /// A refused handshake locks them again.
    pub fn accept(&mut self, peer: &Hello) -> Result<()> {
        let result = peer.accept(&self.epoch());
        self.peer_accepted = result.is_ok();
        if let Err(e) = &result {
            tracing::warn!(error = %e, "peer handshake refused");
        }
        result
    }

    /// Returns true once a peer handshake has been accepted.
    pub fn is_accepted(&self) -> bool {
        self.peer_accepted
    }

    fn ensure_accepted(&self) -> Result<()> {
        if self.peer_accepted {
            Ok(())
        } else {
            Err(CodecError::HandshakeRequired)
        }
    }

    /// Encodes outgoing bytes. See [`Encoder::encode`].
    ///
    /// # Errors
    ///
    /// [`CodecError::HandshakeRequired`] before a successful
    /// [`accept`](Codec::accept), otherwise as [`Encoder::encode`].
    pub fn encode(&mut self, input: &[u8], output: &mut BytesMut) -> Result<()> {
        self.ensure_accepted()?;
        let before = output.len();
        self.encoder.encode(input, output)?;
        if let Some(stats) = &mut self.stats {
            stats.request_input_bytes += input.len() as u64;
            stats.request_output_bytes += (output.len() - before) as u64;
        }
        Ok(())
    }

    /// Ends the outgoing stream. See [`Encoder::flush`].
    pub fn flush(&mut self, output: &mut BytesMut) -> bool {
        let before = output.len();
        let wrote = self.encoder.flush(output);
        if let Some(stats) = &mut self.stats {
            stats.request_output_bytes += (output.len() - before) as u64;
        }
        wrote
    }

    /// Decodes incoming frames. See [`Decoder::decode`].
    ///
    /// # Errors
    ///
    /// [`CodecError::HandshakeRequired`] before a successful
    /// [`accept`](Codec::accept), otherwise as [`Decoder::decode`].
    pub fn decode(&mut self, input: &[u8], output: &mut BytesMut) -> Result<()> {
        self.ensure_accepted()?;
        let before = output.len();
        self.decoder.decode(input, output)?;
        if let Some(stats) = &mut self.stats {
            stats.response_input_bytes += input.len() as u64;
            stats.response_output_bytes += (output.len() - before) as u64;
        }
        Ok(())
    }

    /// Ends the incoming stream. See [`Decoder::finish`].
    pub fn finish(&mut self) -> Result<()> {
        self.decoder.finish()
    }

    /// Returns the traffic counters, or `None` if counting is disabled.
    pub fn stats(&self) -> Option<&CodecStats> {
        self.stats.as_ref()
    }

    /// Returns the cache epoch.
    pub fn epoch(&self) -> CacheEpoch {
        self.config.cache_config().epoch
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Returns the encoder.
    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    /// Returns the encoder mutably.
    pub fn encoder_mut(&mut self) -> &mut Encoder {
        &mut self.encoder
    }

    /// Returns the decoder.
    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    /// Returns the decoder mutably.
    pub fn decoder_mut(&mut self) -> &mut Decoder {
        &mut self.decoder
    }

    /// Splits the pair, e.g. to drive each direction from its own task.
    ///
    /// Check the peer's handshake first; the halves do not.
    pub fn into_parts(self) -> (Encoder, Decoder) {
        (self.encoder, self.decoder)
    }
}
