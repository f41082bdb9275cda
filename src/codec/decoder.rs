//! Decoder - coded frames in, raw bytes out.

use bytes::BytesMut;

use super::{FrameCounts, StreamState};
use crate::cache::ChunkCache;
use crate::chunk::Chunk;
use crate::error::{CacheError, CodecError, ProtocolError, Result};
use crate::frame::Frame;

/// Streaming decoder for one direction of a connection.
///
/// Input may be split anywhere, including inside a frame header; partial
/// frames are buffered until complete. Each complete frame is applied in
/// order:
///
/// - `Escape` appends its bytes.
/// - `Declare` checks the hash, appends the bytes and caches them.
/// - `Reference` appends the cached bytes.
///
/// Any error is fatal. The decoder then drops its buffer, enters
/// [`StreamState::Failed`] and rejects further input; the caller is expected
/// to close the connection.
#[derive(Debug)]
pub struct Decoder {
    cache: ChunkCache,
    buffer: BytesMut,
    state: StreamState,
    counts: FrameCounts,
}

impl Decoder {
    /// Creates a decoder that reads and fills `cache`.
    pub fn new(cache: ChunkCache) -> Self {
        Self {
            cache,
            buffer: BytesMut::new(),
            state: StreamState::Idle,
            counts: FrameCounts::default(),
        }
    }

    /// Consumes `input`, appending the bytes of every complete frame to `output`.
    ///
    /// Output from frames that were applied before an error stays in `output`.
    ///
    /// # Errors
    ///
    /// - [`CodecError::Protocol`] for an unknown opcode, a bad length or a hash mismatch
    /// - [`CodecError::CacheDesync`] if a reference cannot be resolved
    /// - [`CodecError::Terminated`] once the stream has finished or failed
    pub fn decode(&mut self, input: &[u8], output: &mut BytesMut) -> Result<()> {
        if self.state.is_terminal() {
            return Err(CodecError::Terminated);
        }

        self.buffer.extend_from_slice(input);
        if let Err(e) = self.drain(output) {
            self.fail(&e);
            return Err(e);
        }

        self.state = if self.buffer.is_empty() {
            StreamState::Idle
        } else {
            StreamState::Accumulating
        };
        Ok(())
    }

    fn drain(&mut self, output: &mut BytesMut) -> Result<()> {
        while let Some(frame) = Frame::decode(&mut self.buffer)? {
            self.apply(frame, output)?;
        }
        Ok(())
    }

    fn apply(&mut self, frame: Frame, output: &mut BytesMut) -> Result<()> {
        match frame {
            Frame::Escape(data) => {
                output.extend_from_slice(&data);
                self.counts.escapes += 1;
            }
            Frame::Declare { hash, data } => {
                let chunk = Chunk::new(data);
                if !chunk.verify(&hash) {
                    return Err(ProtocolError::HashMismatch {
                        declared: hash,
                        actual: chunk.hash(),
                    }
                    .into());
                }
                output.extend_from_slice(chunk.data());
                match self.cache.insert(hash, chunk.data().clone()) {
                    Ok(_) => {}
                    // The encoder only declares chunks it could cache, so a
                    // smaller local budget means the caches already differ.
                    Err(CacheError::Capacity { .. }) => return Err(CodecError::CacheDesync { hash }),
                    Err(e) => return Err(e.into()),
                }
                self.counts.declarations += 1;
            }
            Frame::Reference(hash) => {
                let data = self
                    .cache
                    .lookup(&hash)?
                    .ok_or(CodecError::CacheDesync { hash })?;
                output.extend_from_slice(&data);
                self.counts.references += 1;
            }
        }
        Ok(())
    }

    fn fail(&mut self, error: &CodecError) {
        tracing::warn!(
            error = %error,
            buffered = self.buffer.len(),
            "decode failed, dropping stream state"
        );
        self.buffer.clear();
        self.state = StreamState::Failed;
    }

    /// Signals end of input.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::TruncatedFrame`] if a partial frame is still
    /// buffered. [`CodecError::Terminated`] if the stream already failed.
    pub fn finish(&mut self) -> Result<()> {
        match self.state {
            StreamState::Failed => return Err(CodecError::Terminated),
            StreamState::Terminated => return Ok(()),
            _ => {}
        }

        if !self.buffer.is_empty() {
            let err = CodecError::from(ProtocolError::TruncatedFrame {
                pending: self.buffer.len(),
            });
            self.fail(&err);
            return Err(err);
        }

        self.state = StreamState::Terminated;
        Ok(())
    }

    /// Discards stream state so the decoder can start a new stream.
    ///
    /// The cache is kept.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = StreamState::Idle;
    }

    /// Returns the current stream state.
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Returns the number of buffered bytes of an incomplete frame.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the frames applied so far.
    pub fn counts(&self) -> &FrameCounts {
        &self.counts
    }

    /// Returns the decoder's cache.
    pub fn cache(&self) -> &ChunkCache {
        &self.cache
    }

    /// Consumes the decoder, returning its cache.
    pub fn into_cache(self) -> ChunkCache {
        self.cache
    }
}
