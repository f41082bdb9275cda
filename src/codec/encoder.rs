//! Encoder - raw bytes in, coded frames out.

use bytes::BytesMut;

use super::{FrameCounts, StreamState};
use crate::cache::ChunkCache;
use crate::cdc::RollingHash;
use crate::chunk::Chunk;
use crate::config::ChunkConfig;
use crate::error::{CacheError, CodecError, Result};
use crate::frame;
use crate::hash::Blake3Hasher;

/// Streaming encoder for one direction of a connection.
///
/// `Encoder` runs the rolling hash over incoming bytes. At every chunk
/// boundary it hashes the finished run and emits:
///
/// - `Reference(hash)` if its cache already holds the chunk,
/// - `Declare(hash, bytes)` after inserting it otherwise,
/// - `Escape(bytes)` if the chunk cannot fit in the cache at all.
///
/// Bytes after the last boundary are held until the next
/// [`encode`](Encoder::encode) call, or sent as a final Escape by
/// [`flush`](Encoder::flush).
///
/// # Determinism
///
/// Frames are only emitted at content boundaries or at flush, so the output
/// does not depend on how the input is split across calls.
///
/// # Example
///
/// ```
/// use bytes::BytesMut;
/// use xcodec::{CacheCapacity, CacheEpoch, ChunkCache, ChunkConfig, Encoder};
///
/// let cache = ChunkCache::memory(CacheCapacity::entries(1024), CacheEpoch::generate());
/// let mut encoder = Encoder::new(ChunkConfig::new(64, 256, 1024)?, cache)?;
///
/// let mut wire = BytesMut::new();
/// let data = vec![7u8; 10_000];
/// encoder.encode(&data, &mut wire)?;
/// encoder.encode(&data, &mut wire)?;
/// encoder.flush(&mut wire);
///
/// // The repeated block collapses into references.
/// assert!(wire.len() < data.len());
/// # Ok::<(), xcodec::CodecError>(())
/// ```
#[derive(Debug)]
pub struct Encoder {
    cache: ChunkCache,
    roller: RollingHash,
    hasher: Blake3Hasher,
    pending: BytesMut,
    state: StreamState,
    counts: FrameCounts,
    config: ChunkConfig,
}

impl Encoder {
    /// Creates an encoder that reads and fills `cache`.
    ///
    /// # Errors
    ///
    /// [`CodecError::InvalidConfig`] if `config` is invalid.
    pub fn new(config: ChunkConfig, cache: ChunkCache) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            cache,
            roller: RollingHash::new(config.min_size(), config.avg_size(), config.max_size())?,
            hasher: Blake3Hasher::new(),
            pending: BytesMut::with_capacity(config.max_size()),
            state: StreamState::Idle,
            counts: FrameCounts::default(),
            config,
        })
    }

    /// Consumes all of `input`, appending complete frames to `output`.
    ///
    /// Bytes of an unfinished chunk are kept internally for the next call.
    ///
    /// # Errors
    ///
    /// - [`CodecError::Terminated`] after [`flush`](Encoder::flush) or a prior failure
    /// - [`CodecError::Cache`] if the disk cache fails; the stream is then failed
    pub fn encode(&mut self, input: &[u8], output: &mut BytesMut) -> Result<()> {
        if self.state.is_terminal() {
            return Err(CodecError::Terminated);
        }

        let mut rest = input;
        while let Some(len) = self.roller.find_boundary(rest) {
            let (run, tail) = rest.split_at(len);
            self.accumulate(run);
            if let Err(e) = self.emit_candidate(output) {
                self.fail();
                return Err(e);
            }
            rest = tail;
        }
        self.accumulate(rest);

        self.state = if self.pending.is_empty() {
            StreamState::Idle
        } else {
            StreamState::Accumulating
        };
        Ok(())
    }

    fn accumulate(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
        self.hasher.update(bytes);
    }

    /// Turns the pending run into one frame.
    fn emit_candidate(&mut self, output: &mut BytesMut) -> Result<()> {
        let hash = self.hasher.finalize();
        self.hasher.reset();
        let candidate = Chunk::from_parts(self.pending.split().freeze(), hash);

        if self.cache.contains(&hash) {
            frame::put_reference(output, &hash);
            self.counts.references += 1;
            tracing::trace!(hash = %hash, len = candidate.len(), "reference");
            return Ok(());
        }

        let (data, hash) = candidate.into_parts();
        match self.cache.insert(hash, data.clone()) {
            Ok(_) => {
                frame::put_declare(output, &hash, &data);
                self.counts.declarations += 1;
                tracing::trace!(hash = %hash, len = data.len(), "declare");
            }
            Err(CacheError::Capacity { needed, budget }) => {
                frame::put_escape(output, &data);
                self.counts.escapes += 1;
                tracing::debug!(needed, budget, "chunk does not fit cache, sent as escape");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    fn fail(&mut self) {
        self.pending.clear();
        self.hasher.reset();
        self.roller.reset();
        self.state = StreamState::Failed;
    }

    /// Ends the stream, sending any pending bytes as one final Escape frame.
    ///
    /// Returns true if a frame was written. Calling it again, or on a
    /// stream that ended on a boundary, writes nothing and returns false.
    /// Afterwards the encoder is [`StreamState::Terminated`]; call
    /// [`reset`](Encoder::reset) to start a new stream.
    pub fn flush(&mut self, output: &mut BytesMut) -> bool {
        if self.state == StreamState::Failed {
            return false;
        }
        self.state = StreamState::Terminated;
        self.roller.reset();
        self.hasher.reset();

        if self.pending.is_empty() {
            return false;
        }

        let tail = self.pending.split();
        frame::put_escape(output, &tail);
        self.counts.escapes += 1;
        tracing::trace!(len = tail.len(), "final escape");
        true
    }

    /// Discards stream state so the encoder can start a new stream.
    ///
    /// The cache is kept; the peer's decoder must keep its cache too.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.hasher.reset();
        self.roller.reset();
        self.state = StreamState::Idle;
    }

    /// Returns the current stream state.
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Returns the number of bytes waiting for a chunk boundary.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Returns the frames emitted so far.
    pub fn counts(&self) -> &FrameCounts {
        &self.counts
    }

    /// Returns the encoder's cache.
    pub fn cache(&self) -> &ChunkCache {
        &self.cache
    }

    /// Returns the chunk configuration.
    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Consumes the encoder, returning its cache.
    pub fn into_cache(self) -> ChunkCache {
        self.cache
    }
}
