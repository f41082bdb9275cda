//! Configuration for codec behavior.
//!
//! Configuration is supplied once at connection setup and is static for the
//! life of the codec:
//!
//! - [`ChunkConfig`] - Chunk size boundaries
//! - [`CacheConfig`] - Cache medium, capacity and epoch
//! - [`CompressorConfig`] - Secondary compressor toggle for the transport layer
//! - [`CodecConfig`] - All of the above, plus traffic counting
//!
//! All problems are reported by [`CodecConfig::validate`] before any bytes
//! are exchanged.
//!
//! # Example
//!
//! ```
//! use xcodec::{CacheCapacity, CacheConfig, CacheEpoch, ChunkConfig, CodecConfig};
//!
//! let epoch = CacheEpoch::generate();
//! let config = CodecConfig::new(
//!     ChunkConfig::new(2048, 8192, 32768)?,
//!     CacheConfig::memory(epoch).with_capacity(CacheCapacity::bytes(32 << 20)),
//! )?
//! .with_counting(true);
//!
//! assert!(config.counting());
//! # Ok::<(), xcodec::CodecError>(())
//! ```

mod cache;
mod chunk;

pub use cache::{CacheBacking, CacheCapacity, CacheConfig, DEFAULT_CACHE_BYTES};
pub use chunk::{
    ChunkConfig, DEFAULT_AVG_CHUNK_SIZE, DEFAULT_MAX_CHUNK_SIZE, DEFAULT_MIN_CHUNK_SIZE,
};

use crate::error::{CodecError, Result};

/// Highest accepted compressor level.
pub const MAX_COMPRESSOR_LEVEL: u8 = 9;

/// Secondary general-purpose compressor settings.
///
/// The codec never compresses on its own. The transport layer reads these
/// settings and decides whether to wrap the coded stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CompressorConfig {
    /// Whether the coded stream is compressed.
    pub enabled: bool,

    /// Compression level, `0..=9`.
    pub level: u8,
}

impl CompressorConfig {
    /// Compression enabled at `level`.
    pub const fn enabled(level: u8) -> Self {
        Self {
            enabled: true,
            level,
        }
    }

    /// Compression disabled.
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            level: 0,
        }
    }
}

impl Default for CompressorConfig {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Full per-connection codec configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CodecConfig {
    chunk: ChunkConfig,
    cache: CacheConfig,
    compressor: CompressorConfig,
    counting: bool,
}

impl CodecConfig {
    /// Creates and validates a configuration.
    pub fn new(chunk: ChunkConfig, cache: CacheConfig) -> Result<Self> {
        let config = Self {
            chunk,
            cache,
            compressor: CompressorConfig::default(),
            counting: false,
        };
        config.validate()?;
        Ok(config)
    }

    /// Sets the chunk configuration.
    pub fn with_chunk_config(mut self, chunk: ChunkConfig) -> Self {
        self.chunk = chunk;
        self
    }

    /// Sets the cache configuration.
    pub fn with_cache_config(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Sets the compressor configuration.
    pub fn with_compressor(mut self, compressor: CompressorConfig) -> Self {
        self.compressor = compressor;
        self
    }

    /// Enables or disables traffic counters.
    pub fn with_counting(mut self, counting: bool) -> Self {
        self.counting = counting;
        self
    }

    /// Returns the chunk configuration.
    pub fn chunk_config(&self) -> &ChunkConfig {
        &self.chunk
    }

    /// Returns the cache configuration.
    pub fn cache_config(&self) -> &CacheConfig {
        &self.cache
    }

    /// Returns the compressor configuration.
    pub fn compressor(&self) -> &CompressorConfig {
        &self.compressor
    }

    /// Returns whether traffic counters are kept.
    pub fn counting(&self) -> bool {
        self.counting
    }

    /// Validates every part of the configuration.
    pub fn validate(&self) -> Result<()> {
        self.chunk.validate()?;
        self.cache.validate()?;

        if self.compressor.level > MAX_COMPRESSOR_LEVEL {
            return Err(CodecError::InvalidConfig {
                message: "compressor level must be between 0 and 9",
            });
        }

        Ok(())
    }
}
