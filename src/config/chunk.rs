//! Chunk size configuration.

use crate::error::{CodecError, Result};
use crate::frame::MAX_PAYLOAD_LEN;

/// Default minimum chunk size (1 KiB). Also the rolling-hash window width.
pub const DEFAULT_MIN_CHUNK_SIZE: usize = 1024;

/// Default average/target chunk size (4 KiB).
pub const DEFAULT_AVG_CHUNK_SIZE: usize = 4 * 1024;

/// Default maximum chunk size (16 KiB).
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 16 * 1024;

/// Configuration for content-defined chunk boundaries.
///
/// - `min_size` - No chunk is cut before this many bytes; also the width of
///   the rolling-hash window
/// - `avg_size` - Target size; switches the boundary mask
/// - `max_size` - A chunk is cut here even without a content boundary
///
/// # Size Constraints
///
/// - Non-zero, ordered: `min_size <= avg_size <= max_size`
/// - `avg_size` a power of two (it selects the boundary mask)
/// - `max_size` no larger than the wire format's payload limit
///
/// Setting all three equal gives fixed-size chunks.
///
/// # Example
///
/// ```
/// use xcodec::ChunkConfig;
///
/// let config = ChunkConfig::new(2048, 8192, 32768)?;
/// assert_eq!(config.min_size(), 2048);
///
/// let config = ChunkConfig::default()
///     .with_min_size(512)
///     .with_avg_size(2048)
///     .with_max_size(8192);
/// config.validate()?;
/// # Ok::<(), xcodec::CodecError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ChunkConfig {
    /// Minimum chunk size in bytes.
    min_size: usize,

    /// Average/target chunk size in bytes.
    avg_size: usize,

    /// Maximum chunk size in bytes.
    max_size: usize,
}

impl ChunkConfig {
    /// Creates a new configuration with the specified size bounds.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidConfig`] if:
    /// - Any size is zero
    /// - `min_size > avg_size` or `avg_size > max_size`
    /// - `avg_size` is not a power of 2
    /// - `max_size` exceeds the frame payload limit
    pub fn new(min_size: usize, avg_size: usize, max_size: usize) -> Result<Self> {
        if min_size == 0 || avg_size == 0 || max_size == 0 {
            return Err(CodecError::InvalidConfig {
                message: "chunk sizes must be non-zero",
            });
        }

        if min_size > avg_size {
            return Err(CodecError::InvalidConfig {
                message: "min_size cannot be greater than avg_size",
            });
        }

        if avg_size > max_size {
            return Err(CodecError::InvalidConfig {
                message: "avg_size cannot be greater than max_size",
            });
        }

        if !avg_size.is_power_of_two() {
            return Err(CodecError::InvalidConfig {
                message: "avg_size must be a power of 2",
            });
        }

        if max_size > MAX_PAYLOAD_LEN {
            return Err(CodecError::InvalidConfig {
                message: "max_size exceeds the frame payload limit",
            });
        }

        Ok(Self {
            min_size,
            avg_size,
            max_size,
        })
    }

    /// Sets the minimum chunk size. Not validated until [`ChunkConfig::validate`].
    pub fn with_min_size(mut self, size: usize) -> Self {
        self.min_size = size;
        self
    }

    /// Sets the average/target chunk size. Not validated until [`ChunkConfig::validate`].
    pub fn with_avg_size(mut self, size: usize) -> Self {
        self.avg_size = size;
        self
    }

    /// Sets the maximum chunk size. Not validated until [`ChunkConfig::validate`].
    pub fn with_max_size(mut self, size: usize) -> Self {
        self.max_size = size;
        self
    }

    /// Returns the minimum chunk size.
    pub fn min_size(&self) -> usize {
        self.min_size
    }

    /// Returns the average/target chunk size.
    pub fn avg_size(&self) -> usize {
        self.avg_size
    }

    /// Returns the maximum chunk size.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Validates the current configuration.
    pub fn validate(&self) -> Result<()> {
        Self::new(self.min_size, self.avg_size, self.max_size).map(|_| ())
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            min_size: DEFAULT_MIN_CHUNK_SIZE,
            avg_size: DEFAULT_AVG_CHUNK_SIZE,
            max_size: DEFAULT_MAX_CHUNK_SIZE,
        }
    }
}
