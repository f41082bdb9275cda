//! Chunk cache configuration.

use std::path::PathBuf;

use crate::cache::CacheEpoch;
use crate::error::{CodecError, Result};

/// Default cache budget (64 MiB of chunk data).
pub const DEFAULT_CACHE_BYTES: usize = 64 * 1024 * 1024;

/// Where cached chunks live.
///
/// The set of media is closed; the choice is made once when the cache is
/// built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "lowercase"))]
pub enum CacheBacking {
    /// Chunks held in process memory.
    #[default]
    Memory,

    /// Chunks stored as files under `root`, one directory per epoch.
    Disk {
        /// Directory holding the per-epoch cache directories.
        root: PathBuf,
    },
}

/// Bounds on how much a cache may hold.
///
/// Either bound may be omitted but not both. When both are set, eviction
/// continues until both are satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CacheCapacity {
    /// Maximum number of resident chunks.
    pub max_entries: Option<usize>,

    /// Maximum total bytes of resident chunk data.
    pub max_bytes: Option<usize>,
}

impl CacheCapacity {
    /// A capacity bounded by entry count only.
    pub const fn entries(max_entries: usize) -> Self {
        Self {
            max_entries: Some(max_entries),
            max_bytes: None,
        }
    }

    /// A capacity bounded by total bytes only.
    pub const fn bytes(max_bytes: usize) -> Self {
        Self {
            max_entries: None,
            max_bytes: Some(max_bytes),
        }
    }

    /// Adds an entry bound to this capacity.
    pub const fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    /// Returns true if a chunk of `len` bytes could fit in an empty cache.
    pub fn admits(&self, len: usize) -> bool {
        self.max_entries != Some(0) && self.max_bytes.is_none_or(|max| len <= max)
    }

    /// Validates the capacity.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries.is_none() && self.max_bytes.is_none() {
            return Err(CodecError::InvalidConfig {
                message: "cache capacity needs an entry or byte bound",
            });
        }
        Ok(())
    }
}

impl Default for CacheCapacity {
    fn default() -> Self {
        Self::bytes(DEFAULT_CACHE_BYTES)
    }
}

/// Configuration for one chunk cache.
///
/// The epoch has no usable default: both peers must be configured with the
/// same value, so an unset (nil) epoch fails validation.
///
/// # Example
///
/// ```
/// use xcodec::{CacheCapacity, CacheConfig, CacheEpoch};
///
/// let config = CacheConfig::memory(CacheEpoch::generate())
///     .with_capacity(CacheCapacity::entries(1024));
/// config.validate()?;
/// # Ok::<(), xcodec::CodecError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CacheConfig {
    /// Backing medium.
    pub backing: CacheBacking,

    /// Size bounds.
    pub capacity: CacheCapacity,

    /// Cache generation shared with the peer.
    pub epoch: CacheEpoch,
}

impl CacheConfig {
    /// An in-memory cache with the default capacity.
    pub fn memory(epoch: CacheEpoch) -> Self {
        Self {
            backing: CacheBacking::Memory,
            capacity: CacheCapacity::default(),
            epoch,
        }
    }

    /// A disk-backed cache rooted at `root` with the default capacity.
    pub fn disk(root: impl Into<PathBuf>, epoch: CacheEpoch) -> Self {
        Self {
            backing: CacheBacking::Disk { root: root.into() },
            capacity: CacheCapacity::default(),
            epoch,
        }
    }

    /// Sets the capacity.
    pub fn with_capacity(mut self, capacity: CacheCapacity) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the epoch.
    pub fn with_epoch(mut self, epoch: CacheEpoch) -> Self {
        self.epoch = epoch;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        self.capacity.validate()?;

        if let CacheBacking::Disk { root } = &self.backing {
            if root.as_os_str().is_empty() {
                return Err(CodecError::InvalidConfig {
                    message: "disk cache needs a root directory",
                });
            }
        }

        if self.epoch.is_nil() {
            return Err(CodecError::InvalidConfig {
                message: "cache epoch must be set",
            });
        }

        Ok(())
    }
}
