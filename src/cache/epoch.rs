//! Cache epoch identifiers.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::error::{CodecError, Result};

/// Identifies one cache generation.
///
/// Two peers may only exchange Reference frames when their caches were
/// started under the same epoch. The check happens once, at connection
/// setup (see [`Hello`](crate::Hello)); frames themselves carry no epoch.
///
/// The default value is the nil epoch, which configuration validation
/// rejects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct CacheEpoch(Uuid);

impl CacheEpoch {
    /// Generates a fresh random epoch.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Builds an epoch from its 16-byte wire form.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Returns the 16-byte wire form.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Returns true for the unset epoch.
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Fails with [`CodecError::EpochMismatch`] unless `remote` equals this epoch.
    pub fn ensure_matches(&self, remote: &CacheEpoch) -> Result<()> {
        if self == remote {
            Ok(())
        } else {
            Err(CodecError::EpochMismatch {
                local: self.0,
                remote: remote.0,
            })
        }
    }
}

impl fmt::Display for CacheEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for CacheEpoch {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}
