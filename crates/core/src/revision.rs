//! Revision and epoch numbering
//!
//! Revisions are only comparable within the epoch that produced them. A store
//! bumps its epoch whenever its history is reset, which voids every revision a
//! consumer remembered from the previous epoch.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordinal position of a change within an epoch
#[derive(
    Copy, Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Revision(u64);

impl Revision {
    /// Resume point meaning "nothing applied yet". The first change of an
    /// epoch is revision 1.
    pub const MIN: Revision = Revision(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    pub fn is_min(self) -> bool {
        self == Self::MIN
    }

    /// The revision immediately after this one
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Big-endian key encoding, so byte order matches numeric order
    pub fn to_key(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    /// Decode a key written by [`Revision::to_key`]
    pub fn from_key(bytes: &[u8]) -> Option<Self> {
        let raw: [u8; 8] = bytes.try_into().ok()?;
        Some(Self(u64::from_be_bytes(raw)))
    }
}

impl From<u64> for Revision {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a continuous revision numbering space
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Epoch(u64);

impl Epoch {
    /// Epoch of a freshly created store
    pub const FIRST: Epoch = Epoch(1);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// The epoch that follows a history reset
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl Default for Epoch {
    fn default() -> Self {
        Self::FIRST
    }
}

impl From<u64> for Epoch {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
