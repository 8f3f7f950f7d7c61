//! Items and the two-case lookup result

use crate::hash::{hash_bytes, ContentHash};
use crate::revision::Revision;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Stable key of an item in a store
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Decode a key stored as UTF-8 bytes
    pub fn from_utf8(bytes: &[u8]) -> Option<Self> {
        std::str::from_utf8(bytes).ok().map(Self::new)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for ItemId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Current state of a stored item
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Item {
    id: ItemId,
    content: Bytes,
    hash: ContentHash,
    /// Revision of the last write to this item
    revision: Revision,
}

impl Item {
    pub fn new(id: impl Into<ItemId>, content: impl Into<Bytes>, revision: Revision) -> Self {
        let content = content.into();
        Self {
            id: id.into(),
            hash: hash_bytes(&content),
            content,
            revision,
        }
    }

    pub fn id(&self) -> &ItemId {
        &self.id
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// Content as text, if it is valid UTF-8
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }

    pub fn content_hash(&self) -> ContentHash {
        self.hash
    }

    pub fn revision(&self) -> Revision {
        self.revision
    }
}

/// Result of a point lookup
///
/// `Absent` is the tombstone signal: the item never existed or has been
/// deleted. It is not an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup<T> {
    Present(T),
    Absent,
}

impl<T> Lookup<T> {
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn as_ref(&self) -> Lookup<&T> {
        match self {
            Self::Present(value) => Lookup::Present(value),
            Self::Absent => Lookup::Absent,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Self::Present(value) => Lookup::Present(f(value)),
            Self::Absent => Lookup::Absent,
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::Present(value),
            None => Self::Absent,
        }
    }
}
