//! Weak back-references from ChangeSets to the store that produced them

use crate::changeset::ChangeSet;
use crate::checkpoint::Checkpoint;
use crate::error::{FeedError, Result};
use crate::item::{Item, ItemId, Lookup};
use crate::revision::{Epoch, Revision};
use crate::store::Store;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Weak};
use ulid::Ulid;

/// Stable identity of a producing store
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(Ulid);

impl SourceId {
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    pub const fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SourceId {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self> {
        Ulid::from_string(s)
            .map(Self)
            .map_err(|e| FeedError::Codec(format!("invalid source id '{}': {}", s, e)))
    }
}

/// Read-only capability pointing back at the store that produced a ChangeSet
///
/// Holds a `Weak` handle: outstanding ChangeSets never keep a store alive.
/// Once the store is dropped every call through the source fails with
/// [`FeedError::SourceDropped`].
#[derive(Clone)]
pub struct IndexingSource {
    id: SourceId,
    epoch: Epoch,
    store: Weak<dyn Store>,
}

impl IndexingSource {
    pub fn new(id: SourceId, epoch: Epoch, store: Weak<dyn Store>) -> Self {
        Self { id, epoch, store }
    }

    pub fn source_id(&self) -> SourceId {
        self.id
    }

    /// Epoch the referencing ChangeSet was produced in
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Upgrade to the live store, if it still exists
    pub fn store(&self) -> Option<Arc<dyn Store>> {
        self.store.upgrade()
    }

    pub fn is_alive(&self) -> bool {
        self.store.strong_count() > 0
    }

    /// Whether both references name the same producing store
    pub fn is_same_source(&self, other: &IndexingSource) -> bool {
        self.id == other.id
    }

    /// Whether a consumer holding `checkpoint` may resume against this source
    ///
    /// A revision only means something within the store and epoch it was
    /// observed in. A recreated store restarts at epoch 1, so the epoch
    /// number alone cannot tell its history apart from the old one.
    pub fn is_continuous_with(&self, checkpoint: &Checkpoint) -> bool {
        checkpoint.matches(self.id, self.epoch)
    }

    pub fn changes(&self, from: Revision, batch_size: usize) -> Result<ChangeSet> {
        self.live()?.changes(from, batch_size)
    }

    /// Re-issue `changes` to continue right after `previous`
    pub fn next_after(&self, previous: &ChangeSet, batch_size: usize) -> Result<ChangeSet> {
        self.changes(previous.to_revision(), batch_size)
    }

    pub fn get(&self, id: &ItemId) -> Result<Lookup<Item>> {
        self.live()?.get(id)
    }

    fn live(&self) -> Result<Arc<dyn Store>> {
        self.store().ok_or(FeedError::SourceDropped(self.id))
    }
}

impl fmt::Debug for IndexingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexingSource")
            .field("id", &self.id)
            .field("epoch", &self.epoch)
            .field("alive", &self.is_alive())
            .finish()
    }
}
