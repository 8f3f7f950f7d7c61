//! Consumer checkpoints
//!
//! A checkpoint marks the last fully applied change of one consumer: the
//! store and epoch it was observed in and the `to_revision` of the last
//! applied page. A revision is only comparable within the same store and
//! epoch.

use crate::error::Result;
use crate::revision::{Epoch, Revision};
use crate::source::SourceId;
use ahash::AHashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Producing store, `None` until the consumer has seen its first ChangeSet
    pub source: Option<SourceId>,
    pub epoch: Option<Epoch>,
    pub revision: Revision,
}

impl Checkpoint {
    /// Starting point of a consumer with no persisted state
    pub fn initial() -> Self {
        Self::default()
    }

    pub fn new(source: SourceId, epoch: Epoch, revision: Revision) -> Self {
        Self {
            source: Some(source),
            epoch: Some(epoch),
            revision,
        }
    }

    /// Full resync point in a newly adopted store or epoch
    pub fn resync(source: SourceId, epoch: Epoch) -> Self {
        Self::new(source, epoch, Revision::MIN)
    }

    /// Whether `revision` is meaningful for pages `source` produced in `epoch`
    pub fn matches(&self, source: SourceId, epoch: Epoch) -> bool {
        self.source == Some(source) && self.epoch == Some(epoch)
    }
}

/// Durable home of consumer checkpoints, keyed by consumer id
pub trait CheckpointStore: Send + Sync {
    fn load(&self, consumer: &str) -> Result<Option<Checkpoint>>;

    fn save(&self, consumer: &str, checkpoint: Checkpoint) -> Result<()>;
}

/// Process-local checkpoint store
#[derive(Debug, Default)]
pub struct MemoryCheckpoints {
    inner: RwLock<AHashMap<String, Checkpoint>>,
}

impl MemoryCheckpoints {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for MemoryCheckpoints {
    fn load(&self, consumer: &str) -> Result<Option<Checkpoint>> {
        Ok(self.inner.read().get(consumer).copied())
    }

    fn save(&self, consumer: &str, checkpoint: Checkpoint) -> Result<()> {
        self.inner.write().insert(consumer.to_string(), checkpoint);
        Ok(())
    }
}

impl<C: CheckpointStore + ?Sized> CheckpointStore for std::sync::Arc<C> {
    fn load(&self, consumer: &str) -> Result<Option<Checkpoint>> {
        (**self).load(consumer)
    }

    fn save(&self, consumer: &str, checkpoint: Checkpoint) -> Result<()> {
        (**self).save(consumer, checkpoint)
    }
}
