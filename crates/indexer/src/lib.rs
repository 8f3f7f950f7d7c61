//! Index consumers for the change feed
//!
//! This crate provides:
//! - The `SemanticIndex` boundary consumers apply changes to
//! - In-memory and sled-backed term indexes
//! - The consumer state machine (init, streaming, resync, caught up)
//! - An async follower that re-arms the consumer on a poll interval or
//!   write notification

pub mod consumer;
pub mod follow;
pub mod memory;
pub mod persistent;
pub mod terms;

use feed_core::{Item, ItemId, Result};
use std::sync::Arc;

// Re-exports
pub use consumer::{
    Consumer, ConsumerConfig, ConsumerError, ConsumerEvent, ConsumerState, RunReport, Step,
};
pub use follow::{Follower, FollowerHandle};
pub use memory::MemoryIndex;
pub use persistent::SledIndex;

/// A derived index kept in sync with a store
///
/// Both operations must be idempotent: the feed delivers at least once, so
/// an id may be applied again after a crash or a resync.
pub trait SemanticIndex: Send + Sync {
    /// Index or re-index the current state of an item
    fn index(&self, item: &Item) -> Result<()>;

    /// Drop an id. Unknown ids are a no-op.
    fn remove(&self, id: &ItemId) -> Result<()>;

    /// Drop everything ahead of a full resync
    fn clear(&self) -> Result<()>;

    /// Number of indexed items
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<I: SemanticIndex + ?Sized> SemanticIndex for Arc<I> {
    fn index(&self, item: &Item) -> Result<()> {
        (**self).index(item)
    }

    fn remove(&self, id: &ItemId) -> Result<()> {
        (**self).remove(id)
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}
