//! Change-feed protocol primitives
//!
//! This crate provides:
//! - Revision and epoch numbering
//! - Items, content digests and the two-case `Lookup` result
//! - `ChangeSet` pages and the paging builder shared by stores
//! - `IndexingSource` weak back-references to producing stores
//! - The `Store` and `CheckpointStore` boundaries
//! - The protocol error taxonomy

pub mod changeset;
pub mod checkpoint;
pub mod error;
pub mod hash;
pub mod item;
pub mod revision;
pub mod source;
pub mod store;

// Re-exports
pub use changeset::{ChangeSet, Changed, PageBuilder};
pub use checkpoint::{Checkpoint, CheckpointStore, MemoryCheckpoints};
pub use error::{FeedError, Result};
pub use hash::{hash_bytes, ContentHash};
pub use item::{Item, ItemId, Lookup};
pub use revision::{Epoch, Revision};
pub use source::{IndexingSource, SourceId};
pub use store::Store;
