//! Change-log stores and consumer checkpoint persistence
//!
//! This crate provides:
//! - Append-only revision journal (sled embedded DB)
//! - In-memory reference store with identical paging semantics
//! - Retention policies & log compaction
//! - Persistent consumer checkpoints

pub mod checkpoint;
pub mod journal;
pub mod memory;
pub mod retention;

// Re-exports
pub use checkpoint::SledCheckpoints;
pub use journal::{Journal, JournalStats};
pub use memory::MemoryStore;
pub use retention::{CompactionPlan, GarbageCollector, GcReport, RetentionPolicy};
