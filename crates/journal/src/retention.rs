//! Retention policies and log compaction
//!
//! Compaction keeps, for every id, only its most recent log entry. Entries of
//! deleted ids (tombstones) are purged once they fall more than
//! `retain_revisions` behind the head. Purging a tombstone raises the store's
//! horizon: a consumer resuming from below it could miss that deletion, so
//! such requests fail with `RevisionUnavailable` and force a full resync.

use ahash::AHashSet;
use feed_core::{ItemId, Revision};

/// Retention policy configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Tombstones within this many revisions of the head are kept (default: 10000)
    pub retain_revisions: u64,
    /// Drop log entries superseded by a later entry for the same id
    pub compact_superseded: bool,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            retain_revisions: 10_000,
            compact_superseded: true,
        }
    }
}

/// Log entries a compaction pass will remove
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompactionPlan {
    /// Revisions to delete from the log, ascending
    pub drop: Vec<Revision>,
    pub superseded: usize,
    pub tombstones: usize,
    /// Horizon after the pass
    pub horizon: Revision,
}

impl CompactionPlan {
    pub fn is_empty(&self) -> bool {
        self.drop.is_empty()
    }
}

/// Outcome of a garbage collection run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcReport {
    pub superseded_dropped: usize,
    pub tombstones_purged: usize,
    pub horizon: Revision,
    /// Log entries remaining after the run
    pub log_entries: usize,
}

impl GcReport {
    pub fn entries_dropped(&self) -> usize {
        self.superseded_dropped + self.tombstones_purged
    }
}

/// Garbage collector
pub struct GarbageCollector {
    policy: RetentionPolicy,
}

impl GarbageCollector {
    /// Create a new GC with the given policy
    pub fn new(policy: RetentionPolicy) -> Self {
        Self { policy }
    }

    /// Decide which entries to drop
    ///
    /// `entries` must be in ascending revision order. `is_live` reports
    /// whether an id currently exists in the store.
    pub fn plan(
        &self,
        head: Revision,
        horizon: Revision,
        entries: &[(Revision, ItemId)],
        is_live: impl Fn(&ItemId) -> bool,
    ) -> CompactionPlan {
        let cutoff = Revision::new(head.get().saturating_sub(self.policy.retain_revisions));
        let mut plan = CompactionPlan {
            horizon,
            ..CompactionPlan::default()
        };

        let mut seen: AHashSet<&ItemId> = AHashSet::with_capacity(entries.len());
        for (revision, id) in entries.iter().rev() {
            if !seen.insert(id) {
                if self.policy.compact_superseded {
                    plan.drop.push(*revision);
                    plan.superseded += 1;
                }
                continue;
            }

            if *revision <= cutoff && !is_live(id) {
                plan.drop.push(*revision);
                plan.tombstones += 1;
                plan.horizon = plan.horizon.max(*revision);
            }
        }

        plan.drop.sort_unstable();
        plan
    }
}
