//! In-memory reference store
//!
//! Same paging, retention and epoch semantics as [`crate::Journal`], without
//! durability. Used by tests, benches and embedders that rebuild on start.

use crate::retention::{GarbageCollector, GcReport, RetentionPolicy};
use ahash::AHashMap;
use bytes::Bytes;
use feed_core::{
    ChangeSet, Epoch, FeedError, IndexingSource, Item, ItemId, Lookup, PageBuilder, Result,
    Revision, SourceId, Store,
};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use tracing::{debug, info};

#[derive(Debug)]
struct State {
    epoch: Epoch,
    head: Revision,
    horizon: Revision,
    items: AHashMap<ItemId, Item>,
    log: BTreeMap<Revision, ItemId>,
}

pub struct MemoryStore {
    this: Weak<MemoryStore>,
    id: SourceId,
    state: RwLock<State>,
    gc: GarbageCollector,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Self::with_policy(RetentionPolicy::default())
    }

    pub fn with_policy(policy: RetentionPolicy) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            id: SourceId::generate(),
            state: RwLock::new(State {
                epoch: Epoch::FIRST,
                head: Revision::MIN,
                horizon: Revision::MIN,
                items: AHashMap::new(),
                log: BTreeMap::new(),
            }),
            gc: GarbageCollector::new(policy),
        })
    }

    /// Create or replace an item
    pub fn put(&self, id: impl Into<ItemId>, content: impl Into<Bytes>) -> Revision {
        let id = id.into();
        let mut state = self.state.write();
        let revision = state.head.next();
        state.head = revision;
        state.log.insert(revision, id.clone());
        state
            .items
            .insert(id.clone(), Item::new(id.clone(), content, revision));
        debug!("put {} at revision {}", id, revision);
        revision
    }

    /// Delete an item. Returns `None` when there was nothing to delete.
    pub fn delete(&self, id: &ItemId) -> Option<Revision> {
        let mut state = self.state.write();
        state.items.remove(id)?;
        let revision = state.head.next();
        state.head = revision;
        state.log.insert(revision, id.clone());
        debug!("delete {} at revision {}", id, revision);
        Some(revision)
    }

    /// Reset history: bump the epoch and reseed the log with every live item
    pub fn rebuild(&self) -> Epoch {
        let mut state = self.state.write();
        let epoch = state.epoch.next();

        let mut ids: Vec<ItemId> = state.items.keys().cloned().collect();
        ids.sort();

        let mut log = BTreeMap::new();
        let mut head = Revision::MIN;
        for id in ids {
            head = head.next();
            if let Some(item) = state.items.get_mut(&id) {
                *item = Item::new(id.clone(), item.content().clone(), head);
            }
            log.insert(head, id);
        }

        state.epoch = epoch;
        state.head = head;
        state.horizon = Revision::MIN;
        state.log = log;
        info!("Rebuilt memory store: epoch {} with {} items", epoch, head);
        epoch
    }

    /// Compact the log under the configured retention policy
    pub fn compact(&self) -> GcReport {
        let mut state = self.state.write();
        let entries: Vec<(Revision, ItemId)> = state
            .log
            .iter()
            .map(|(rev, id)| (*rev, id.clone()))
            .collect();

        let plan = {
            let items = &state.items;
            self.gc
                .plan(state.head, state.horizon, &entries, |id| items.contains_key(id))
        };

        for revision in &plan.drop {
            state.log.remove(revision);
        }
        state.horizon = plan.horizon;

        GcReport {
            superseded_dropped: plan.superseded,
            tombstones_purged: plan.tombstones,
            horizon: plan.horizon,
            log_entries: state.log.len(),
        }
    }

    pub fn horizon(&self) -> Revision {
        self.state.read().horizon
    }

    pub fn len(&self) -> usize {
        self.state.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn log_len(&self) -> usize {
        self.state.read().log.len()
    }

    fn source(&self, epoch: Epoch) -> IndexingSource {
        let store: Weak<dyn Store> = self.this.clone();
        IndexingSource::new(self.id, epoch, store)
    }
}

impl Store for MemoryStore {
    fn source_id(&self) -> SourceId {
        self.id
    }

    fn epoch(&self) -> Result<Epoch> {
        Ok(self.state.read().epoch)
    }

    fn head(&self) -> Result<Revision> {
        Ok(self.state.read().head)
    }

    fn get(&self, id: &ItemId) -> Result<Lookup<Item>> {
        Ok(self.state.read().items.get(id).cloned().into())
    }

    fn changes(&self, from: Revision, batch_size: usize) -> Result<ChangeSet> {
        let state = self.state.read();
        if !from.is_min() && from < state.horizon {
            return Err(FeedError::RevisionUnavailable {
                requested: from,
                horizon: state.horizon,
                epoch: state.epoch,
            });
        }

        let mut page = PageBuilder::new(from, batch_size)?;
        for (revision, id) in state.log.range(from.next()..) {
            if !page.offer(*revision, id) {
                break;
            }
        }

        page.finish(state.head, state.epoch, self.source(state.epoch))
    }
}
