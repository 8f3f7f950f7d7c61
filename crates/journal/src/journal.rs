//! Append-only revision journal using sled
//!
//! Layout:
//! ```text
//! items  : item id            -> bincode(ItemRecord)
//! log    : revision (be u64)  -> item id
//! meta   : "source_id" | "epoch" | "head" | "horizon"
//! ```
//!
//! Writers and compaction take the gate exclusively; `changes` takes it
//! shared, so a page never observes half of a write or a compaction pass.

use crate::retention::{GarbageCollector, GcReport, RetentionPolicy};
use bytes::Bytes;
use feed_core::{
    ChangeSet, ContentHash, Epoch, FeedError, IndexingSource, Item, ItemId, Lookup, PageBuilder,
    Result, Revision, SourceId, Store,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sled::transaction::{ConflictableTransactionResult, TransactionError};
use sled::{Db, Transactional, Tree};
use std::path::Path;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

const SOURCE_ID_KEY: &[u8] = b"source_id";
const EPOCH_KEY: &[u8] = b"epoch";
const HEAD_KEY: &[u8] = b"head";
const HORIZON_KEY: &[u8] = b"horizon";

/// Persisted form of an item
#[derive(Debug, Serialize, Deserialize)]
struct ItemRecord {
    content: Vec<u8>,
    hash: ContentHash,
    revision: Revision,
}

/// Snapshot of journal counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalStats {
    pub source_id: SourceId,
    pub epoch: Epoch,
    pub head: Revision,
    pub horizon: Revision,
    pub items: usize,
    pub log_entries: usize,
}

/// Append-only journal of item revisions
pub struct Journal {
    this: Weak<Journal>,
    db: Db,
    items: Tree,
    log: Tree,
    meta: Tree,
    id: SourceId,
    gate: RwLock<()>,
    gc: GarbageCollector,
}

impl Journal {
    /// Open or create a journal at the given path
    pub fn open(path: &Path, policy: RetentionPolicy) -> Result<Arc<Self>> {
        let db = sled::open(path.join("feed.db")).map_err(sled_error)?;
        let items = db.open_tree("items").map_err(sled_error)?;
        let log = db.open_tree("log").map_err(sled_error)?;
        let meta = db.open_tree("meta").map_err(sled_error)?;

        let id = match meta.get(SOURCE_ID_KEY).map_err(sled_error)? {
            Some(raw) => std::str::from_utf8(&raw)
                .map_err(|e| FeedError::Codec(format!("source id: {}", e)))?
                .parse()?,
            None => {
                let id = SourceId::generate();
                meta.insert(SOURCE_ID_KEY, id.to_string().as_bytes())
                    .map_err(sled_error)?;
                meta.insert(EPOCH_KEY, &Epoch::FIRST.get().to_be_bytes()[..])
                    .map_err(sled_error)?;
                db.flush().map_err(sled_error)?;
                info!("Created journal {} at {}", id, path.display());
                id
            }
        };

        Ok(Arc::new_cyclic(|this| Self {
            this: this.clone(),
            db,
            items,
            log,
            meta,
            id,
            gate: RwLock::new(()),
            gc: GarbageCollector::new(policy),
        }))
    }

    /// Create or replace an item, returning the revision of the change
    pub fn put(&self, id: &ItemId, content: impl Into<Bytes>) -> Result<Revision> {
        let content: Bytes = content.into();
        let _gate = self.gate.write();

        let revision = self.read_revision(HEAD_KEY)?.next();
        let record = ItemRecord {
            hash: feed_core::hash_bytes(&content),
            content: content.to_vec(),
            revision,
        };
        let value = bincode::serialize(&record).map_err(codec_error)?;

        (&self.items, &self.log, &self.meta)
            .transaction(|(items, log, meta)| -> ConflictableTransactionResult<(), ()> {
                items.insert(id.as_bytes(), value.as_slice())?;
                log.insert(&revision.to_key()[..], id.as_bytes())?;
                meta.insert(HEAD_KEY, &revision.to_key()[..])?;
                Ok(())
            })
            .map_err(transaction_error)?;

        // Flush to ensure durability
        self.db.flush().map_err(sled_error)?;

        debug!("put {} at revision {}", id, revision);
        Ok(revision)
    }

    /// Delete an item. Returns `None` when the item did not exist.
    pub fn delete(&self, id: &ItemId) -> Result<Option<Revision>> {
        let _gate = self.gate.write();

        if !self.items.contains_key(id.as_bytes()).map_err(sled_error)? {
            return Ok(None);
        }

        let revision = self.read_revision(HEAD_KEY)?.next();
        (&self.items, &self.log, &self.meta)
            .transaction(|(items, log, meta)| -> ConflictableTransactionResult<(), ()> {
                items.remove(id.as_bytes())?;
                log.insert(&revision.to_key()[..], id.as_bytes())?;
                meta.insert(HEAD_KEY, &revision.to_key()[..])?;
                Ok(())
            })
            .map_err(transaction_error)?;

        self.db.flush().map_err(sled_error)?;

        debug!("delete {} at revision {}", id, revision);
        Ok(Some(revision))
    }

    /// Reset history: bump the epoch and reseed the log with every live item
    /// at fresh revisions starting from 1
    pub fn rebuild(&self) -> Result<Epoch> {
        let _gate = self.gate.write();
        let epoch = self.read_epoch()?.next();

        let old_keys = self
            .log
            .iter()
            .keys()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(sled_error)?;

        // sled iterates keys in byte order, which is our reseed order
        let mut reseeded = Vec::new();
        let mut head = Revision::MIN;
        for entry in self.items.iter() {
            let (key, value) = entry.map_err(sled_error)?;
            let mut record: ItemRecord = bincode::deserialize(&value).map_err(codec_error)?;
            head = head.next();
            record.revision = head;
            let value = bincode::serialize(&record).map_err(codec_error)?;
            reseeded.push((head, key, value));
        }

        (&self.items, &self.log, &self.meta)
            .transaction(|(items, log, meta)| -> ConflictableTransactionResult<(), ()> {
                for key in &old_keys {
                    log.remove(&key[..])?;
                }
                for (revision, key, value) in &reseeded {
                    items.insert(&key[..], value.as_slice())?;
                    log.insert(&revision.to_key()[..], &key[..])?;
                }
                meta.insert(EPOCH_KEY, &epoch.get().to_be_bytes()[..])?;
                meta.insert(HEAD_KEY, &head.to_key()[..])?;
                meta.insert(HORIZON_KEY, &Revision::MIN.to_key()[..])?;
                Ok(())
            })
            .map_err(transaction_error)?;

        self.db.flush().map_err(sled_error)?;

        info!(
            "Rebuilt journal {}: epoch {} with {} items",
            self.id, epoch, head
        );
        Ok(epoch)
    }

    /// Compact the log under the configured retention policy
    pub fn gc(&self) -> Result<GcReport> {
        let _gate = self.gate.write();

        let mut entries = Vec::with_capacity(self.log.len());
        for entry in self.log.iter() {
            let (key, value) = entry.map_err(sled_error)?;
            entries.push((decode_revision(&key)?, decode_id(&value)?));
        }

        let head = self.read_revision(HEAD_KEY)?;
        let horizon = self.read_revision(HORIZON_KEY)?;
        let plan = self.gc.plan(head, horizon, &entries, |id| {
            // Unreadable keys count as live, so nothing is purged on error
            self.items.contains_key(id.as_bytes()).unwrap_or(true)
        });

        if !plan.is_empty() {
            (&self.log, &self.meta)
                .transaction(|(log, meta)| -> ConflictableTransactionResult<(), ()> {
                    for revision in &plan.drop {
                        log.remove(&revision.to_key()[..])?;
                    }
                    meta.insert(HORIZON_KEY, &plan.horizon.to_key()[..])?;
                    Ok(())
                })
                .map_err(transaction_error)?;
            self.db.flush().map_err(sled_error)?;
        }

        let report = GcReport {
            superseded_dropped: plan.superseded,
            tombstones_purged: plan.tombstones,
            horizon: plan.horizon,
            log_entries: self.log.len(),
        };
        info!(
            "Compacted journal {}: dropped {} entries, horizon {}",
            self.id,
            report.entries_dropped(),
            report.horizon
        );
        Ok(report)
    }

    /// Revision below which resume points are rejected
    pub fn horizon(&self) -> Result<Revision> {
        self.read_revision(HORIZON_KEY)
    }

    pub fn stats(&self) -> Result<JournalStats> {
        let _gate = self.gate.read();
        Ok(JournalStats {
            source_id: self.id,
            epoch: self.read_epoch()?,
            head: self.read_revision(HEAD_KEY)?,
            horizon: self.read_revision(HORIZON_KEY)?,
            items: self.items.len(),
            log_entries: self.log.len(),
        })
    }

    /// Number of live items
    pub fn count(&self) -> usize {
        self.items.len()
    }

    fn read_revision(&self, key: &[u8]) -> Result<Revision> {
        match self.meta.get(key).map_err(sled_error)? {
            Some(raw) => decode_revision(&raw),
            None => Ok(Revision::MIN),
        }
    }

    fn read_epoch(&self) -> Result<Epoch> {
        match self.meta.get(EPOCH_KEY).map_err(sled_error)? {
            Some(raw) => decode_revision(&raw).map(|r| Epoch::new(r.get())),
            None => Ok(Epoch::FIRST),
        }
    }

    fn source(&self, epoch: Epoch) -> IndexingSource {
        let store: Weak<dyn Store> = self.this.clone();
        IndexingSource::new(self.id, epoch, store)
    }
}

impl Store for Journal {
    fn source_id(&self) -> SourceId {
        self.id
    }

    fn epoch(&self) -> Result<Epoch> {
        let _gate = self.gate.read();
        self.read_epoch()
    }

    fn head(&self) -> Result<Revision> {
        let _gate = self.gate.read();
        self.read_revision(HEAD_KEY)
    }

    fn get(&self, id: &ItemId) -> Result<Lookup<Item>> {
        let raw = match self.items.get(id.as_bytes()).map_err(sled_error)? {
            Some(raw) => raw,
            None => return Ok(Lookup::Absent),
        };

        let record: ItemRecord = bincode::deserialize(&raw).map_err(codec_error)?;
        let item = Item::new(id.clone(), record.content, record.revision);
        if item.content_hash() != record.hash {
            warn!("Content digest mismatch for {}", id);
            return Err(FeedError::storage_msg(format!(
                "content digest mismatch for '{}'",
                id
            )));
        }

        Ok(Lookup::Present(item))
    }

    fn changes(&self, from: Revision, batch_size: usize) -> Result<ChangeSet> {
        let _gate = self.gate.read();
        let epoch = self.read_epoch()?;
        let head = self.read_revision(HEAD_KEY)?;
        let horizon = self.read_revision(HORIZON_KEY)?;

        if !from.is_min() && from < horizon {
            return Err(FeedError::RevisionUnavailable {
                requested: from,
                horizon,
                epoch,
            });
        }

        let mut page = PageBuilder::new(from, batch_size)?;
        for entry in self.log.range(from.next().to_key()..) {
            let (key, value) = entry.map_err(sled_error)?;
            if !page.offer(decode_revision(&key)?, &decode_id(&value)?) {
                break;
            }
        }

        page.finish(head, epoch, self.source(epoch))
    }
}

fn decode_revision(raw: &[u8]) -> Result<Revision> {
    Revision::from_key(raw)
        .ok_or_else(|| FeedError::Codec(format!("invalid revision key of {} bytes", raw.len())))
}

fn decode_id(raw: &[u8]) -> Result<ItemId> {
    ItemId::from_utf8(raw).ok_or_else(|| FeedError::Codec("item id is not UTF-8".to_string()))
}

/// I/O failures may clear up on retry; anything else is a backend fault
fn sled_error(err: sled::Error) -> FeedError {
    match err {
        sled::Error::Io(io) => FeedError::transient_from(io),
        other => FeedError::storage(other),
    }
}

fn transaction_error(err: TransactionError<()>) -> FeedError {
    match err {
        TransactionError::Storage(err) => sled_error(err),
        TransactionError::Abort(()) => FeedError::storage_msg("transaction aborted"),
    }
}

fn codec_error(err: bincode::Error) -> FeedError {
    FeedError::Codec(err.to_string())
}
