//! sled-backed term index
//!
//! Layout:
//! ```text
//! docs     : item id -> bincode(StoredDoc)
//! postings : term    -> bincode(Vec<item id>), sorted
//! ```
//!
//! Postings are updated before the document record, so a crash mid-update
//! leaves a stale digest that forces the next delivery of the id to redo it.

use crate::terms::{normalize, tokenize};
use crate::SemanticIndex;
use feed_core::{ContentHash, FeedError, Item, ItemId, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sled::{Db, Tree};
use std::collections::BTreeSet;

#[derive(Debug, Serialize, Deserialize)]
struct StoredDoc {
    hash: ContentHash,
    terms: Vec<String>,
}

/// Persistent term index sharing a database with its checkpoints
pub struct SledIndex {
    docs: Tree,
    postings: Tree,
    /// Serializes read-modify-write of posting lists
    writer: Mutex<()>,
}

impl SledIndex {
    pub fn open(db: &Db) -> Result<Self> {
        Ok(Self {
            docs: db.open_tree("docs").map_err(sled_error)?,
            postings: db.open_tree("postings").map_err(sled_error)?,
            writer: Mutex::new(()),
        })
    }

    /// Ids whose content contains `term`, sorted
    pub fn search(&self, term: &str) -> Result<Vec<ItemId>> {
        Ok(self
            .read_postings(&normalize(term))?
            .into_iter()
            .map(ItemId::from)
            .collect())
    }

    pub fn contains(&self, id: &ItemId) -> Result<bool> {
        self.docs.contains_key(id.as_bytes()).map_err(sled_error)
    }

    /// Number of distinct terms
    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    fn read_doc(&self, id: &ItemId) -> Result<Option<StoredDoc>> {
        match self.docs.get(id.as_bytes()).map_err(sled_error)? {
            Some(raw) => Ok(Some(bincode::deserialize(&raw).map_err(codec_error)?)),
            None => Ok(None),
        }
    }

    fn read_postings(&self, term: &str) -> Result<BTreeSet<String>> {
        match self.postings.get(term.as_bytes()).map_err(sled_error)? {
            Some(raw) => {
                let ids: Vec<String> = bincode::deserialize(&raw).map_err(codec_error)?;
                Ok(ids.into_iter().collect())
            }
            None => Ok(BTreeSet::new()),
        }
    }

    fn write_postings(&self, term: &str, ids: BTreeSet<String>) -> Result<()> {
        if ids.is_empty() {
            self.postings.remove(term.as_bytes()).map_err(sled_error)?;
        } else {
            let ids: Vec<String> = ids.into_iter().collect();
            let value = bincode::serialize(&ids).map_err(codec_error)?;
            self.postings
                .insert(term.as_bytes(), value)
                .map_err(sled_error)?;
        }
        Ok(())
    }

    fn unlink(&self, id: &ItemId, terms: &[String]) -> Result<()> {
        for term in terms {
            let mut ids = self.read_postings(term)?;
            if ids.remove(id.as_str()) {
                self.write_postings(term, ids)?;
            }
        }
        Ok(())
    }
}

impl SemanticIndex for SledIndex {
    fn index(&self, item: &Item) -> Result<()> {
        let _writer = self.writer.lock();
        let id = item.id();
        let old = self.read_doc(id)?;
        if old.as_ref().map(|doc| doc.hash) == Some(item.content_hash()) {
            return Ok(());
        }

        let terms: Vec<String> = tokenize(&String::from_utf8_lossy(item.content()))
            .into_iter()
            .collect();

        if let Some(old) = &old {
            let stale: Vec<String> = old
                .terms
                .iter()
                .filter(|t| terms.binary_search(*t).is_err())
                .cloned()
                .collect();
            self.unlink(id, &stale)?;
        }

        for term in &terms {
            let mut ids = self.read_postings(term)?;
            if ids.insert(id.as_str().to_string()) {
                self.write_postings(term, ids)?;
            }
        }

        let doc = StoredDoc {
            hash: item.content_hash(),
            terms,
        };
        let value = bincode::serialize(&doc).map_err(codec_error)?;
        self.docs
            .insert(id.as_bytes(), value)
            .map_err(sled_error)?;
        Ok(())
    }

    fn remove(&self, id: &ItemId) -> Result<()> {
        let _writer = self.writer.lock();
        if let Some(old) = self.read_doc(id)? {
            self.unlink(id, &old.terms)?;
            self.docs.remove(id.as_bytes()).map_err(sled_error)?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let _writer = self.writer.lock();
        self.postings.clear().map_err(sled_error)?;
        self.docs.clear().map_err(sled_error)?;
        Ok(())
    }

    fn len(&self) -> usize {
        self.docs.len()
    }
}

fn sled_error(err: sled::Error) -> FeedError {
    match err {
        sled::Error::Io(io) => FeedError::transient_from(io),
        other => FeedError::storage(other),
    }
}

fn codec_error(err: bincode::Error) -> FeedError {
    FeedError::Codec(err.to_string())
}
