//! Process-local term index

use crate::terms::{normalize, tokenize, Terms};
use crate::SemanticIndex;
use ahash::AHashSet;
use dashmap::DashMap;
use feed_core::{ContentHash, Item, ItemId, Result};

#[derive(Debug, Clone)]
struct Document {
    hash: ContentHash,
    terms: Terms,
}

/// Term index held in memory
///
/// Re-indexing an item whose content digest is unchanged is a no-op.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    docs: DashMap<ItemId, Document>,
    postings: DashMap<String, AHashSet<ItemId>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.docs.contains_key(id)
    }

    /// Digest of the indexed content of `id`
    pub fn content_hash(&self, id: &ItemId) -> Option<ContentHash> {
        self.docs.get(id).map(|doc| doc.hash)
    }

    /// Ids whose content contains `term`, sorted
    pub fn search(&self, term: &str) -> Vec<ItemId> {
        let mut hits: Vec<ItemId> = self
            .postings
            .get(&normalize(term))
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default();
        hits.sort();
        hits
    }

    /// All indexed ids, sorted
    pub fn ids(&self) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self.docs.iter().map(|doc| doc.key().clone()).collect();
        ids.sort();
        ids
    }

    fn unlink(&self, id: &ItemId, terms: &Terms) {
        for term in terms {
            let now_empty = match self.postings.get_mut(term) {
                Some(mut ids) => {
                    ids.remove(id);
                    ids.is_empty()
                }
                None => false,
            };
            if now_empty {
                self.postings.remove_if(term, |_, ids| ids.is_empty());
            }
        }
    }
}

impl SemanticIndex for MemoryIndex {
    fn index(&self, item: &Item) -> Result<()> {
        let id = item.id();
        let hash = item.content_hash();
        if self.content_hash(id) == Some(hash) {
            return Ok(());
        }

        if let Some((_, old)) = self.docs.remove(id) {
            self.unlink(id, &old.terms);
        }

        let terms = tokenize(&String::from_utf8_lossy(item.content()));
        for term in &terms {
            self.postings
                .entry(term.clone())
                .or_default()
                .insert(id.clone());
        }
        self.docs.insert(id.clone(), Document { hash, terms });
        Ok(())
    }

    fn remove(&self, id: &ItemId) -> Result<()> {
        if let Some((_, old)) = self.docs.remove(id) {
            self.unlink(id, &old.terms);
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.docs.clear();
        self.postings.clear();
        Ok(())
    }

    fn len(&self) -> usize {
        self.docs.len()
    }
}
