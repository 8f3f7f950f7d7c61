//! Persistent consumer checkpoints
//!
//! Checkpoints belong next to the index they describe, so this store takes a
//! tree from whatever database holds that index rather than the journal's.

use feed_core::{Checkpoint, CheckpointStore, FeedError, Result};
use sled::{Db, Tree};
use tracing::debug;

const TREE_NAME: &str = "checkpoints";

/// Checkpoints keyed by consumer id in a sled tree
#[derive(Clone)]
pub struct SledCheckpoints {
    tree: Tree,
}

impl SledCheckpoints {
    pub fn new(tree: Tree) -> Self {
        Self { tree }
    }

    /// Use the `checkpoints` tree of an open database
    pub fn open(db: &Db) -> Result<Self> {
        let tree = db.open_tree(TREE_NAME).map_err(FeedError::storage)?;
        Ok(Self::new(tree))
    }

    /// All stored checkpoints, ordered by consumer id
    pub fn list(&self) -> Result<Vec<(String, Checkpoint)>> {
        let mut out = Vec::new();
        for entry in self.tree.iter() {
            let (key, value) = entry.map_err(FeedError::storage)?;
            let consumer = String::from_utf8_lossy(&key).into_owned();
            out.push((consumer, decode(&value)?));
        }
        Ok(out)
    }
}

impl CheckpointStore for SledCheckpoints {
    fn load(&self, consumer: &str) -> Result<Option<Checkpoint>> {
        match self.tree.get(consumer.as_bytes()).map_err(FeedError::storage)? {
            Some(raw) => Ok(Some(decode(&raw)?)),
            None => Ok(None),
        }
    }

    fn save(&self, consumer: &str, checkpoint: Checkpoint) -> Result<()> {
        let value = bincode::serialize(&checkpoint).map_err(|e| FeedError::Codec(e.to_string()))?;
        self.tree
            .insert(consumer.as_bytes(), value)
            .map_err(FeedError::storage)?;
        self.tree.flush().map_err(FeedError::storage)?;
        debug!(
            "checkpoint {} -> epoch {:?} revision {}",
            consumer, checkpoint.epoch, checkpoint.revision
        );
        Ok(())
    }
}

fn decode(raw: &[u8]) -> Result<Checkpoint> {
    bincode::deserialize(raw).map_err(|e| FeedError::Codec(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use feed_core::{Epoch, Revision, SourceId};
    use tempfile::TempDir;

    #[test]
    fn test_checkpoints_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let checkpoint = Checkpoint::new(SourceId::generate(), Epoch::new(2), Revision::new(40));
        {
            let db = sled::open(dir.path()).unwrap();
            let store = SledCheckpoints::open(&db).unwrap();
            assert_eq!(store.load("search").unwrap(), None);
            store.save("search", checkpoint).unwrap();
        }

        let db = sled::open(dir.path()).unwrap();
        let store = SledCheckpoints::open(&db).unwrap();
        assert_eq!(store.load("search").unwrap(), Some(checkpoint));
        assert_eq!(store.list().unwrap().len(), 1);
    }
}
