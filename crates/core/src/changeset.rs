//! Bounded pages of change history
//!
//! A ChangeSet pairs a range descriptor (from/to/epoch) with a single-pass
//! sequence of changed ids. Iterating consumes it: re-scanning a range means
//! asking the store again.

use crate::error::{FeedError, Result};
use crate::item::ItemId;
use crate::revision::{Epoch, Revision};
use crate::source::IndexingSource;
use ahash::AHashSet;

/// One page of a store's change history
#[derive(Debug)]
pub struct ChangeSet {
    from: Revision,
    to: Revision,
    epoch: Epoch,
    changed: Vec<ItemId>,
    source: IndexingSource,
}

impl ChangeSet {
    /// Build a page, rejecting inverted ranges and repeated ids
    pub fn new(
        from: Revision,
        to: Revision,
        epoch: Epoch,
        changed: Vec<ItemId>,
        source: IndexingSource,
    ) -> Result<Self> {
        if from > to {
            return Err(FeedError::malformed(format!(
                "inverted range {}..={}",
                from, to
            )));
        }

        let mut seen = AHashSet::with_capacity(changed.len());
        for id in &changed {
            if !seen.insert(id) {
                return Err(FeedError::malformed(format!("id '{}' listed twice", id)));
            }
        }

        Ok(Self {
            from,
            to,
            epoch,
            changed,
            source,
        })
    }

    /// Empty page for a caller that already holds everything up to `at`
    pub fn caught_up(at: Revision, epoch: Epoch, source: IndexingSource) -> Self {
        Self {
            from: at,
            to: at,
            epoch,
            changed: Vec::new(),
            source,
        }
    }

    /// Lowest revision covered (inclusive)
    pub fn from_revision(&self) -> Revision {
        self.from
    }

    /// Highest revision covered (inclusive)
    pub fn to_revision(&self) -> Revision {
        self.to
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Changed ids in revision order, for inspection without consuming
    pub fn changed(&self) -> &[ItemId] {
        &self.changed
    }

    pub fn len(&self) -> usize {
        self.changed.len()
    }

    /// An empty page means "caught up to `to_revision`", not end of stream
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    pub fn indexing_source(&self) -> &IndexingSource {
        &self.source
    }

    /// Check this page continues right after `previous`
    ///
    /// Only meaningful when the page comes from the store and epoch
    /// `previous` was remembered in.
    pub fn validate_after(&self, previous: Revision, batch_size: usize) -> Result<()> {
        if self.changed.len() > batch_size {
            return Err(FeedError::malformed(format!(
                "{} ids exceed batch size {}",
                self.changed.len(),
                batch_size
            )));
        }

        if self.to < previous {
            return Err(FeedError::malformed(format!(
                "range ends at {} before resume point {}",
                self.to, previous
            )));
        }

        let contiguous = self.from == previous.next();
        let idle = self.changed.is_empty() && self.from == previous && self.to == previous;
        if !contiguous && !idle {
            return Err(FeedError::malformed(format!(
                "range {}..={} does not continue from {}",
                self.from, self.to, previous
            )));
        }

        Ok(())
    }
}

impl IntoIterator for ChangeSet {
    type Item = ItemId;
    type IntoIter = Changed;

    fn into_iter(self) -> Changed {
        Changed {
            inner: self.changed.into_iter(),
        }
    }
}

/// Forward-only iterator over the ids of a consumed ChangeSet
#[derive(Debug)]
pub struct Changed {
    inner: std::vec::IntoIter<ItemId>,
}

impl Iterator for Changed {
    type Item = ItemId;

    fn next(&mut self) -> Option<ItemId> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Changed {}

impl std::iter::FusedIterator for Changed {}

/// Accumulates log entries into one page
///
/// Stores feed entries strictly after the resume point in revision order.
/// An entry for an id already on the page extends the range without growing
/// the page; the first entry that would add a `batch_size + 1`-th id closes
/// it. Every change inside the reported range is therefore represented.
#[derive(Debug)]
pub struct PageBuilder {
    requested: Revision,
    batch_size: usize,
    seen: AHashSet<ItemId>,
    changed: Vec<ItemId>,
    to: Revision,
    full: bool,
}

impl PageBuilder {
    pub fn new(requested: Revision, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(FeedError::InvalidBatchSize);
        }

        Ok(Self {
            requested,
            batch_size,
            seen: AHashSet::new(),
            changed: Vec::new(),
            to: requested,
            full: false,
        })
    }

    /// Offer the next log entry. Returns false once the page is closed; the
    /// rejected entry belongs to the next page.
    pub fn offer(&mut self, revision: Revision, id: &ItemId) -> bool {
        if self.full {
            return false;
        }

        if self.seen.contains(id) {
            self.to = revision;
            return true;
        }

        if self.changed.len() == self.batch_size {
            self.full = true;
            return false;
        }

        self.seen.insert(id.clone());
        self.changed.push(id.clone());
        self.to = revision;
        true
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Close the page. When the log ran out before the page filled, the
    /// range extends to `head` so trailing revisions without surviving log
    /// entries are still covered.
    ///
    /// A resume point past `head` cannot come from this epoch's history and
    /// fails with [`FeedError::RevisionAhead`].
    pub fn finish(self, head: Revision, epoch: Epoch, source: IndexingSource) -> Result<ChangeSet> {
        if self.requested > head {
            return Err(FeedError::RevisionAhead {
                requested: self.requested,
                head,
                epoch,
            });
        }

        let to = if self.full { self.to } else { head.max(self.to) };

        if to <= self.requested {
            return Ok(ChangeSet::caught_up(self.requested, epoch, source));
        }

        ChangeSet::new(self.requested.next(), to, epoch, self.changed, source)
    }
}
