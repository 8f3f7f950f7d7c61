//! The store boundary consumed by indexers

use crate::changeset::ChangeSet;
use crate::error::Result;
use crate::item::{Item, ItemId, Lookup};
use crate::revision::{Epoch, Revision};
use crate::source::SourceId;

/// A monotonically versioned item store with a pageable change history
///
/// Implementations must tolerate concurrent writers: a returned ChangeSet is
/// a consistent snapshot of the range it reports, even if the head has moved
/// on by the time the caller looks at it. Callers take no locks.
pub trait Store: Send + Sync {
    /// Stable identity of this store across restarts
    fn source_id(&self) -> SourceId;

    /// Epoch the store is currently numbering revisions in
    fn epoch(&self) -> Result<Epoch>;

    /// Latest assigned revision in the current epoch
    fn head(&self) -> Result<Revision>;

    /// Point lookup. Deleted or unknown ids yield `Lookup::Absent`.
    fn get(&self, id: &ItemId) -> Result<Lookup<Item>>;

    /// Next page of changes strictly after `from`, holding at most
    /// `batch_size` distinct ids
    fn changes(&self, from: Revision, batch_size: usize) -> Result<ChangeSet>;
}
