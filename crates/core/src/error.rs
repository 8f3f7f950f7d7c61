//! Change-feed error taxonomy
//!
//! Epoch changes are deliberately absent: a ChangeSet carrying a different
//! epoch is a control signal handled by the consumer, not a failure.

use crate::revision::{Epoch, Revision};
use crate::source::SourceId;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum FeedError {
    /// The requested resume point predates the store's retained history
    #[error("revision {requested} predates retained history (horizon {horizon}, epoch {epoch})")]
    RevisionUnavailable {
        requested: Revision,
        horizon: Revision,
        epoch: Epoch,
    },

    /// The resume point lies past the store's head: its history was reset
    #[error("revision {requested} is ahead of head {head} (epoch {epoch})")]
    RevisionAhead {
        requested: Revision,
        head: Revision,
        epoch: Epoch,
    },

    /// Store or item repository unreachable; retry the same call later
    #[error("temporarily unavailable: {message}")]
    Transient {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// A ChangeSet violated a protocol invariant
    #[error("malformed change set: {0}")]
    MalformedChangeSet(String),

    #[error("batch size must be at least 1")]
    InvalidBatchSize,

    /// The store behind an IndexingSource has been dropped
    #[error("indexing source {0} is no longer available")]
    SourceDropped(SourceId),

    /// Backend failure that retrying will not fix
    #[error("storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("codec error: {0}")]
    Codec(String),
}

impl FeedError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
            source: None,
        }
    }

    pub fn transient_from(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transient {
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    pub fn storage(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage {
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    pub fn storage_msg(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedChangeSet(message.into())
    }

    /// Whether retrying the same call after a backoff may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Whether the consumer must halt and wait for an operator
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::Transient { .. }
                | Self::RevisionUnavailable { .. }
                | Self::RevisionAhead { .. }
        )
    }
}

/// Result type for change-feed operations
pub type Result<T> = std::result::Result<T, FeedError>;
