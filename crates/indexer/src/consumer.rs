//! Consumer state machine
//!
//! ```text
//! INIT -> STREAMING <-> CAUGHT_UP
//!            |   ^
//!            v   |
//!          RESYNC        any fatal error -> FAILED
//! ```
//!
//! The checkpoint only advances after every id of a page has been applied,
//! so a crash mid-page replays that page on restart. Both index operations
//! are idempotent, which makes the replay harmless.

use crate::SemanticIndex;
use feed_core::{
    ChangeSet, Checkpoint, CheckpointStore, Epoch, FeedError, ItemId, Lookup, Revision, SourceId,
    Store,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Upper bound on resyncs inside a single step. A store that keeps changing
/// epochs under the consumer surfaces as a transient error instead of a spin.
const MAX_RESYNCS_PER_STEP: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Init,
    Streaming,
    Resync,
    CaughtUp,
    Failed,
}

impl std::fmt::Display for ConsumerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Streaming => "streaming",
            Self::Resync => "resync",
            Self::CaughtUp => "caught-up",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Consumer configuration
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Key the checkpoint is stored under
    pub consumer_id: String,
    /// Maximum ids per page (default: 256)
    pub batch_size: usize,
    /// Attempts per operation before a transient error is surfaced (default: 5)
    pub max_retries: u32,
    /// Base backoff, multiplied by the attempt number (default: 200ms)
    pub retry_backoff: Duration,
    /// Pages per `run_until_caught_up` call, 0 for unbounded
    pub max_batches: usize,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            consumer_id: "default".to_string(),
            batch_size: 256,
            max_retries: 5,
            retry_backoff: Duration::from_millis(200),
            max_batches: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumerEvent {
    EpochChanged {
        previous: Option<Epoch>,
        current: Epoch,
    },
    /// Pages now come from a different store than the checkpoint's
    SourceChanged {
        previous: SourceId,
        current: SourceId,
    },
    ResyncTriggered {
        requested: Revision,
        horizon: Revision,
    },
    /// The checkpoint lies past the head of its own store and epoch
    HistoryReset {
        requested: Revision,
        head: Revision,
    },
    BatchApplied {
        from: Revision,
        to: Revision,
        indexed: usize,
        removed: usize,
    },
    CaughtUp {
        at: Revision,
    },
    Retried {
        attempt: u32,
        operation: &'static str,
    },
}

/// Outcome of one `step`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Applied {
        from: Revision,
        to: Revision,
        indexed: usize,
        removed: usize,
    },
    CaughtUp {
        at: Revision,
    },
}

#[derive(Debug, Default, Clone)]
pub struct RunReport {
    pub batches: usize,
    pub indexed: usize,
    pub removed: usize,
    pub resyncs: usize,
    pub retries: usize,
    pub caught_up: bool,
    pub checkpoint: Checkpoint,
    pub events: Vec<ConsumerEvent>,
}

impl RunReport {
    /// Fold a later report into this one
    pub fn absorb(&mut self, other: RunReport) {
        self.batches += other.batches;
        self.indexed += other.indexed;
        self.removed += other.removed;
        self.resyncs += other.resyncs;
        self.retries += other.retries;
        self.caught_up = other.caught_up;
        self.checkpoint = other.checkpoint;
        self.events.extend(other.events);
    }

    fn record(&mut self, events: Vec<ConsumerEvent>) {
        for event in &events {
            match event {
                ConsumerEvent::EpochChanged {
                    previous: Some(_), ..
                }
                | ConsumerEvent::SourceChanged { .. }
                | ConsumerEvent::ResyncTriggered { .. }
                | ConsumerEvent::HistoryReset { .. } => self.resyncs += 1,
                ConsumerEvent::Retried { .. } => self.retries += 1,
                _ => {}
            }
        }
        self.events.extend(events);
    }
}

#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error("{operation} still failing after {attempts} attempts: {source}")]
    RetriesExhausted {
        operation: &'static str,
        attempts: u32,
        #[source]
        source: FeedError,
    },

    #[error("consumer halted after a fatal error")]
    Halted,

    #[error("consumer task failed: {0}")]
    Task(String),
}

impl ConsumerError {
    /// Whether the consumer stays down until an operator intervenes
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Feed(err) => err.is_fatal(),
            Self::RetriesExhausted { .. } => false,
            Self::Halted | Self::Task(_) => true,
        }
    }
}

/// Pulls pages from a store and applies them to an index
pub struct Consumer<S: Store + ?Sized, C: CheckpointStore, I: SemanticIndex> {
    store: Arc<S>,
    checkpoints: C,
    index: I,
    config: ConsumerConfig,
    state: ConsumerState,
    checkpoint: Checkpoint,
    events: Vec<ConsumerEvent>,
}

impl<S, C, I> Consumer<S, C, I>
where
    S: Store + ?Sized,
    C: CheckpointStore,
    I: SemanticIndex,
{
    pub fn new(store: Arc<S>, checkpoints: C, index: I, config: ConsumerConfig) -> Self {
        Self {
            store,
            checkpoints,
            index,
            config,
            state: ConsumerState::Init,
            checkpoint: Checkpoint::initial(),
            events: Vec::new(),
        }
    }

    /// Load the persisted checkpoint, if any
    pub fn init(&mut self) -> Result<(), ConsumerError> {
        if self.config.batch_size == 0 {
            return Err(self.fail(FeedError::InvalidBatchSize.into()));
        }

        let loaded = match self.checkpoints.load(&self.config.consumer_id) {
            Ok(loaded) => loaded,
            Err(err) => return Err(self.fail(err.into())),
        };
        self.checkpoint = loaded.unwrap_or_default();
        self.state = ConsumerState::Streaming;
        info!(
            "Consumer {} starting at revision {} (epoch {})",
            self.config.consumer_id,
            self.checkpoint.revision,
            self.checkpoint
                .epoch
                .map(|e| e.to_string())
                .unwrap_or_else(|| "-".to_string())
        );
        Ok(())
    }

    /// Pull and apply at most one page
    pub fn step(&mut self) -> Result<Step, ConsumerError> {
        match self.state {
            ConsumerState::Failed => return Err(ConsumerError::Halted),
            ConsumerState::Init => self.init()?,
            _ => {}
        }

        let set = self.pull()?;
        self.apply(set)
    }

    /// Step until the store reports nothing new, or `max_batches` pages
    pub fn run_until_caught_up(&mut self) -> Result<RunReport, ConsumerError> {
        let mut report = RunReport::default();
        let result = loop {
            if self.config.max_batches > 0 && report.batches >= self.config.max_batches {
                break Ok(());
            }
            match self.step() {
                Ok(Step::Applied { .. }) => report.batches += 1,
                Ok(Step::CaughtUp { .. }) => {
                    report.caught_up = true;
                    break Ok(());
                }
                Err(err) => break Err(err),
            }
        };

        let events = self.drain_events();
        for event in &events {
            if let ConsumerEvent::BatchApplied {
                indexed, removed, ..
            } = event
            {
                report.indexed += indexed;
                report.removed += removed;
            }
        }
        report.record(events);
        report.checkpoint = self.checkpoint;
        result.map(|()| report)
    }

    pub fn state(&self) -> ConsumerState {
        self.state
    }

    pub fn checkpoint(&self) -> Checkpoint {
        self.checkpoint
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Events recorded since the last drain
    pub fn drain_events(&mut self) -> Vec<ConsumerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Clear a failure so the next step reloads the checkpoint
    pub fn recover(&mut self) {
        if self.state == ConsumerState::Failed {
            self.state = ConsumerState::Init;
        }
    }

    pub fn into_parts(self) -> (Arc<S>, C, I) {
        (self.store, self.checkpoints, self.index)
    }

    /// Fetch the next page that continues the checkpoint, resyncing as needed
    fn pull(&mut self) -> Result<ChangeSet, ConsumerError> {
        for _ in 0..=MAX_RESYNCS_PER_STEP {
            let requested = self.checkpoint.revision;
            let store = Arc::clone(&self.store);
            let batch_size = self.config.batch_size;
            let result = retry(&self.config, &mut self.events, "changes", || {
                store.changes(requested, batch_size)
            });

            let set = match result {
                Ok(set) => set,
                Err(ConsumerError::Feed(FeedError::RevisionUnavailable {
                    requested,
                    horizon,
                    epoch,
                })) => {
                    warn!(
                        "Revision {} predates horizon {}, resyncing",
                        requested, horizon
                    );
                    self.events
                        .push(ConsumerEvent::ResyncTriggered { requested, horizon });
                    self.resync(self.store.source_id(), epoch)?;
                    continue;
                }
                Err(ConsumerError::Feed(FeedError::RevisionAhead {
                    requested,
                    head,
                    epoch,
                })) => {
                    if self.checkpoint.epoch == Some(epoch) {
                        warn!(
                            "Revision {} is ahead of head {}, resyncing",
                            requested, head
                        );
                        self.events
                            .push(ConsumerEvent::HistoryReset { requested, head });
                    } else {
                        self.epoch_changed(epoch);
                    }
                    self.resync(self.store.source_id(), epoch)?;
                    continue;
                }
                Err(err) => return Err(self.fail(err)),
            };

            let source = set.indexing_source();
            if source.is_continuous_with(&self.checkpoint) {
                return Ok(set);
            }

            let (current, epoch) = (source.source_id(), set.epoch());
            match self.checkpoint.source {
                Some(previous) if previous != current => {
                    info!("Store changed from {} to {}, resyncing", previous, current);
                    self.events
                        .push(ConsumerEvent::SourceChanged { previous, current });
                }
                _ => self.epoch_changed(epoch),
            }
            self.resync(current, epoch)?;
            if requested.is_min() {
                return Ok(set);
            }
        }

        Err(self.fail(
            FeedError::transient("store kept changing epochs during resync").into(),
        ))
    }

    fn epoch_changed(&mut self, current: Epoch) {
        match self.checkpoint.epoch {
            Some(previous) => info!("Epoch changed from {} to {}, resyncing", previous, current),
            None => debug!("Adopting epoch {}", current),
        }
        self.events.push(ConsumerEvent::EpochChanged {
            previous: self.checkpoint.epoch,
            current,
        });
    }

    fn resync(&mut self, source: SourceId, epoch: Epoch) -> Result<(), ConsumerError> {
        self.state = ConsumerState::Resync;
        if let Err(err) = self.index.clear() {
            return Err(self.fail(err.into()));
        }
        self.checkpoint = Checkpoint::resync(source, epoch);
        if let Err(err) = self
            .checkpoints
            .save(&self.config.consumer_id, self.checkpoint)
        {
            return Err(self.fail(err.into()));
        }
        Ok(())
    }

    fn apply(&mut self, set: ChangeSet) -> Result<Step, ConsumerError> {
        let requested = self.checkpoint.revision;
        if let Err(err) = set.validate_after(requested, self.config.batch_size) {
            return Err(self.fail(err.into()));
        }

        let (from, to, epoch) = (set.from_revision(), set.to_revision(), set.epoch());
        let source = set.indexing_source().source_id();
        if set.is_empty() && to == requested {
            self.state = ConsumerState::CaughtUp;
            self.events.push(ConsumerEvent::CaughtUp { at: to });
            debug!("Caught up at revision {}", to);
            return Ok(Step::CaughtUp { at: to });
        }

        self.state = ConsumerState::Streaming;
        let mut indexed = 0;
        let mut removed = 0;
        for id in set {
            match self.apply_one(&id) {
                Ok(true) => indexed += 1,
                Ok(false) => removed += 1,
                Err(err) => return Err(self.fail(err)),
            }
        }

        let next = Checkpoint::new(source, epoch, to);
        if let Err(err) = self.checkpoints.save(&self.config.consumer_id, next) {
            return Err(self.fail(err.into()));
        }
        self.checkpoint = next;

        debug!(
            "Applied {}..={} ({} indexed, {} removed)",
            from, to, indexed, removed
        );
        self.events.push(ConsumerEvent::BatchApplied {
            from,
            to,
            indexed,
            removed,
        });
        Ok(Step::Applied {
            from,
            to,
            indexed,
            removed,
        })
    }

    /// Returns true when the id was indexed, false when it was removed
    fn apply_one(&mut self, id: &ItemId) -> Result<bool, ConsumerError> {
        let store = Arc::clone(&self.store);
        let lookup = retry(&self.config, &mut self.events, "get", || store.get(id))?;
        match lookup {
            Lookup::Present(item) => {
                let index = &self.index;
                retry(&self.config, &mut self.events, "index", || index.index(&item))?;
                Ok(true)
            }
            Lookup::Absent => {
                let index = &self.index;
                retry(&self.config, &mut self.events, "remove", || index.remove(id))?;
                Ok(false)
            }
        }
    }

    /// Record a failure. Fatal errors halt the consumer until `recover`.
    fn fail(&mut self, err: ConsumerError) -> ConsumerError {
        if err.is_fatal() {
            warn!("Consumer {} failed: {}", self.config.consumer_id, err);
            self.state = ConsumerState::Failed;
        } else if self.state != ConsumerState::Resync {
            self.state = ConsumerState::Streaming;
        }
        err
    }
}

/// Run `op`, retrying transient errors with a linear backoff
fn retry<T>(
    config: &ConsumerConfig,
    events: &mut Vec<ConsumerEvent>,
    operation: &'static str,
    mut op: impl FnMut() -> feed_core::Result<T>,
) -> Result<T, ConsumerError> {
    let attempts = config.max_retries.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() => {
                if attempt >= attempts {
                    return Err(ConsumerError::RetriesExhausted {
                        operation,
                        attempts,
                        source: err,
                    });
                }
                warn!(
                    "{} failed (attempt {}/{}): {}",
                    operation, attempt, attempts, err
                );
                events.push(ConsumerEvent::Retried { attempt, operation });
                std::thread::sleep(config.retry_backoff * attempt);
                attempt += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }
}
