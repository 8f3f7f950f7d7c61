//! Async follower
//!
//! Re-arms a consumer whenever the poll interval elapses or a writer signals
//! new changes, until shut down. The consumer itself is synchronous and runs
//! on the blocking pool.

use crate::consumer::{Consumer, ConsumerError, RunReport};
use crate::SemanticIndex;
use feed_core::{CheckpointStore, Store};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Drives a consumer until shut down
pub struct Follower<S: Store + ?Sized, C: CheckpointStore, I: SemanticIndex> {
    consumer: Consumer<S, C, I>,
    /// Poll interval (default: 1 second)
    interval: Duration,
    trigger: Arc<Notify>,
    shutdown: watch::Receiver<bool>,
}

/// Control side of a running follower
#[derive(Clone)]
pub struct FollowerHandle {
    trigger: Arc<Notify>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl FollowerHandle {
    /// Wake the follower ahead of its next tick
    pub fn notify(&self) {
        self.trigger.notify_one();
    }

    /// Stop after the pass in progress, if any
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

impl<S, C, I> Follower<S, C, I>
where
    S: Store + ?Sized + 'static,
    C: CheckpointStore + 'static,
    I: SemanticIndex + 'static,
{
    pub fn new(consumer: Consumer<S, C, I>, interval: Duration) -> (Self, FollowerHandle) {
        let trigger = Arc::new(Notify::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let follower = Self {
            consumer,
            interval,
            trigger: Arc::clone(&trigger),
            shutdown: shutdown_rx,
        };
        let handle = FollowerHandle {
            trigger,
            shutdown: Arc::new(shutdown_tx),
        };
        (follower, handle)
    }

    /// Run until shutdown. Returns the consumer and the accumulated report.
    ///
    /// Non-fatal errors are logged and retried on the next wake-up. A fatal
    /// error ends the loop.
    pub async fn run(self) -> Result<(Consumer<S, C, I>, RunReport), ConsumerError> {
        let Follower {
            mut consumer,
            interval: period,
            trigger,
            mut shutdown,
        } = self;

        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut total = RunReport::default();

        info!("Following (interval: {:?})", period);

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                _ = trigger.notified() => debug!("Woken by writer"),
                _ = timer.tick() => {}
            }

            let (returned, result) = tokio::task::spawn_blocking(move || {
                let result = consumer.run_until_caught_up();
                (consumer, result)
            })
            .await
            .map_err(|e| ConsumerError::Task(e.to_string()))?;
            consumer = returned;

            match result {
                Ok(mut report) => {
                    for event in std::mem::take(&mut report.events) {
                        debug!("{:?}", event);
                    }
                    if report.batches > 0 {
                        info!(
                            "Applied {} batches ({} indexed, {} removed), checkpoint {}",
                            report.batches,
                            report.indexed,
                            report.removed,
                            report.checkpoint.revision
                        );
                    }
                    total.absorb(report);
                }
                Err(err) if err.is_fatal() => {
                    warn!("Follower stopping: {}", err);
                    return Err(err);
                }
                Err(err) => warn!("Pass failed, retrying on next wake-up: {}", err),
            }
        }

        info!("Follower stopped at revision {}", consumer.checkpoint().revision);
        Ok((consumer, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::ConsumerConfig;
    use crate::MemoryIndex;
    use feed_core::{MemoryCheckpoints, Revision};
    use journal::MemoryStore;
    use tokio::time::{sleep, timeout};

    async fn wait_for(index: &MemoryIndex, len: usize) {
        timeout(Duration::from_secs(5), async {
            while index.len() != len {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("index never reached expected size");
    }

    #[tokio::test]
    async fn test_follower_picks_up_writes() {
        let store = MemoryStore::new();
        store.put("A", "alpha");
        store.put("B", "beta");

        let index = Arc::new(MemoryIndex::new());
        let consumer = Consumer::new(
            Arc::clone(&store),
            MemoryCheckpoints::new(),
            Arc::clone(&index),
            ConsumerConfig::default(),
        );
        // Long interval so the second pass must come from the notification
        let (follower, handle) = Follower::new(consumer, Duration::from_secs(3600));
        let task = tokio::spawn(follower.run());

        wait_for(&index, 2).await;

        store.put("C", "gamma");
        handle.notify();
        wait_for(&index, 3).await;

        handle.shutdown();
        let (consumer, report) = task.await.unwrap().unwrap();
        assert_eq!(report.indexed, 3);
        assert_eq!(consumer.checkpoint().revision, Revision::new(3));
        assert_eq!(index.search("gamma").len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_before_first_pass() {
        let store = MemoryStore::new();
        let consumer = Consumer::new(
            store,
            MemoryCheckpoints::new(),
            MemoryIndex::new(),
            ConsumerConfig::default(),
        );
        let (follower, handle) = Follower::new(consumer, Duration::from_secs(3600));
        handle.shutdown();

        let (_, report) = follower.run().await.unwrap();
        assert_eq!(report.batches, 0);
    }
}
