//! Apply writes from stdin while a follower keeps the index current
//!
//! Input lines:
//! ```text
//! put <id> <content...>
//! delete <id>
//! # comment
//! ```

use crate::util::Repo;
use anyhow::{Context, Result};
use feed_core::ItemId;
use indexer::{Consumer, Follower, FollowerHandle};
use journal::Journal;
use owo_colors::OwoColorize;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::task::{JoinError, JoinHandle};
use tracing::{info, warn};

pub async fn run(interval_ms: Option<u64>) -> Result<()> {
    let repo = Repo::open()?;
    let handle = repo.open_index()?;
    let interval = interval_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| repo.config.poll_interval());

    let consumer = Consumer::new(
        Arc::clone(&repo.journal),
        Arc::clone(&handle.checkpoints),
        Arc::clone(&handle.index),
        repo.config.consumer_config(),
    );
    let (follower, control) = Follower::new(consumer, interval);
    let mut task = tokio::spawn(follower.run());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let (writes, exited) = pump(&repo.journal, &mut lines, &control, &mut task).await?;

    control.shutdown();
    let joined = match exited {
        Some(joined) => joined,
        None => task.await,
    };
    let (mut consumer, mut report) = joined.context("Follower task panicked")??;

    // Writes that landed after the last pass
    let (consumer, last) = tokio::task::spawn_blocking(move || {
        let last = consumer.run_until_caught_up();
        (consumer, last)
    })
    .await
    .context("Final sync panicked")?;
    report.absorb(last?);
    handle.flush()?;

    println!(
        "{} Followed to revision {}: {} writes, {} indexed, {} removed",
        "✓".green(),
        consumer.checkpoint().revision,
        writes,
        report.indexed,
        report.removed
    );
    if report.resyncs > 0 {
        println!("{}", format!("{} resyncs", report.resyncs).yellow());
    }

    Ok(())
}

/// Apply input lines until they run out, Ctrl-C, or the follower exits.
///
/// Returns the number of writes and, when the follower stopped on its own,
/// its join result.
async fn pump<R, T>(
    journal: &Arc<Journal>,
    lines: &mut Lines<R>,
    control: &FollowerHandle,
    task: &mut JoinHandle<T>,
) -> Result<(usize, Option<Result<T, JoinError>>)>
where
    R: AsyncBufRead + Unpin,
{
    let mut writes = 0usize;
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    return Ok((writes, None));
                };
                let journal = Arc::clone(journal);
                let changed = tokio::task::spawn_blocking(move || apply_line(&journal, &line))
                    .await
                    .context("Write task panicked")??;
                if changed {
                    writes += 1;
                    control.notify();
                }
            }
            joined = &mut *task => {
                warn!("Follower exited, no longer reading input");
                return Ok((writes, Some(joined)));
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                return Ok((writes, None));
            }
        }
    }
}

/// Apply one input line. Returns true when the store changed.
fn apply_line(journal: &Journal, line: &str) -> Result<bool> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(false);
    }

    let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
    match verb {
        "put" => {
            let rest = rest.trim_start();
            let (id, content) = rest.split_once(' ').unwrap_or((rest, ""));
            if id.is_empty() {
                warn!("Ignoring put without an id");
                return Ok(false);
            }
            let id = ItemId::new(id);
            let revision = journal.put(&id, content.to_string())?;
            println!("Put {} at revision {}", id, revision);
            Ok(true)
        }
        "delete" => {
            let id = ItemId::new(rest.trim());
            match journal.delete(&id)? {
                Some(revision) => {
                    println!("Deleted {} at revision {}", id, revision);
                    Ok(true)
                }
                None => {
                    warn!("Item not found: {}", id);
                    Ok(false)
                }
            }
        }
        other => {
            warn!("Ignoring unknown command '{}'", other);
            Ok(false)
        }
    }
}
