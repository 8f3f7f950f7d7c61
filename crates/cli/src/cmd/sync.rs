//! Bring the index up to date with the store

use crate::util::Repo;
use anyhow::{Context, Result};
use feed_core::Store;
use indexer::{Consumer, ConsumerEvent, RunReport, Step};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::sync::Arc;

pub fn run(consumer_id: Option<String>, batch_size: Option<usize>) -> Result<()> {
    let repo = Repo::open()?;
    let handle = repo.open_index()?;

    let mut config = repo.config.consumer_config();
    if let Some(id) = consumer_id {
        config.consumer_id = id;
    }
    if let Some(size) = batch_size {
        anyhow::ensure!(size > 0, "--batch-size must be at least 1");
        config.batch_size = size;
    }

    let mut consumer = Consumer::new(
        Arc::clone(&repo.journal),
        Arc::clone(&handle.checkpoints),
        Arc::clone(&handle.index),
        config,
    );

    let head = repo.journal.head()?;
    let progress = ProgressBar::new(head.get());
    progress.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("Invalid progress template")?
            .progress_chars("#>-"),
    );

    let mut report = RunReport::default();
    let at = loop {
        match consumer.step() {
            Ok(Step::Applied {
                to,
                indexed,
                removed,
                ..
            }) => {
                report.batches += 1;
                report.indexed += indexed;
                report.removed += removed;
                progress.set_length(repo.journal.head()?.get().max(to.get()));
                progress.set_position(to.get());
            }
            Ok(Step::CaughtUp { at }) => break at,
            Err(err) => {
                progress.abandon();
                handle.flush()?;
                return Err(err).context("Sync failed; the checkpoint marks the last complete batch");
            }
        }
    };
    progress.finish_and_clear();
    handle.flush()?;

    for event in consumer.drain_events() {
        match event {
            ConsumerEvent::EpochChanged {
                previous: Some(previous),
                current,
            } => {
                report.resyncs += 1;
                println!(
                    "{}",
                    format!("Epoch changed ({} -> {}), index rebuilt", previous, current).yellow()
                );
            }
            ConsumerEvent::SourceChanged { previous, current } => {
                report.resyncs += 1;
                println!(
                    "{}",
                    format!("Store replaced ({} -> {}), index rebuilt", previous, current)
                        .yellow()
                );
            }
            ConsumerEvent::HistoryReset { requested, head } => {
                report.resyncs += 1;
                println!(
                    "{}",
                    format!(
                        "Revision {} is past head {}, index rebuilt",
                        requested, head
                    )
                    .yellow()
                );
            }
            ConsumerEvent::ResyncTriggered { requested, horizon } => {
                report.resyncs += 1;
                println!(
                    "{}",
                    format!(
                        "Revision {} predates horizon {}, index rebuilt",
                        requested, horizon
                    )
                    .yellow()
                );
            }
            ConsumerEvent::Retried { .. } => report.retries += 1,
            _ => {}
        }
    }

    let checkpoint = consumer.checkpoint();
    let epoch = checkpoint
        .epoch
        .map(|e| e.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{} Synced to revision {} (epoch {}): {} indexed, {} removed in {} batches",
        "✓".green(),
        at,
        epoch,
        report.indexed,
        report.removed,
        report.batches
    );
    if report.retries > 0 {
        println!("{}", format!("{} transient failures retried", report.retries).dimmed());
    }

    Ok(())
}
