//! Query the term index

use crate::util::{self, Repo};
use anyhow::Result;
use feed_core::{CheckpointStore, Lookup, Store};
use owo_colors::OwoColorize;

pub fn run(term: &str, limit: usize) -> Result<()> {
    let repo = Repo::open()?;
    let handle = repo.open_index()?;
    let hits = handle.index.search(term)?;

    if hits.is_empty() {
        println!("No items match '{}'", term);
    } else {
        for id in hits.iter().take(limit) {
            // The index may lag the store; show what the store holds now
            let preview = match repo.journal.get(id)? {
                Lookup::Present(item) => {
                    util::preview(&String::from_utf8_lossy(item.content()), 60)
                }
                Lookup::Absent => "(deleted since last sync)".to_string(),
            };
            println!("{}  {}", id, preview.dimmed());
        }
        if hits.len() > limit {
            println!("{}", format!("... and {} more", hits.len() - limit).dimmed());
        }
    }

    let consumer = &repo.config.consumer.consumer_id;
    let head = repo.journal.head()?;
    let (source, epoch) = (repo.journal.source_id(), repo.journal.epoch()?);
    let behind = match handle.checkpoints.load(consumer)? {
        Some(checkpoint) => !checkpoint.matches(source, epoch) || checkpoint.revision < head,
        None => !head.is_min(),
    };
    if behind {
        println!();
        println!(
            "{}",
            "Note: the index is behind the store. Run 'sfeed sync' to catch up.".dimmed()
        );
    }

    Ok(())
}
