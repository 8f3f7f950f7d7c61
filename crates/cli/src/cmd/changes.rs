//! Inspect a change set

use crate::util::Repo;
use anyhow::Result;
use feed_core::{Revision, Store};
use owo_colors::OwoColorize;

pub fn run(from: u64, limit: Option<usize>, json: bool) -> Result<()> {
    let repo = Repo::open()?;
    let batch_size = limit.unwrap_or(repo.config.consumer.batch_size);
    let requested = Revision::new(from);

    let set = repo.journal.changes(requested, batch_size)?;

    if json {
        let value = serde_json::json!({
            "source": set.indexing_source().source_id().to_string(),
            "epoch": set.epoch().get(),
            "from": set.from_revision().get(),
            "to": set.to_revision().get(),
            "changed": set.changed().iter().map(|id| id.as_str()).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if set.is_empty() && set.to_revision() == requested {
        println!(
            "Caught up at revision {} (epoch {})",
            set.to_revision(),
            set.epoch()
        );
        return Ok(());
    }

    println!(
        "Epoch {}, revisions {}..={} ({} changed)",
        set.epoch(),
        set.from_revision(),
        set.to_revision(),
        set.len()
    );
    for id in set.changed() {
        println!("  {}", id);
    }
    println!();
    println!(
        "{}",
        format!("Next: sfeed changes --from {}", set.to_revision()).dimmed()
    );

    Ok(())
}
