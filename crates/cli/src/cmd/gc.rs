//! Compact the change log

use crate::util::Repo;
use anyhow::Result;
use owo_colors::OwoColorize;

pub fn run() -> Result<()> {
    let repo = Repo::open()?;

    println!("{}", "Running Garbage Collection...".bold());
    println!();

    let report = repo.journal.gc()?;

    println!("{}", "GC Complete".green().bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();

    if report.entries_dropped() == 0 {
        println!("{}", "No garbage found - change log is already compact".dimmed());
    } else {
        println!("Superseded entries dropped: {}", report.superseded_dropped);
        println!("Tombstones purged:          {}", report.tombstones_purged);
    }
    println!("Log entries remaining:      {}", report.log_entries);
    println!("Horizon:                    {}", report.horizon);

    if report.tombstones_purged > 0 {
        println!();
        println!(
            "{}",
            "Consumers behind the horizon will resync from scratch.".yellow()
        );
    }

    Ok(())
}
