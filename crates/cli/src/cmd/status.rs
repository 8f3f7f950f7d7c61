//! Show store and consumer status

use crate::util::{self, Repo};
use anyhow::Result;
use indexer::SemanticIndex;
use owo_colors::OwoColorize;

pub fn run() -> Result<()> {
    let repo = Repo::open()?;
    let stats = repo.journal.stats()?;
    let handle = repo.open_index()?;
    let consumers = handle.checkpoints.list()?;

    println!("{}", "Feed Status".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!("Repository:    {}", repo.root.display().to_string().cyan());
    println!();

    println!("Store:");
    println!("  Source:      {}", stats.source_id);
    println!("  Epoch:       {}", stats.epoch);
    println!("  Head:        {}", stats.head);
    println!("  Horizon:     {}", stats.horizon);
    println!("  Items:       {}", stats.items);
    println!("  Log entries: {}", stats.log_entries);
    println!();

    println!("Consumers:");
    if consumers.is_empty() {
        println!("  {}", "None yet (run 'sfeed sync')".dimmed());
    }
    for (name, checkpoint) in &consumers {
        let position = if !checkpoint.matches(stats.source_id, stats.epoch) {
            "resync pending".yellow().to_string()
        } else if checkpoint.revision < stats.horizon && !checkpoint.revision.is_min() {
            "behind horizon, resync pending".yellow().to_string()
        } else if checkpoint.revision >= stats.head {
            "up to date".green().to_string()
        } else {
            format!("{} behind", stats.head.get() - checkpoint.revision.get())
                .yellow()
                .to_string()
        };
        println!(
            "  {:<12} revision {} ({})",
            name, checkpoint.revision, position
        );
    }
    println!();

    println!("Index:");
    println!("  Items:       {}", handle.index.len());
    println!("  Terms:       {}", handle.index.term_count());
    println!();

    println!(
        "Total size:    {}",
        util::format_size(util::calculate_dir_size(&repo.feed_dir())?)
    );

    Ok(())
}
