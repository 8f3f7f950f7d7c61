//! Initialize a feed repository

use crate::config::{self, FeedConfig};
use crate::util::FEED_DIR;
use anyhow::{Context, Result};
use journal::Journal;
use owo_colors::OwoColorize;
use std::env;

pub fn run() -> Result<()> {
    let current_dir = env::current_dir().context("Failed to get current directory")?;
    let feed_dir = current_dir.join(FEED_DIR);

    if feed_dir.exists() {
        anyhow::bail!(
            "sfeed repository already initialized at {}",
            feed_dir.display()
        );
    }

    std::fs::create_dir_all(&feed_dir)
        .with_context(|| format!("Failed to create {}", feed_dir.display()))?;

    let config = FeedConfig::default();
    config::save(&feed_dir, &config)?;

    let journal = Journal::open(&feed_dir.join("store"), config.retention_policy())
        .context("Failed to create store journal")?;
    let stats = journal.stats()?;

    println!(
        "{} Initialized sfeed repository at {}",
        "✓".green(),
        current_dir.display()
    );
    println!();
    println!("Created .sfeed/ directory structure:");
    println!("  - .sfeed/config.toml    (configuration)");
    println!("  - .sfeed/store/         (items and change log)");
    println!();
    println!("Source: {}", stats.source_id);
    println!("Epoch:  {}", stats.epoch);
    println!();
    println!("Next steps:");
    println!("  - Run 'sfeed put <id> --content <text>' to add items");
    println!("  - Run 'sfeed sync' to build the index");

    Ok(())
}
