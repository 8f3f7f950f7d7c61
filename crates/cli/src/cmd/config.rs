//! Configuration management command
//!
//! View and edit `.sfeed/config.toml`.

use crate::config;
use crate::util::{self, FEED_DIR};
use anyhow::Result;
use owo_colors::OwoColorize;
use std::path::PathBuf;

fn feed_dir() -> Result<PathBuf> {
    Ok(util::find_repo_root()?.join(FEED_DIR))
}

/// List all configuration values
pub fn run_list() -> Result<()> {
    let feed_dir = feed_dir()?;
    let config = config::load(&feed_dir)?;

    println!("{}", "Repository Configuration".bold());
    println!(
        "{}: {}\n",
        "Location".dimmed(),
        config::config_path(&feed_dir).display().dimmed()
    );

    println!("{}", "[store]".yellow());
    println!(
        "  {} = {}",
        "retain_revisions".cyan(),
        config.store.retain_revisions
    );
    println!(
        "  {} = {}",
        "compact_superseded".cyan(),
        config.store.compact_superseded
    );

    println!("\n{}", "[consumer]".yellow());
    println!(
        "  {} = {}",
        "consumer_id".cyan(),
        config.consumer.consumer_id
    );
    println!(
        "  {} = {}",
        "batch_size".cyan(),
        config.consumer.batch_size
    );
    println!(
        "  {} = {}",
        "max_retries".cyan(),
        config.consumer.max_retries
    );
    println!(
        "  {} = {} {}",
        "retry_backoff_ms".cyan(),
        config.consumer.retry_backoff_ms,
        "(multiplied by the attempt number)".dimmed()
    );
    println!(
        "  {} = {}",
        "poll_interval_ms".cyan(),
        config.consumer.poll_interval_ms
    );

    println!("\n{}", "Valid Ranges:".bold());
    println!("  batch_size: 1-100,000");
    println!("  max_retries: 1-100");
    println!("  retry_backoff_ms: 0-60,000");
    println!("  poll_interval_ms: 10-3,600,000");

    Ok(())
}

/// Get a single configuration value
pub fn run_get(key: &str) -> Result<()> {
    let config = config::load(&feed_dir()?)?;
    println!("{}", config.get(key)?);
    Ok(())
}

/// Set a configuration value
pub fn run_set(key: &str, value: &str) -> Result<()> {
    let feed_dir = feed_dir()?;
    let mut config = config::load(&feed_dir)?;
    config.set(key, value)?;
    config::save(&feed_dir, &config)?;

    println!("{} {} = {}", "✓".green(), key.cyan(), value);
    if key.starts_with("store.") {
        println!(
            "{}",
            "Note: retention changes apply from the next 'sfeed gc'".yellow()
        );
    }

    Ok(())
}

/// Show the config file path
pub fn run_path() -> Result<()> {
    let path = config::config_path(&feed_dir()?);
    println!("{}", path.display());
    if !path.exists() {
        println!("{}", "File does not exist; defaults are in effect.".yellow());
    }
    Ok(())
}

/// Show example configuration
pub fn run_example() -> Result<()> {
    println!("{}", config::example_config());
    Ok(())
}
