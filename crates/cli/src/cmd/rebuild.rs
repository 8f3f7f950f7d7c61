//! Reset history under a new epoch

use crate::util::Repo;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::io::{BufRead, Write};

pub fn run(yes: bool) -> Result<()> {
    let repo = Repo::open()?;

    if !yes {
        println!(
            "{}",
            "Rebuild discards the change log. Every consumer will resync from scratch.".yellow()
        );
        print!("Continue? [y/N] ");
        std::io::stdout().flush()?;

        let mut answer = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut answer)
            .context("Failed to read confirmation")?;
        if !matches!(answer.trim(), "y" | "Y" | "yes") {
            println!("Aborted");
            return Ok(());
        }
    }

    let epoch = repo.journal.rebuild()?;
    let stats = repo.journal.stats()?;

    println!(
        "{} Rebuilt store: epoch {}, {} items at revisions 1..={}",
        "✓".green(),
        epoch,
        stats.items,
        stats.head
    );

    Ok(())
}
