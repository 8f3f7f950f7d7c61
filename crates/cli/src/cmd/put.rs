//! Write commands: put and delete

use crate::util::Repo;
use anyhow::{Context, Result};
use feed_core::ItemId;
use std::io::Read;
use std::path::PathBuf;

pub fn run(id: &str, content: Option<String>, file: Option<PathBuf>) -> Result<()> {
    let content: Vec<u8> = match (content, file) {
        (Some(text), _) => text.into_bytes(),
        (None, Some(path)) => std::fs::read(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read content from stdin")?;
            buf
        }
    };

    let repo = Repo::open()?;
    let id = ItemId::new(id);
    let revision = repo.journal.put(&id, content)?;

    println!("Put {} at revision {}", id, revision);
    Ok(())
}

pub fn run_delete(id: &str) -> Result<()> {
    let repo = Repo::open()?;
    let id = ItemId::new(id);

    match repo.journal.delete(&id)? {
        Some(revision) => {
            println!("Deleted {} at revision {}", id, revision);
            Ok(())
        }
        None => anyhow::bail!("Item not found: {}", id),
    }
}
