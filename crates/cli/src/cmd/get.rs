//! Print an item

use crate::util::Repo;
use anyhow::{Context, Result};
use feed_core::{ItemId, Lookup, Store};
use std::io::Write;

pub fn run(id: &str, json: bool) -> Result<()> {
    let repo = Repo::open()?;
    let id = ItemId::new(id);

    let item = match repo.journal.get(&id)? {
        Lookup::Present(item) => item,
        Lookup::Absent => anyhow::bail!("Item not found: {}", id),
    };

    if json {
        let value = serde_json::json!({
            "id": item.id().as_str(),
            "revision": item.revision().get(),
            "content_hash": item.content_hash().to_hex(),
            "size": item.content().len(),
            "content": String::from_utf8_lossy(item.content()),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(item.content())
            .context("Failed to write content")?;
        if !item.content().ends_with(b"\n") {
            writeln!(stdout)?;
        }
    }

    Ok(())
}
