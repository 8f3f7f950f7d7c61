//! Common utilities for integration tests

pub mod cli;

use std::path::Path;

/// Initialize a repository and load it with `(id, content)` pairs
pub fn seeded_repo(dir: &Path, items: &[(&str, &str)]) -> anyhow::Result<()> {
    crate::sfeed!(dir, "init").assert_success()?;
    for (id, content) in items {
        crate::sfeed!(dir, "put", *id, "--content", *content).assert_success()?;
    }
    Ok(())
}
