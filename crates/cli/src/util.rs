//! Shared utilities for CLI commands

use crate::config::{self, FeedConfig};
use anyhow::{Context, Result};
use indexer::SledIndex;
use journal::{Journal, SledCheckpoints};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const FEED_DIR: &str = ".sfeed";

/// Find repository root by walking up from cwd to find .sfeed/
pub fn find_repo_root() -> Result<PathBuf> {
    let mut current = std::env::current_dir().context("Failed to get current directory")?;

    loop {
        let feed_dir = current.join(FEED_DIR);
        if feed_dir.is_dir() {
            return Ok(current);
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => anyhow::bail!("Not an sfeed repository (no .sfeed directory found)"),
        }
    }
}

/// An opened repository: config plus the store journal
pub struct Repo {
    pub root: PathBuf,
    pub config: FeedConfig,
    pub journal: Arc<Journal>,
}

impl Repo {
    pub fn open() -> Result<Self> {
        let root = find_repo_root()?;
        let feed_dir = root.join(FEED_DIR);
        let config = config::load(&feed_dir)?;
        let journal = Journal::open(&feed_dir.join("store"), config.retention_policy())
            .context("Failed to open store journal")?;
        Ok(Self {
            root,
            config,
            journal,
        })
    }

    pub fn feed_dir(&self) -> PathBuf {
        self.root.join(FEED_DIR)
    }

    /// Open the consumer side: term index and checkpoints share one database
    pub fn open_index(&self) -> Result<IndexHandle> {
        let db = sled::open(self.feed_dir().join("index"))
            .context("Failed to open index database")?;
        let index = SledIndex::open(&db).context("Failed to open term index")?;
        let checkpoints = SledCheckpoints::open(&db).context("Failed to open checkpoints")?;
        Ok(IndexHandle {
            db,
            index: Arc::new(index),
            checkpoints: Arc::new(checkpoints),
        })
    }
}

pub struct IndexHandle {
    pub db: sled::Db,
    pub index: Arc<SledIndex>,
    pub checkpoints: Arc<SledCheckpoints>,
}

impl IndexHandle {
    pub fn flush(&self) -> Result<()> {
        self.db.flush().context("Failed to flush index database")?;
        Ok(())
    }
}

/// Format file size in human-readable format
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Calculate directory size recursively
pub fn calculate_dir_size(dir: &Path) -> Result<u64> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut total = 0u64;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() {
            total += entry.metadata()?.len();
        } else if path.is_dir() {
            total += calculate_dir_size(&path)?;
        }
    }

    Ok(total)
}

/// Shorten text for single-line display
pub fn preview(text: &str, max_chars: usize) -> String {
    let line = text.lines().next().unwrap_or("");
    if line.chars().count() > max_chars || line.len() < text.trim_end().len() {
        let cut: String = line.chars().take(max_chars).collect();
        format!("{}...", cut)
    } else {
        line.to_string()
    }
}
