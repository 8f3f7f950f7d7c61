//! Repository configuration (`.sfeed/config.toml`)

use anyhow::{Context, Result};
use indexer::ConsumerConfig;
use journal::RetentionPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Tombstones within this many revisions of the head survive gc
    pub retain_revisions: u64,
    pub compact_superseded: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let policy = RetentionPolicy::default();
        Self {
            retain_revisions: policy.retain_revisions,
            compact_superseded: policy.compact_superseded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerSection {
    pub consumer_id: String,
    pub batch_size: usize,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for ConsumerSection {
    fn default() -> Self {
        let defaults = ConsumerConfig::default();
        Self {
            consumer_id: defaults.consumer_id,
            batch_size: defaults.batch_size,
            max_retries: defaults.max_retries,
            retry_backoff_ms: defaults.retry_backoff.as_millis() as u64,
            poll_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub store: StoreConfig,
    pub consumer: ConsumerSection,
}

impl FeedConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=100_000).contains(&self.consumer.batch_size) {
            anyhow::bail!(
                "consumer.batch_size must be 1-100,000 (got {})",
                self.consumer.batch_size
            );
        }
        if self.consumer.consumer_id.trim().is_empty() {
            anyhow::bail!("consumer.consumer_id must not be empty");
        }
        if !(1..=100).contains(&self.consumer.max_retries) {
            anyhow::bail!(
                "consumer.max_retries must be 1-100 (got {})",
                self.consumer.max_retries
            );
        }
        if self.consumer.retry_backoff_ms > 60_000 {
            anyhow::bail!(
                "consumer.retry_backoff_ms must be at most 60,000 (got {})",
                self.consumer.retry_backoff_ms
            );
        }
        if !(10..=3_600_000).contains(&self.consumer.poll_interval_ms) {
            anyhow::bail!(
                "consumer.poll_interval_ms must be 10-3,600,000 (got {})",
                self.consumer.poll_interval_ms
            );
        }
        Ok(())
    }

    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            retain_revisions: self.store.retain_revisions,
            compact_superseded: self.store.compact_superseded,
        }
    }

    pub fn consumer_config(&self) -> ConsumerConfig {
        ConsumerConfig {
            consumer_id: self.consumer.consumer_id.clone(),
            batch_size: self.consumer.batch_size,
            max_retries: self.consumer.max_retries,
            retry_backoff: Duration::from_millis(self.consumer.retry_backoff_ms),
            max_batches: 0,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.consumer.poll_interval_ms)
    }

    /// Read a config value by dotted key
    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "store.retain_revisions" => self.store.retain_revisions.to_string(),
            "store.compact_superseded" => self.store.compact_superseded.to_string(),
            "consumer.consumer_id" => self.consumer.consumer_id.clone(),
            "consumer.batch_size" => self.consumer.batch_size.to_string(),
            "consumer.max_retries" => self.consumer.max_retries.to_string(),
            "consumer.retry_backoff_ms" => self.consumer.retry_backoff_ms.to_string(),
            "consumer.poll_interval_ms" => self.consumer.poll_interval_ms.to_string(),
            _ => anyhow::bail!(
                "Unknown config key: {}. Use 'sfeed config list' to see available keys.",
                key
            ),
        };
        Ok(value)
    }

    /// Set a config value by dotted key, then validate the result
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        const UNSIGNED: &str = "Invalid value: must be a non-negative integer";
        const BOOL: &str = "Invalid value: must be 'true' or 'false'";

        match key {
            "store.retain_revisions" => {
                self.store.retain_revisions = value.parse().context(UNSIGNED)?
            }
            "store.compact_superseded" => {
                self.store.compact_superseded = value.parse().context(BOOL)?
            }
            "consumer.consumer_id" => self.consumer.consumer_id = value.to_string(),
            "consumer.batch_size" => self.consumer.batch_size = value.parse().context(UNSIGNED)?,
            "consumer.max_retries" => {
                self.consumer.max_retries = value.parse().context(UNSIGNED)?
            }
            "consumer.retry_backoff_ms" => {
                self.consumer.retry_backoff_ms = value.parse().context(UNSIGNED)?
            }
            "consumer.poll_interval_ms" => {
                self.consumer.poll_interval_ms = value.parse().context(UNSIGNED)?
            }
            _ => anyhow::bail!(
                "Unknown config key: {}. Use 'sfeed config list' to see available keys.",
                key
            ),
        }

        self.validate().context("Invalid configuration value")
    }
}

pub fn config_path(feed_dir: &Path) -> PathBuf {
    feed_dir.join(CONFIG_FILE)
}

/// Load the config, falling back to defaults when the file is missing
pub fn load(feed_dir: &Path) -> Result<FeedConfig> {
    let path = config_path(feed_dir);
    if !path.exists() {
        return Ok(FeedConfig::default());
    }

    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: FeedConfig =
        toml::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

pub fn save(feed_dir: &Path, config: &FeedConfig) -> Result<()> {
    config.validate()?;
    let text = toml::to_string_pretty(config).context("Failed to serialize config")?;
    let path = config_path(feed_dir);
    std::fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))
}

pub fn example_config() -> &'static str {
    r#"# sfeed configuration

[store]
# Tombstones newer than this many revisions survive gc. Consumers that fall
# further behind resync from scratch.
retain_revisions = 10000
# Drop log entries superseded by a later write of the same id
compact_superseded = true

[consumer]
consumer_id = "default"
# Maximum ids per change set
batch_size = 256
max_retries = 5
retry_backoff_ms = 200
# Used by `sfeed follow`
poll_interval_ms = 1000
"#
}
