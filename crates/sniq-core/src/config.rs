//! Configuration management for sniqueue
//!
//! TOML configuration with four sections: `[queue]`, `[policy]`,
//! `[domains]` and `[logging]`. Every field has a default, so an empty file
//! is a valid configuration.

use crate::error::{Error, Result};
use crate::matcher::{DomainList, DomainTrie, DEFAULT_DOMAINS};
use crate::verdict::Policy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Log levels accepted in `[logging] level`
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Kernel queue settings
    pub queue: QueueConfig,
    /// Verdict policy
    pub policy: PolicyConfig,
    /// Domain list sources
    pub domains: DomainsConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::ConfigNotFound {
                path: path.display().to_string(),
            },
            _ => Error::Io(e),
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(Error::from)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(Error::from)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.queue.threads == 0 {
            return Err(Error::config_value("queue.threads", "Must be at least 1"));
        }
        let last_queue = usize::from(self.queue.number).saturating_add(self.queue.threads - 1);
        if last_queue > usize::from(u16::MAX) {
            return Err(Error::config_value(
                "queue.threads",
                format!(
                    "Queues {}..={} exceed the highest queue number {}",
                    self.queue.number,
                    last_queue,
                    u16::MAX
                ),
            ));
        }
        if self.queue.max_len == 0 {
            return Err(Error::config_value("queue.max_len", "Must be at least 1"));
        }

        if !self.policy.drop {
            if self.policy.mark == 0 {
                return Err(Error::config_value(
                    "policy.mark",
                    "Mark 0 cannot be told apart from unmarked traffic",
                ));
            }
            if self.policy.effective_good_mark() == Some(self.policy.mark) {
                return Err(Error::config_value(
                    "policy.good_mark",
                    format!("Must differ from policy.mark ({})", self.policy.mark),
                ));
            }
        }

        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(Error::config_value(
                "logging.level",
                format!(
                    "Unknown level '{}', expected one of {}",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ),
            ));
        }

        Ok(())
    }

    /// Verdict policy described by `[policy]`
    pub fn policy(&self) -> Policy {
        self.policy.to_policy()
    }
}

/// Kernel queue settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// First queue number
    pub number: u16,
    /// Number of queues, one worker thread each
    pub threads: usize,
    /// Kernel queue length
    pub max_len: u32,
    /// Ask the kernel to accept packets when the queue is full
    pub fail_open: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            number: 100,
            threads: 1,
            max_len: 1024,
            fail_open: true,
        }
    }
}

impl QueueConfig {
    /// Queue numbers to bind, `number .. number + threads`
    pub fn numbers(&self) -> impl Iterator<Item = u16> {
        (self.number..=u16::MAX).take(self.threads)
    }
}

/// Verdict policy settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Drop matched packets instead of marking them
    pub drop: bool,
    /// Mark for matched packets
    pub mark: u32,
    /// Mark for unmatched packets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub good_mark: Option<u32>,
    /// Mark unmatched packets with `mark + 1` when `good_mark` is unset
    pub mark_unmatched: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            drop: false,
            mark: 1,
            good_mark: None,
            mark_unmatched: false,
        }
    }
}

impl PolicyConfig {
    /// Mark applied to unmatched packets, if any
    pub fn effective_good_mark(&self) -> Option<u32> {
        if self.drop {
            return None;
        }
        self.good_mark
            .or_else(|| self.mark_unmatched.then(|| self.mark.wrapping_add(1)))
    }

    /// Build the verdict policy
    pub fn to_policy(&self) -> Policy {
        if self.drop {
            return Policy::drop_on_match();
        }
        let policy = Policy::mark_on_match(self.mark);
        match self.effective_good_mark() {
            Some(mark) => policy.with_good_mark(mark),
            None => policy,
        }
    }
}

/// Domain list sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainsConfig {
    /// Domain list file, watched for changes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Inline entries
    pub entries: Vec<String>,
    /// Seconds between checks of the list file (0 disables reloading)
    pub reload_interval_secs: u64,
    /// Include the built-in resolver names; defaults to true when no file
    /// and no entries are configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_defaults: Option<bool>,
}

impl Default for DomainsConfig {
    fn default() -> Self {
        Self {
            file: None,
            entries: Vec::new(),
            reload_interval_secs: 5,
            use_defaults: None,
        }
    }
}

impl DomainsConfig {
    /// Whether the built-in domains are included
    pub fn uses_defaults(&self) -> bool {
        self.use_defaults
            .unwrap_or(self.file.is_none() && self.entries.is_empty())
    }

    /// Loader for the configured list file
    pub fn list(&self) -> Option<DomainList> {
        self.file.as_ref().map(DomainList::new)
    }

    /// Interval between reload checks, `None` when disabled
    pub fn reload_interval(&self) -> Option<Duration> {
        (self.reload_interval_secs > 0).then(|| Duration::from_secs(self.reload_interval_secs))
    }

    /// Build the full trie, reading `list` if given
    pub fn load_trie(&self, list: Option<&DomainList>) -> Result<DomainTrie> {
        let base = match list {
            Some(list) => list.load()?,
            None => DomainTrie::new(),
        };
        Ok(self.complete(base))
    }

    /// Add inline entries and defaults to a trie read from the list file
    pub fn complete(&self, mut trie: DomainTrie) -> DomainTrie {
        trie.extend(&self.entries);
        if self.uses_defaults() {
            trie.extend(DEFAULT_DOMAINS);
        }
        trie
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text
    #[default]
    Text,
    /// Compact single-line text
    Compact,
    /// JSON lines
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Output format
    pub format: LogFormat,
    /// Log file path (None = stderr only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Log every packet verdict at debug level
    pub packets: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            file: None,
            packets: false,
        }
    }
}
