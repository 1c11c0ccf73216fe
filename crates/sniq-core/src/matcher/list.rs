//! Domain list files
//!
//! File format:
//! - One domain per line
//! - Lines starting with # are comments
//! - Empty lines are ignored
//! - Wildcard: *.example.com

use super::DomainTrie;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};

/// Entries of a domain list, skipping blank lines and comments
pub fn parse_entries(content: &str) -> impl Iterator<Item = &str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

/// A domain list file watched for changes
#[derive(Debug)]
pub struct DomainList {
    path: PathBuf,
    last_modified: Mutex<Option<SystemTime>>,
}

impl DomainList {
    /// Track the list at `path`; nothing is read until [`load`](Self::load)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_modified: Mutex::new(None),
        }
    }

    /// Path of the list file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file and build a trie from it
    pub fn load(&self) -> Result<DomainTrie> {
        let modified = self.modified()?;
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| Error::domain_list(self.path.display().to_string(), e.to_string()))?;

        let mut trie = DomainTrie::new();
        let entries = trie.extend(parse_entries(&content));
        *self.last_modified.lock() = modified;

        info!(
            "Loaded {} domains from {} ({} lines)",
            entries,
            self.path.display(),
            content.lines().count()
        );
        Ok(trie)
    }

    /// Reload if the file changed since the last load
    ///
    /// Returns the new trie, or `None` when the file is unchanged.
    pub fn check_reload(&self) -> Result<Option<DomainTrie>> {
        let modified = self.modified()?;
        let last = *self.last_modified.lock();

        let changed = match (last, modified) {
            (Some(last), Some(current)) => current != last,
            (None, _) | (_, None) => true,
        };
        if !changed {
            debug!("Domain list unchanged: {}", self.path.display());
            return Ok(None);
        }

        info!("Domain list changed, reloading: {}", self.path.display());
        self.load().map(Some)
    }

    fn modified(&self) -> Result<Option<SystemTime>> {
        let metadata = std::fs::metadata(&self.path)
            .map_err(|e| Error::domain_list(self.path.display().to_string(), e.to_string()))?;
        Ok(metadata.modified().ok())
    }
}
