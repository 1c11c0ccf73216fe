//! Shared, hot-swappable domain set
//!
//! Workers read the current trie without locking; a reload builds a whole
//! new trie and publishes it in one atomic store.

use super::DomainTrie;
use arc_swap::{ArcSwap, Guard};
use std::sync::Arc;
use tracing::debug;

/// Domain trie published for concurrent readers
#[derive(Debug)]
pub struct DomainSet {
    current: ArcSwap<DomainTrie>,
}

impl Default for DomainSet {
    fn default() -> Self {
        Self::new(DomainTrie::new())
    }
}

impl DomainSet {
    /// Publish an initial trie
    pub fn new(trie: DomainTrie) -> Self {
        Self {
            current: ArcSwap::from_pointee(trie),
        }
    }

    /// Current trie; the guard keeps it alive while held
    pub fn load(&self) -> Guard<Arc<DomainTrie>> {
        self.current.load()
    }

    /// Check `hostname` against the current trie
    pub fn matches(&self, hostname: &str) -> bool {
        self.current.load().matches(hostname)
    }

    /// Swap in a new trie, returning the previous one
    pub fn replace(&self, trie: DomainTrie) -> Arc<DomainTrie> {
        let entries = trie.len();
        let previous = self.current.swap(Arc::new(trie));
        debug!(
            previous = previous.len(),
            current = entries,
            "Domain set replaced"
        );
        previous
    }

    /// Number of entries in the current trie
    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    /// Check if the current trie is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
