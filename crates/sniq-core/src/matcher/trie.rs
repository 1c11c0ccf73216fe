//! Reversed-domain radix trie
//!
//! Domains are stored back to front so that names under the same parent
//! share a path: `mail.example.com` and `www.example.com` both start with
//! `moc.elpmaxe.`. Edges carry byte strings and are split on insert.

use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Node {
    /// Sorted by the first byte of their label
    children: Vec<Edge>,
    /// A literal domain ends here
    terminal: bool,
    /// A `*.` entry ends here
    wildcard: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Edge {
    /// Never empty
    label: Vec<u8>,
    node: Node,
}

impl Edge {
    /// Cut the label at `at`, moving the tail under a new intermediate node
    fn split(&mut self, at: usize) {
        let tail = self.label.split_off(at);
        let child = std::mem::take(&mut self.node);
        self.node.children.push(Edge {
            label: tail,
            node: child,
        });
    }
}

impl Node {
    fn child_index(&self, first: u8) -> Result<usize, usize> {
        self.children.binary_search_by_key(&first, |e| e.label[0])
    }

    /// Walk `key` from this node, creating or splitting edges as needed
    fn insert_path(&mut self, key: &[u8]) -> &mut Node {
        let Some(&first) = key.first() else {
            return self;
        };

        match self.child_index(first) {
            Err(pos) => {
                self.children.insert(
                    pos,
                    Edge {
                        label: key.to_vec(),
                        node: Node::default(),
                    },
                );
                &mut self.children[pos].node
            }
            Ok(pos) => {
                let edge = &mut self.children[pos];
                let common = edge
                    .label
                    .iter()
                    .zip(key)
                    .take_while(|(a, b)| a == b)
                    .count();
                if common < edge.label.len() {
                    edge.split(common);
                }
                edge.node.insert_path(&key[common..])
            }
        }
    }
}

/// Reverse a domain by grapheme cluster and fold ASCII case
///
/// Combining sequences stay intact, so `n\u{303}` is reversed as one unit.
pub fn reverse_domain(domain: &str) -> Vec<u8> {
    let mut reversed: String = domain.graphemes(true).rev().collect();
    reversed.make_ascii_lowercase();
    reversed.into_bytes()
}

/// Set of domain names and `*.` wildcard patterns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainTrie {
    root: Node,
    len: usize,
}

impl DomainTrie {
    /// Create an empty trie
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a domain or a `*.domain` pattern
    ///
    /// Returns `false` when nothing changed: blank input, a bare `*.`, or an
    /// entry already present.
    pub fn insert(&mut self, domain: &str) -> bool {
        let domain = domain.trim();
        if domain.is_empty() {
            return false;
        }

        let changed = if let Some(suffix) = domain.strip_prefix("*.") {
            if suffix.is_empty() {
                return false;
            }
            let mut key = reverse_domain(suffix);
            key.push(b'.');
            let node = self.root.insert_path(&key);
            !std::mem::replace(&mut node.wildcard, true)
        } else {
            let node = self.root.insert_path(&reverse_domain(domain));
            !std::mem::replace(&mut node.terminal, true)
        };

        if changed {
            self.len += 1;
        }
        changed
    }

    /// Insert many entries, returning how many were new
    pub fn extend<I, S>(&mut self, domains: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        domains
            .into_iter()
            .filter(|d| self.insert(d.as_ref()))
            .count()
    }

    /// Check whether `hostname` is listed
    ///
    /// True for an exact literal entry, or when a `*.` entry covers a proper
    /// subdomain of its suffix. The suffix itself is not covered.
    pub fn matches(&self, hostname: &str) -> bool {
        let key = reverse_domain(hostname);
        if key.is_empty() {
            return false;
        }

        let mut node = &self.root;
        let mut rest = key.as_slice();
        loop {
            if rest.is_empty() {
                return node.terminal;
            }
            if node.wildcard {
                return true;
            }

            let Ok(pos) = node.child_index(rest[0]) else {
                return false;
            };
            let edge = &node.children[pos];
            if !rest.starts_with(&edge.label) {
                return false;
            }
            rest = &rest[edge.label.len()..];
            node = &edge.node;
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the trie has no entries
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<S: AsRef<str>> FromIterator<S> for DomainTrie {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut trie = Self::new();
        trie.extend(iter);
        trie
    }
}
