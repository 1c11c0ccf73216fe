//! Domain matching
//!
//! - [`DomainTrie`]: reversed-domain radix trie with `*.` wildcard entries
//! - [`DomainSet`]: lock-free published trie, swapped whole on reload
//! - [`DomainList`]: list file loader with modification tracking

mod list;
mod set;
mod trie;

pub use list::{parse_entries, DomainList};
pub use set::DomainSet;
pub use trie::{reverse_domain, DomainTrie};

/// Public DNS-over-HTTPS resolver names, used when no list is configured
pub const DEFAULT_DOMAINS: [&str; 5] = [
    "dns.google",
    "dns64.dns.google",
    "dns.google.com",
    "google-public-dns-a.google.com",
    "google-public-dns-b.google.com",
];

/// Trie seeded with [`DEFAULT_DOMAINS`]
pub fn default_trie() -> DomainTrie {
    DEFAULT_DOMAINS.into_iter().collect()
}
