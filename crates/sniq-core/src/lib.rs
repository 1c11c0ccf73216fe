//! # sniqueue core
//!
//! Platform-independent core of the SNI firewall: decodes queued IP packets
//! down to the TLS / QUIC ClientHello, matches the server name against a
//! domain list and turns the result into a verdict.
//!
//! ## Architecture
//!
//! This crate provides:
//! - **Wire utilities** - bounded big-endian and QUIC varint reads
//! - **Packet decoding** - IPv4/IPv6 → TCP/UDP → TLS ClientHello
//! - **QUIC Initial decryption** - header protection removal and AES-128-GCM
//! - **Domain matching** - reversed-domain radix trie with wildcard entries
//! - **Verdicts** - fail-open drop / mark policy
//! - **Configuration** - TOML configuration with validation
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use sniq_core::{Classifier, DomainSet, DomainTrie, Packet, Policy, Verdict};
//!
//! let trie: DomainTrie = ["blocked.example", "*.ads.example"].into_iter().collect();
//! let classifier = Classifier::new(Arc::new(DomainSet::new(trie)), Policy::drop_on_match());
//!
//! // Not an IP packet: classification fails open.
//! let packet = Packet::new(100, 1, vec![0u8; 4]);
//! assert_eq!(classifier.classify(&packet).verdict, Verdict::Accept);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod classifier;
pub mod config;
pub mod error;
pub mod matcher;
pub mod packet;
pub mod quic;
pub mod tls;
pub mod verdict;
pub mod wire;

// Re-exports for convenience
pub use classifier::{Classification, Classifier, Stats, StatsSnapshot};
pub use config::Config;
pub use error::{DecodeError, Error, Result};
pub use matcher::{DomainList, DomainSet, DomainTrie};
pub use packet::{Decoded, Packet};
pub use verdict::{MatchAction, Outcome, Policy, Verdict};
