//! Packet classification
//!
//! Runs one packet through decode, match and verdict. A [`Classifier`] is
//! shared by every worker thread; the domain set is read lock-free and the
//! counters are atomics.

use crate::error::DecodeError;
use crate::matcher::DomainSet;
use crate::packet::{Decoded, NetworkHeader, Packet, TcpFlags};
use crate::verdict::{Outcome, Policy, Verdict};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Verdict for one packet and how it was reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Verdict to hand back to the queue
    pub verdict: Verdict,
    /// Decoder and matcher result
    pub outcome: Outcome,
}

/// Classification counters
#[derive(Debug, Default)]
pub struct Stats {
    packets: AtomicU64,
    decode_failed: AtomicU64,
    no_hostname: AtomicU64,
    matched: AtomicU64,
    unmatched: AtomicU64,
    accepted: AtomicU64,
    marked: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time copy of [`Stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Packets classified
    pub packets: u64,
    /// Packets that did not decode
    pub decode_failed: u64,
    /// Decoded packets without a server name
    pub no_hostname: u64,
    /// Server names found in the domain set
    pub matched: u64,
    /// Server names not in the domain set
    pub unmatched: u64,
    /// Plain accept verdicts
    pub accepted: u64,
    /// Accept-with-mark verdicts
    pub marked: u64,
    /// Drop verdicts
    pub dropped: u64,
}

impl Stats {
    fn record(&self, classification: &Classification) {
        self.packets.fetch_add(1, Ordering::Relaxed);

        let outcome_counter = match classification.outcome {
            Outcome::DecodeFailed(_) => &self.decode_failed,
            Outcome::NoHostname => &self.no_hostname,
            Outcome::Unmatched(_) => &self.unmatched,
            Outcome::Matched(_) => &self.matched,
        };
        outcome_counter.fetch_add(1, Ordering::Relaxed);

        let verdict_counter = match classification.verdict {
            Verdict::Accept => &self.accepted,
            Verdict::AcceptWithMark(_) => &self.marked,
            Verdict::Drop => &self.dropped,
        };
        verdict_counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Read all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            packets: self.packets.load(Ordering::Relaxed),
            decode_failed: self.decode_failed.load(Ordering::Relaxed),
            no_hostname: self.no_hostname.load(Ordering::Relaxed),
            matched: self.matched.load(Ordering::Relaxed),
            unmatched: self.unmatched.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            marked: self.marked.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Decode, match and decide
#[derive(Debug)]
pub struct Classifier {
    domains: Arc<DomainSet>,
    policy: Policy,
    log_packets: bool,
    stats: Stats,
}

impl Classifier {
    /// Create a classifier over a shared domain set
    pub fn new(domains: Arc<DomainSet>, policy: Policy) -> Self {
        Self {
            domains,
            policy,
            log_packets: false,
            stats: Stats::default(),
        }
    }

    /// Log every verdict at debug level
    #[must_use]
    pub fn with_packet_logging(mut self, enabled: bool) -> Self {
        self.log_packets = enabled;
        self
    }

    /// Verdict policy
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Domain set consulted for matches
    pub fn domains(&self) -> &Arc<DomainSet> {
        &self.domains
    }

    /// Counters
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Classify one packet
    pub fn classify(&self, packet: &Packet) -> Classification {
        self.classify_decoded(packet, packet.decode().as_ref())
    }

    /// Classify a packet the caller already decoded
    ///
    /// `decoded` must come from `packet.decode()`; `packet` only supplies
    /// the queue and id for logging.
    #[instrument(level = "trace", skip(self, packet, decoded), fields(queue = packet.queue, id = packet.id, len = packet.len()))]
    pub fn classify_decoded(
        &self,
        packet: &Packet,
        decoded: Result<&Decoded, &DecodeError>,
    ) -> Classification {
        let outcome = self.outcome(packet, decoded);
        let verdict = self.policy.verdict(&outcome);
        let classification = Classification { verdict, outcome };

        self.stats.record(&classification);
        if self.log_packets {
            log_verdict(packet, &classification);
        }
        classification
    }

    fn outcome(&self, packet: &Packet, decoded: Result<&Decoded, &DecodeError>) -> Outcome {
        let decoded = match decoded {
            Ok(decoded) => decoded,
            Err(e) => {
                if self.log_packets {
                    debug!(
                        queue = packet.queue,
                        id = packet.id,
                        kind = e.kind(),
                        protocol = packet_protocol(packet),
                        "Packet not decoded: {}",
                        e
                    );
                }
                return Outcome::DecodeFailed(e.clone());
            }
        };

        if let Some(violation) = decoded.hello.as_ref().and_then(|h| h.violation) {
            if self.log_packets {
                debug!(queue = packet.queue, id = packet.id, "Ignoring server name: {}", violation);
            }
        }

        match decoded.sni() {
            None => {
                let control = decoded.transport.tcp_flags().is_some_and(TcpFlags::is_control);
                if self.log_packets && control {
                    debug!(queue = packet.queue, id = packet.id, "TCP control segment");
                }
                Outcome::NoHostname
            }
            Some(host) if self.domains.matches(host) => Outcome::Matched(host.to_owned()),
            Some(host) => Outcome::Unmatched(host.to_owned()),
        }
    }
}

/// IP protocol number of a packet that failed to decode, when the header
/// got far enough to carry one
fn packet_protocol(packet: &Packet) -> Option<u8> {
    NetworkHeader::parse(packet.as_bytes())
        .ok()
        .map(|(header, _)| header.protocol().to_u8())
}

fn log_verdict(packet: &Packet, classification: &Classification) {
    let sni = classification.outcome.hostname().unwrap_or("-");
    match classification.verdict {
        Verdict::Drop => debug!(queue = packet.queue, id = packet.id, sni, "Dropped packet"),
        Verdict::AcceptWithMark(mark) => debug!(
            queue = packet.queue,
            id = packet.id,
            sni,
            "Marked packet with {}",
            mark
        ),
        Verdict::Accept => debug!(queue = packet.queue, id = packet.id, sni, "Accepted packet"),
    }
}
