//! Platform-agnostic packet queue interface
//!
//! A queue hands packets to userspace and waits for exactly one verdict per
//! packet. Implemented by platform drivers (NFQUEUE on Linux).

use crate::Result;
use sniq_core::config::QueueConfig;
use sniq_core::{Packet, Verdict};

/// Kernel packet queue
///
/// Handles are owned by a single worker thread and are not required to be
/// `Send`.
pub trait PacketQueue {
    /// Driver-specific handle needed to answer a packet
    type Ticket;

    /// Queue number this handle is bound to
    fn queue_num(&self) -> u16;

    /// Receive the next packet
    ///
    /// Returns `Ok(None)` when no packet arrived within the poll interval, so
    /// callers can check for shutdown.
    fn recv(&mut self) -> Result<Option<QueuedPacket<Self::Ticket>>>;

    /// Answer a packet previously returned by [`recv`](Self::recv)
    fn verdict(&mut self, ticket: Self::Ticket, verdict: Verdict) -> Result<()>;
}

/// A packet waiting for its verdict
#[derive(Debug)]
pub struct QueuedPacket<T> {
    /// Packet contents and origin
    pub packet: Packet,
    /// Handle to pass back with the verdict
    pub ticket: T,
}

/// Options for binding one queue number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueOptions {
    /// Queue number
    pub number: u16,
    /// Maximum packets the kernel holds for this queue
    pub max_len: u32,
    /// Accept packets instead of dropping them when the queue is full
    pub fail_open: bool,
}

impl QueueOptions {
    /// Default options for one queue number
    pub fn new(number: u16) -> Self {
        Self {
            number,
            max_len: 1024,
            fail_open: true,
        }
    }

    /// Options for every queue number in a queue configuration
    pub fn from_config(config: &QueueConfig) -> impl Iterator<Item = Self> + '_ {
        config.numbers().map(|number| Self {
            number,
            max_len: config.max_len,
            fail_open: config.fail_open,
        })
    }
}
