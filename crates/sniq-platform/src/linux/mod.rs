//! NFQUEUE driver
//!
//! Binds one netfilter queue number through the `nfq` crate. Packets are
//! routed here with a rule such as
//! `iptables -A OUTPUT -p tcp --dport 443 -j NFQUEUE --queue-num 100 --queue-bypass`.

use crate::error::{PlatformError, Result};
use crate::traits::{PacketQueue, QueueOptions, QueuedPacket};
use bytes::Bytes;
use nfq::{Message, Queue};
use sniq_core::{Packet, Verdict};
use std::io;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Copy whole packets to userspace
const COPY_RANGE: u16 = 0xffff;

/// NFQUEUE handle bound to a single queue number
pub struct NfQueue {
    queue: Queue,
    number: u16,
    received: u32,
}

impl std::fmt::Debug for NfQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NfQueue")
            .field("number", &self.number)
            .field("received", &self.received)
            .finish_non_exhaustive()
    }
}

impl NfQueue {
    /// Wait between polls of an empty queue
    pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

    /// Open a netlink socket and bind the queue described by `options`
    ///
    /// # Errors
    /// Fails without `CAP_NET_ADMIN` or when another process holds the queue.
    pub fn open(options: &QueueOptions) -> Result<Self> {
        let number = options.number;
        info!(
            queue = number,
            max_len = options.max_len,
            fail_open = options.fail_open,
            "Opening netfilter queue"
        );

        let mut queue = Queue::open().map_err(PlatformError::QueueOpen)?;
        let bind_err = |source: io::Error| PlatformError::QueueBind { number, source };

        queue.bind(number).map_err(bind_err)?;
        queue.set_copy_range(number, COPY_RANGE).map_err(bind_err)?;
        queue
            .set_queue_max_len(number, options.max_len)
            .map_err(bind_err)?;
        queue
            .set_fail_open(number, options.fail_open)
            .map_err(bind_err)?;
        queue.set_nonblocking(true);

        debug!(queue = number, "Queue bound");
        Ok(Self {
            queue,
            number,
            received: 0,
        })
    }
}

impl PacketQueue for NfQueue {
    type Ticket = Message;

    fn queue_num(&self) -> u16 {
        self.number
    }

    fn recv(&mut self) -> Result<Option<QueuedPacket<Message>>> {
        match self.queue.recv() {
            Ok(msg) => {
                self.received = self.received.wrapping_add(1);
                let packet = Packet::new(
                    self.number,
                    self.received,
                    Bytes::copy_from_slice(msg.get_payload()),
                );
                Ok(Some(QueuedPacket {
                    packet,
                    ticket: msg,
                }))
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                std::thread::sleep(Self::POLL_INTERVAL);
                Ok(None)
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(None),
            Err(source) => Err(PlatformError::Recv {
                number: self.number,
                source,
            }),
        }
    }

    fn verdict(&mut self, mut ticket: Message, verdict: Verdict) -> Result<()> {
        match verdict {
            Verdict::Accept => ticket.set_verdict(nfq::Verdict::Accept),
            Verdict::AcceptWithMark(mark) => {
                ticket.set_nfmark(mark);
                ticket.set_verdict(nfq::Verdict::Accept);
            }
            Verdict::Drop => ticket.set_verdict(nfq::Verdict::Drop),
        }
        self.queue
            .verdict(ticket)
            .map_err(|source| PlatformError::Verdict {
                number: self.number,
                source,
            })
    }
}

impl Drop for NfQueue {
    fn drop(&mut self) {
        if let Err(e) = self.queue.unbind(self.number) {
            warn!(queue = self.number, error = %e, "Failed to unbind queue");
        } else {
            info!(queue = self.number, "Queue closed");
        }
    }
}
