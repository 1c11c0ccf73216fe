//! Packet decoding
//!
//! Walks a raw IP packet from the network header down to the TLS ClientHello,
//! either from a TCP handshake record or from a decrypted QUIC Initial.

mod network;
mod transport;
mod types;

pub use network::{Ipv4Header, Ipv6Header, NetworkHeader, IPV4_MIN_HEADER_LEN, IPV6_HEADER_LEN};
pub use transport::{
    TcpSegment, TransportSegment, UdpDatagram, TCP_MIN_HEADER_LEN, TLS_HANDSHAKE,
    TLS_RECORD_HEADER_LEN, UDP_HEADER_LEN,
};
pub use types::*;

use crate::error::{DecodeError, Result};
use crate::tls::ClientHello;
use bytes::Bytes;

/// A packet taken from a kernel queue
#[derive(Debug, Clone)]
pub struct Packet {
    /// Queue number the packet arrived on
    pub queue: u16,
    /// Per-queue packet id
    pub id: u32,
    /// Raw IP packet
    data: Bytes,
}

impl Packet {
    /// Create a packet from raw IP bytes
    pub fn new(queue: u16, id: u32, data: impl Into<Bytes>) -> Self {
        Self {
            queue,
            id,
            data: data.into(),
        }
    }

    /// Create a packet from a hex dump, ignoring whitespace
    pub fn from_hex(queue: u16, id: u32, hex_str: &str) -> Result<Self> {
        let cleaned: String = hex_str.chars().filter(|c| !c.is_whitespace()).collect();
        let data = hex::decode(cleaned)?;
        Ok(Self::new(queue, id, data))
    }

    /// Raw packet bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Packet length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the packet is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Decode this packet down to its ClientHello
    pub fn decode(&self) -> std::result::Result<Decoded, DecodeError> {
        decode(&self.data)
    }
}

/// Everything the decoder learned about one packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// Network header
    pub network: NetworkHeader,
    /// Transport header
    pub transport: TransportSegment,
    /// ClientHello, when the payload carried one
    pub hello: Option<ClientHello>,
}

impl Decoded {
    /// Server name, if one was extracted
    pub fn sni(&self) -> Option<&str> {
        self.hello.as_ref().and_then(|h| h.sni.as_deref())
    }
}

/// Decode a raw IP packet
pub fn decode(data: &[u8]) -> std::result::Result<Decoded, DecodeError> {
    let (network, segment) = NetworkHeader::parse(data)?;
    let (transport, payload) = TransportSegment::parse(network.protocol(), segment)?;
    let hello = transport.client_hello(payload)?;

    Ok(Decoded {
        network,
        transport,
        hello,
    })
}
