//! TCP / UDP parsing and extractor dispatch

use super::types::{Protocol, TcpFlags};
use crate::error::DecodeError;
use crate::quic;
use crate::tls::{self, ClientHello};

/// Minimum TCP header size
pub const TCP_MIN_HEADER_LEN: usize = 20;

/// UDP header size
pub const UDP_HEADER_LEN: usize = 8;

/// TLS record header size (type, version, length)
pub const TLS_RECORD_HEADER_LEN: usize = 5;

/// TLS record content type for handshake messages
pub const TLS_HANDSHAKE: u8 = 0x16;

/// Parsed TCP header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpSegment {
    /// Source port
    pub src_port: u16,
    /// Destination port
    pub dst_port: u16,
    /// Control flags
    pub flags: TcpFlags,
    /// Offset of the payload from the start of the segment
    pub payload_offset: usize,
    /// Payload starts with a TLS handshake record
    pub handshake: bool,
}

/// Parsed UDP header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpDatagram {
    /// Source port
    pub src_port: u16,
    /// Destination port
    pub dst_port: u16,
    /// Length field, header included
    pub length: u16,
}

/// Transport layer segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSegment {
    /// TCP segment
    Tcp(TcpSegment),
    /// UDP datagram
    Udp(UdpDatagram),
}

impl TransportSegment {
    /// Parse the transport header for `protocol` and return it with its payload
    pub fn parse(protocol: Protocol, data: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        match protocol {
            Protocol::Tcp => parse_tcp(data),
            Protocol::Udp => parse_udp(data),
            Protocol::Other(n) => Err(DecodeError::UnsupportedProtocol(n)),
        }
    }

    /// Run the TLS or QUIC extractor over the payload
    ///
    /// `Ok(None)` means the segment carries nothing to inspect: a TCP segment
    /// without payload or whose payload is not a TLS handshake record.
    pub fn client_hello(&self, payload: &[u8]) -> Result<Option<ClientHello>, DecodeError> {
        match self {
            TransportSegment::Tcp(tcp) => {
                if !tcp.handshake {
                    return Ok(None);
                }
                if payload.len() < TLS_RECORD_HEADER_LEN {
                    return Err(DecodeError::truncated(TLS_RECORD_HEADER_LEN, payload.len()));
                }
                tls::parse_client_hello(&payload[TLS_RECORD_HEADER_LEN..]).map(Some)
            }
            TransportSegment::Udp(_) => {
                let initial = quic::decrypt_initial(payload)?;
                initial.client_hello().map(Some)
            }
        }
    }

    /// Transport protocol
    pub fn protocol(&self) -> Protocol {
        match self {
            TransportSegment::Tcp(_) => Protocol::Tcp,
            TransportSegment::Udp(_) => Protocol::Udp,
        }
    }

    /// Source port
    pub fn src_port(&self) -> u16 {
        match self {
            TransportSegment::Tcp(t) => t.src_port,
            TransportSegment::Udp(u) => u.src_port,
        }
    }

    /// Destination port
    pub fn dst_port(&self) -> u16 {
        match self {
            TransportSegment::Tcp(t) => t.dst_port,
            TransportSegment::Udp(u) => u.dst_port,
        }
    }

    /// TCP flags, if this is a TCP segment
    pub fn tcp_flags(&self) -> Option<TcpFlags> {
        match self {
            TransportSegment::Tcp(t) => Some(t.flags),
            TransportSegment::Udp(_) => None,
        }
    }
}

fn parse_tcp(data: &[u8]) -> Result<(TransportSegment, &[u8]), DecodeError> {
    if data.len() < TCP_MIN_HEADER_LEN {
        return Err(DecodeError::too_short("tcp", TCP_MIN_HEADER_LEN, data.len()));
    }

    let data_offset = data[12] >> 4;
    if data_offset < 5 {
        return Err(DecodeError::too_short(
            "tcp",
            TCP_MIN_HEADER_LEN,
            usize::from(data_offset) * 4,
        ));
    }

    let payload_offset = usize::from(data_offset) * 4;
    // Control segments (SYN, pure ACK, FIN/RST) end at the header
    let payload = data.get(payload_offset..).unwrap_or_default();

    let segment = TcpSegment {
        src_port: u16::from_be_bytes([data[0], data[1]]),
        dst_port: u16::from_be_bytes([data[2], data[3]]),
        flags: TcpFlags::from_bits_truncate(data[13]),
        payload_offset,
        handshake: payload.first() == Some(&TLS_HANDSHAKE),
    };

    Ok((TransportSegment::Tcp(segment), payload))
}

fn parse_udp(data: &[u8]) -> Result<(TransportSegment, &[u8]), DecodeError> {
    if data.len() < UDP_HEADER_LEN {
        return Err(DecodeError::too_short("udp", UDP_HEADER_LEN, data.len()));
    }

    let length = u16::from_be_bytes([data[4], data[5]]);
    let len = usize::from(length);
    if len < UDP_HEADER_LEN || len > data.len() {
        return Err(DecodeError::truncated(len, data.len()));
    }

    let datagram = UdpDatagram {
        src_port: u16::from_be_bytes([data[0], data[1]]),
        dst_port: u16::from_be_bytes([data[2], data[3]]),
        length,
    };

    Ok((TransportSegment::Udp(datagram), &data[UDP_HEADER_LEN..len]))
}
