//! IPv4 / IPv6 header parsing

use super::types::{IpVersion, Protocol};
use crate::error::DecodeError;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Minimum IPv4 header size
pub const IPV4_MIN_HEADER_LEN: usize = 20;

/// Fixed IPv6 header size
pub const IPV6_HEADER_LEN: usize = 40;

/// Parsed IPv4 header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Header {
    /// Header length in 32-bit words
    pub header_len: u8,
    /// Total datagram length (buffer length when the header says 0)
    pub total_len: u16,
    /// Time to live
    pub ttl: u8,
    /// Transport protocol
    pub protocol: Protocol,
    /// Source address
    pub src: Ipv4Addr,
    /// Destination address
    pub dst: Ipv4Addr,
}

/// Parsed IPv6 base header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv6Header {
    /// Payload length field
    pub payload_len: u16,
    /// Hop limit
    pub hop_limit: u8,
    /// Next header, taken as the transport protocol
    pub next_header: Protocol,
    /// Source address
    pub src: Ipv6Addr,
    /// Destination address
    pub dst: Ipv6Addr,
}

/// Network layer header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkHeader {
    /// IPv4 header
    V4(Ipv4Header),
    /// IPv6 header
    V6(Ipv6Header),
}

impl NetworkHeader {
    /// Parse the network header and return it with the transport-layer bytes
    ///
    /// IPv6 extension headers are not walked: the next-header byte is used
    /// directly as the transport protocol.
    pub fn parse(data: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        let Some(&first) = data.first() else {
            return Err(DecodeError::too_short("ip", 1, 0));
        };

        match first >> 4 {
            4 => parse_ipv4(data),
            6 => parse_ipv6(data),
            version => Err(DecodeError::UnsupportedIpVersion(version)),
        }
    }

    /// IP version
    pub fn version(&self) -> IpVersion {
        match self {
            NetworkHeader::V4(_) => IpVersion::V4,
            NetworkHeader::V6(_) => IpVersion::V6,
        }
    }

    /// Transport protocol carried by this packet
    pub fn protocol(&self) -> Protocol {
        match self {
            NetworkHeader::V4(h) => h.protocol,
            NetworkHeader::V6(h) => h.next_header,
        }
    }

    /// Header length in bytes
    pub fn header_len(&self) -> usize {
        match self {
            NetworkHeader::V4(h) => usize::from(h.header_len) * 4,
            NetworkHeader::V6(_) => IPV6_HEADER_LEN,
        }
    }

    /// Total packet length as declared by the header
    pub fn total_len(&self) -> usize {
        match self {
            NetworkHeader::V4(h) => usize::from(h.total_len),
            NetworkHeader::V6(h) => IPV6_HEADER_LEN + usize::from(h.payload_len),
        }
    }

    /// Source address
    pub fn src(&self) -> IpAddr {
        match self {
            NetworkHeader::V4(h) => IpAddr::V4(h.src),
            NetworkHeader::V6(h) => IpAddr::V6(h.src),
        }
    }

    /// Destination address
    pub fn dst(&self) -> IpAddr {
        match self {
            NetworkHeader::V4(h) => IpAddr::V4(h.dst),
            NetworkHeader::V6(h) => IpAddr::V6(h.dst),
        }
    }
}

fn parse_ipv4(data: &[u8]) -> Result<(NetworkHeader, &[u8]), DecodeError> {
    if data.len() < IPV4_MIN_HEADER_LEN {
        return Err(DecodeError::too_short("ipv4", IPV4_MIN_HEADER_LEN, data.len()));
    }

    let header_len = data[0] & 0x0f;
    let mut total_len = u16::from_be_bytes([data[2], data[3]]);

    // TSO captures leave the length field unset
    if total_len == 0 {
        total_len = u16::try_from(data.len()).unwrap_or(u16::MAX);
    }

    if usize::from(total_len) < IPV4_MIN_HEADER_LEN {
        return Err(DecodeError::too_short(
            "ipv4",
            IPV4_MIN_HEADER_LEN,
            usize::from(total_len),
        ));
    }
    if header_len < 5 {
        return Err(DecodeError::too_short(
            "ipv4",
            IPV4_MIN_HEADER_LEN,
            usize::from(header_len) * 4,
        ));
    }

    let header_bytes = usize::from(header_len) * 4;
    let end = usize::from(total_len).min(data.len());
    if header_bytes > end {
        return Err(DecodeError::too_short("ipv4", header_bytes, end));
    }

    let header = Ipv4Header {
        header_len,
        total_len,
        ttl: data[8],
        protocol: Protocol::from_u8(data[9]),
        src: Ipv4Addr::new(data[12], data[13], data[14], data[15]),
        dst: Ipv4Addr::new(data[16], data[17], data[18], data[19]),
    };

    if let Protocol::Other(n) = header.protocol {
        return Err(DecodeError::UnsupportedProtocol(n));
    }

    Ok((NetworkHeader::V4(header), &data[header_bytes..end]))
}

fn parse_ipv6(data: &[u8]) -> Result<(NetworkHeader, &[u8]), DecodeError> {
    if data.len() < IPV6_HEADER_LEN {
        return Err(DecodeError::too_short("ipv6", IPV6_HEADER_LEN, data.len()));
    }

    let mut src = [0u8; 16];
    let mut dst = [0u8; 16];
    src.copy_from_slice(&data[8..24]);
    dst.copy_from_slice(&data[24..40]);

    let header = Ipv6Header {
        payload_len: u16::from_be_bytes([data[4], data[5]]),
        hop_limit: data[7],
        next_header: Protocol::from_u8(data[6]),
        src: Ipv6Addr::from(src),
        dst: Ipv6Addr::from(dst),
    };

    if let Protocol::Other(n) = header.next_header {
        return Err(DecodeError::UnsupportedProtocol(n));
    }

    Ok((NetworkHeader::V6(header), &data[IPV6_HEADER_LEN..]))
}
