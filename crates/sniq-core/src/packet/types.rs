//! Packet type definitions

use bitflags::bitflags;

/// IP version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpVersion {
    /// IPv4
    V4,
    /// IPv6
    V6,
}

impl IpVersion {
    /// Numeric version as carried in the header nibble
    pub fn to_u8(self) -> u8 {
        match self {
            IpVersion::V4 => 4,
            IpVersion::V6 => 6,
        }
    }
}

/// Transport protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// TCP (protocol number 6)
    Tcp,
    /// UDP (protocol number 17)
    Udp,
    /// Anything else, including IPv6 extension headers
    Other(u8),
}

impl Protocol {
    /// Create from protocol number
    pub fn from_u8(proto: u8) -> Self {
        match proto {
            6 => Protocol::Tcp,
            17 => Protocol::Udp,
            other => Protocol::Other(other),
        }
    }

    /// Get protocol number
    pub fn to_u8(self) -> u8 {
        match self {
            Protocol::Tcp => 6,
            Protocol::Udp => 17,
            Protocol::Other(n) => n,
        }
    }
}

bitflags! {
    /// TCP control flags (byte 13 of the TCP header)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TcpFlags: u8 {
        /// No more data from sender
        const FIN = 0x01;
        /// Synchronize sequence numbers
        const SYN = 0x02;
        /// Reset the connection
        const RST = 0x04;
        /// Push function
        const PSH = 0x08;
        /// Acknowledgment field significant
        const ACK = 0x10;
        /// Urgent pointer field significant
        const URG = 0x20;
        /// ECN echo
        const ECE = 0x40;
        /// Congestion window reduced
        const CWR = 0x80;
    }
}

impl TcpFlags {
    /// Whether this segment opens or tears down a connection
    pub fn is_control(self) -> bool {
        self.intersects(TcpFlags::SYN | TcpFlags::FIN | TcpFlags::RST)
    }
}
