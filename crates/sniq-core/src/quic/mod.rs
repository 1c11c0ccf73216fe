//! QUIC Initial packet decryption
//!
//! A client's first flight is an Initial packet whose payload is encrypted
//! with keys derived from public values. [`decrypt_initial`] parses the long
//! header, removes header protection, opens the payload and hands the
//! CRYPTO frame contents to the TLS extractor.

pub mod crypto;

pub use crypto::{InitialKeys, QuicVersion};

use crate::error::DecodeError;
use crate::tls::{self, ClientHello};
use crate::wire::ByteCursor;
use crypto::SAMPLE_LEN;
use tracing::debug;

/// Size of the CRYPTO frame header skipped before the ClientHello:
/// frame type, a one-byte offset and a two-byte length
pub const CRYPTO_FRAME_HEADER_LEN: usize = 4;

/// Offset of the header protection sample past the packet number start
const SAMPLE_OFFSET: usize = 4;

/// Long header of an Initial packet, still header protected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialHeader<'a> {
    /// First byte as received
    pub type_byte: u8,
    /// Version
    pub version: QuicVersion,
    /// Destination connection id
    pub dcid: &'a [u8],
    /// Source connection id
    pub scid: &'a [u8],
    /// Address validation token
    pub token: &'a [u8],
    /// Length of packet number plus payload
    pub length: usize,
    /// Offset of the packet number
    pub parsed_len: usize,
}

impl<'a> InitialHeader<'a> {
    /// Parse the long header of an Initial packet
    pub fn parse(data: &'a [u8]) -> Result<Self, DecodeError> {
        let mut cur = ByteCursor::new(data);

        let type_byte = cur.read_u8()?;
        if type_byte & 0x80 == 0 {
            return Err(DecodeError::NotLongHeader);
        }

        let raw_version = cur.read_u32()?;
        if raw_version == 0 {
            // Version negotiation
            return Err(DecodeError::NotInitial);
        }
        if type_byte & 0x40 == 0 {
            return Err(DecodeError::NotQuic);
        }

        let dcid = cur.read_u8_prefixed()?;
        let scid = cur.read_u8_prefixed()?;

        let version =
            QuicVersion::from_u32(raw_version).ok_or(DecodeError::UnsupportedVersion(raw_version))?;
        if (type_byte & 0x30) >> 4 != version.initial_type() {
            return Err(DecodeError::NotInitial);
        }

        let token_len = varint_len(cur.read_varint()?, cur.remaining())?;
        let token = cur.read_bytes(token_len)?;
        let length = varint_len(cur.read_varint()?, cur.remaining())?;
        let parsed_len = cur.position();

        if length > cur.remaining() {
            return Err(DecodeError::truncated(length, cur.remaining()));
        }

        Ok(Self {
            type_byte,
            version,
            dcid,
            scid,
            token,
            length,
            parsed_len,
        })
    }

    /// End of this packet within the datagram; coalesced packets follow
    pub fn packet_end(&self) -> usize {
        self.parsed_len + self.length
    }
}

fn varint_len(value: u64, available: usize) -> Result<usize, DecodeError> {
    usize::try_from(value).map_err(|_| DecodeError::truncated(usize::MAX, available))
}

/// A decrypted Initial packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialPacket {
    /// Version the packet was protected with
    pub version: QuicVersion,
    /// Full packet number
    pub packet_number: u64,
    /// Encoded packet number length (1 to 4)
    pub pn_len: usize,
    /// Reserved header bits were zero after unmasking
    pub reserved_bits_valid: bool,
    /// Decrypted frames
    pub payload: Vec<u8>,
}

impl InitialPacket {
    /// Contents of the leading CRYPTO frame
    pub fn crypto_data(&self) -> Result<&[u8], DecodeError> {
        self.payload
            .get(CRYPTO_FRAME_HEADER_LEN..)
            .ok_or_else(|| DecodeError::truncated(CRYPTO_FRAME_HEADER_LEN, self.payload.len()))
    }

    /// Parse the ClientHello carried in the CRYPTO frame
    pub fn client_hello(&self) -> Result<ClientHello, DecodeError> {
        tls::parse_client_hello(self.crypto_data()?)
    }
}

/// Decrypt the first Initial packet of a UDP datagram
pub fn decrypt_initial(data: &[u8]) -> Result<InitialPacket, DecodeError> {
    let header = InitialHeader::parse(data)?;
    let packet = &data[..header.packet_end()];
    let pn_offset = header.parsed_len;

    let keys = InitialKeys::derive(header.version, header.dcid)?;

    let sample_start = pn_offset + SAMPLE_OFFSET;
    let sample: &[u8; SAMPLE_LEN] = packet
        .get(sample_start..sample_start + SAMPLE_LEN)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| {
            DecodeError::truncated(sample_start + SAMPLE_LEN, packet.len())
        })?;
    let mask = keys.header_mask(sample);

    let first = header.type_byte ^ (mask[0] & 0x0f);
    let pn_len = usize::from(first & 0x03) + 1;
    let header_len = pn_offset + pn_len;

    let mut aad = packet[..header_len].to_vec();
    aad[0] = first;
    for (byte, m) in aad[pn_offset..].iter_mut().zip(&mask[1..]) {
        *byte ^= m;
    }
    let packet_number = aad[pn_offset..]
        .iter()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));

    let reserved_bits_valid = first & 0x0c == 0;
    if !reserved_bits_valid {
        debug!(
            version = %header.version,
            first_byte = first,
            "QUIC Initial with reserved bits set"
        );
    }

    let payload = keys.open(packet_number, &aad, &packet[header_len..])?;

    Ok(InitialPacket {
        version: header.version,
        packet_number,
        pn_len,
        reserved_bits_valid,
        payload,
    })
}
