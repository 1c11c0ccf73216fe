//! Packet builders shared by the integration tests and the benchmark

#![allow(dead_code)]

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Nonce};
use pnet_packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};
use pnet_packet::ipv4::MutableIpv4Packet;
use pnet_packet::ipv6::MutableIpv6Packet;
use pnet_packet::tcp::MutableTcpPacket;
use pnet_packet::udp::MutableUdpPacket;
use sniq_core::quic::crypto::SAMPLE_LEN;
use sniq_core::quic::{InitialKeys, QuicVersion};
use std::net::{Ipv4Addr, Ipv6Addr};

pub const CLIENT_V4: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 10);
pub const SERVER_V4: Ipv4Addr = Ipv4Addr::new(203, 0, 113, 5);
pub const CLIENT_V6: Ipv6Addr = Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0x10);
pub const SERVER_V6: Ipv6Addr = Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0x5);

/// TCP PSH+ACK
pub const PSH_ACK: u8 = 0x18;

/// Destination connection id of RFC 9001 Appendix A
pub const RFC_DCID: [u8; 8] = [0x83, 0x94, 0xc8, 0xf0, 0x3e, 0x51, 0x57, 0x08];

// =========== Framing ===========

pub fn ipv4(protocol: IpNextHeaderProtocol, segment: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; 20 + segment.len()];
    let total = u16::try_from(buf.len()).unwrap();
    let mut ip = MutableIpv4Packet::new(&mut buf).unwrap();
    ip.set_version(4);
    ip.set_header_length(5);
    ip.set_total_length(total);
    ip.set_ttl(64);
    ip.set_next_level_protocol(protocol);
    ip.set_source(CLIENT_V4);
    ip.set_destination(SERVER_V4);
    ip.set_payload(segment);
    buf
}

pub fn ipv6(protocol: IpNextHeaderProtocol, segment: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; 40 + segment.len()];
    let mut ip = MutableIpv6Packet::new(&mut buf).unwrap();
    ip.set_version(6);
    ip.set_payload_length(u16::try_from(segment.len()).unwrap());
    ip.set_next_header(protocol);
    ip.set_hop_limit(64);
    ip.set_source(CLIENT_V6);
    ip.set_destination(SERVER_V6);
    ip.set_payload(segment);
    buf
}

pub fn tcp(flags: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; 20 + payload.len()];
    let mut tcp = MutableTcpPacket::new(&mut buf).unwrap();
    tcp.set_source(50000);
    tcp.set_destination(443);
    tcp.set_sequence(1);
    tcp.set_acknowledgement(1);
    tcp.set_data_offset(5);
    tcp.set_flags(flags.into());
    tcp.set_window(0xffff);
    tcp.set_payload(payload);
    buf
}

pub fn udp(payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; 8 + payload.len()];
    let length = u16::try_from(buf.len()).unwrap();
    let mut udp = MutableUdpPacket::new(&mut buf).unwrap();
    udp.set_source(50000);
    udp.set_destination(443);
    udp.set_length(length);
    udp.set_payload(payload);
    buf
}

/// IPv4 / TCP / TLS record carrying a ClientHello for `sni`
pub fn tls_packet_v4(sni: &str) -> Vec<u8> {
    ipv4(
        IpNextHeaderProtocols::Tcp,
        &tcp(PSH_ACK, &tls_record(&client_hello(Some(sni)))),
    )
}

/// IPv4 / UDP / QUIC v1 Initial carrying a ClientHello for `sni`
pub fn quic_packet_v4(sni: &str) -> Vec<u8> {
    ipv4(
        IpNextHeaderProtocols::Udp,
        &udp(&quic_initial(QuicVersion::V1, &RFC_DCID, &client_hello(Some(sni)))),
    )
}

// =========== TLS ===========

fn prefixed16(body: &[u8]) -> Vec<u8> {
    let mut out = u16::try_from(body.len()).unwrap().to_be_bytes().to_vec();
    out.extend_from_slice(body);
    out
}

pub fn server_name_ext(names: &[&[u8]]) -> Vec<u8> {
    let mut list = Vec::new();
    for name in names {
        list.push(0);
        list.extend_from_slice(&prefixed16(name));
    }
    let mut ext = vec![0x00, 0x00];
    ext.extend_from_slice(&prefixed16(&prefixed16(&list)));
    ext
}

/// ClientHello handshake message, starting at the message type byte
pub fn client_hello(sni: Option<&str>) -> Vec<u8> {
    let mut extensions = Vec::new();
    // supported_versions: TLS 1.3
    extensions.extend_from_slice(&[0x00, 0x2b, 0x00, 0x03, 0x02, 0x03, 0x04]);
    if let Some(name) = sni {
        extensions.extend_from_slice(&server_name_ext(&[name.as_bytes()]));
    }
    client_hello_with_extensions(&extensions)
}

pub fn client_hello_with_extensions(extensions: &[u8]) -> Vec<u8> {
    let mut body = vec![0x03, 0x03];
    body.extend_from_slice(&[0x11; 32]);
    body.push(32);
    body.extend_from_slice(&[0x22; 32]);
    body.extend_from_slice(&prefixed16(&[0x13, 0x01, 0x13, 0x02, 0x13, 0x03]));
    body.extend_from_slice(&[0x01, 0x00]);
    body.extend_from_slice(&prefixed16(extensions));

    let len = u32::try_from(body.len()).unwrap().to_be_bytes();
    let mut msg = vec![0x01, len[1], len[2], len[3]];
    msg.extend_from_slice(&body);
    msg
}

/// Wrap a handshake message in a TLS record header
pub fn tls_record(handshake: &[u8]) -> Vec<u8> {
    let mut record = vec![0x16, 0x03, 0x01];
    record.extend_from_slice(&prefixed16(handshake));
    record
}

// =========== QUIC ===========

/// Header fields for a sealed client Initial
#[derive(Debug, Clone, Copy)]
pub struct InitialSpec<'a> {
    pub version: QuicVersion,
    pub dcid: &'a [u8],
    pub token: &'a [u8],
    /// Encoded packet number length, 1 to 4
    pub pn_len: usize,
    pub packet_number: u64,
    /// Reserved bits (0x0c) to set in the unprotected first byte
    pub reserved_bits: u8,
}

impl<'a> InitialSpec<'a> {
    pub fn new(version: QuicVersion, dcid: &'a [u8]) -> Self {
        Self {
            version,
            dcid,
            token: &[],
            pn_len: 4,
            packet_number: 0,
            reserved_bits: 0,
        }
    }
}

/// Seal a client Initial packet holding `hello` in one CRYPTO frame
pub fn quic_initial(version: QuicVersion, dcid: &[u8], hello: &[u8]) -> Vec<u8> {
    seal_initial(&InitialSpec::new(version, dcid), hello)
}

/// Seal a client Initial described by `spec`
pub fn seal_initial(spec: &InitialSpec<'_>, hello: &[u8]) -> Vec<u8> {
    const TAG_LEN: usize = 16;
    let pn_len = spec.pn_len;
    assert!((1..=4).contains(&pn_len));
    assert!(spec.token.len() < 0x40);

    let crypto_len = u16::try_from(hello.len()).unwrap();
    assert!(crypto_len < 0x4000);
    let mut plaintext = vec![0x06, 0x00, 0x40 | (crypto_len >> 8) as u8, crypto_len as u8];
    plaintext.extend_from_slice(hello);
    // PADDING frames up to a typical Initial size
    if plaintext.len() < 1162 {
        plaintext.resize(1162, 0);
    }

    let length = u16::try_from(pn_len + plaintext.len() + TAG_LEN).unwrap();
    assert!(length < 0x4000);

    let first = 0xc0
        | (spec.version.initial_type() << 4)
        | (spec.reserved_bits & 0x0c)
        | (pn_len as u8 - 1);
    let mut header = vec![first];
    header.extend_from_slice(&spec.version.to_u32().to_be_bytes());
    header.push(u8::try_from(spec.dcid.len()).unwrap());
    header.extend_from_slice(spec.dcid);
    header.push(0); // SCID length
    header.push(spec.token.len() as u8);
    header.extend_from_slice(spec.token);
    header.extend_from_slice(&(0x4000 | length).to_be_bytes());
    let pn_offset = header.len();
    header.extend_from_slice(&spec.packet_number.to_be_bytes()[8 - pn_len..]);

    let keys = InitialKeys::derive(spec.version, spec.dcid).unwrap();
    let cipher = Aes128Gcm::new_from_slice(keys.key()).unwrap();
    let nonce = keys.nonce(spec.packet_number);
    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: &plaintext,
                aad: &header,
            },
        )
        .unwrap();

    let mut packet = header;
    packet.extend_from_slice(&ciphertext);

    // The sample always assumes a 4-byte packet number
    let sample_start = pn_offset + 4;
    let sample: [u8; SAMPLE_LEN] = packet[sample_start..sample_start + SAMPLE_LEN]
        .try_into()
        .unwrap();
    let mask = keys.header_mask(&sample);
    packet[0] ^= mask[0] & 0x0f;
    for (byte, m) in packet[pn_offset..pn_offset + pn_len].iter_mut().zip(&mask[1..]) {
        *byte ^= m;
    }
    packet
}
