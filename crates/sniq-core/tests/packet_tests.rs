//! Integration tests for packet decoding
//!
//! Packets are framed with pnet_packet and carry hand-built ClientHellos.

mod common;

use common::*;
use pnet_packet::ip::IpNextHeaderProtocols;
use sniq_core::packet::{decode, IpVersion, NetworkHeader, Protocol, TcpFlags, TransportSegment};
use sniq_core::tls::SniViolation;
use sniq_core::DecodeError;

// =========== TLS over TCP ===========

#[test]
fn test_ipv4_tcp_client_hello() {
    let decoded = decode(&tls_packet_v4("dns.google")).unwrap();

    assert_eq!(decoded.network.version(), IpVersion::V4);
    assert_eq!(decoded.network.src(), CLIENT_V4);
    assert_eq!(decoded.network.dst(), SERVER_V4);
    assert_eq!(decoded.transport.protocol(), Protocol::Tcp);
    assert_eq!(decoded.transport.dst_port(), 443);
    assert_eq!(decoded.sni(), Some("dns.google"));
    assert_eq!(decoded.hello.unwrap().version, 0x0303);
}

#[test]
fn test_ipv6_tcp_client_hello() {
    let segment = tcp(PSH_ACK, &tls_record(&client_hello(Some("ipv6.example"))));
    let decoded = decode(&ipv6(IpNextHeaderProtocols::Tcp, &segment)).unwrap();

    assert_eq!(decoded.network.version(), IpVersion::V6);
    assert_eq!(decoded.network.src(), CLIENT_V6);
    assert_eq!(decoded.network.header_len(), 40);
    assert_eq!(decoded.sni(), Some("ipv6.example"));
}

#[test]
fn test_client_hello_without_sni() {
    let segment = tcp(PSH_ACK, &tls_record(&client_hello(None)));
    let decoded = decode(&ipv4(IpNextHeaderProtocols::Tcp, &segment)).unwrap();

    let hello = decoded.hello.as_ref().unwrap();
    assert_eq!(hello.sni, None);
    assert_eq!(hello.violation, None);
    assert_eq!(decoded.sni(), None);
}

#[test]
fn test_bare_tcp_header_has_no_hello() {
    let segment = tcp(0x10, &[]);
    assert_eq!(segment.len(), 20);

    let decoded = decode(&ipv4(IpNextHeaderProtocols::Tcp, &segment)).unwrap();
    assert_eq!(decoded.transport.tcp_flags(), Some(TcpFlags::ACK));
    assert_eq!(decoded.hello, None);
}

#[test]
fn test_non_handshake_payload_is_ignored() {
    let segment = tcp(PSH_ACK, b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n");
    let decoded = decode(&ipv4(IpNextHeaderProtocols::Tcp, &segment)).unwrap();
    assert_eq!(decoded.hello, None);
}

#[test]
fn test_server_hello_rejected() {
    let mut record = tls_record(&client_hello(Some("a.example")));
    record[5] = 0x02;
    let segment = tcp(PSH_ACK, &record);

    assert_eq!(
        decode(&ipv4(IpNextHeaderProtocols::Tcp, &segment)),
        Err(DecodeError::NotAClientHello(0x02))
    );
}

#[test]
fn test_truncated_client_hello() {
    let record = tls_record(&client_hello(Some("cut.example")));
    let segment = tcp(PSH_ACK, &record[..60]);

    assert!(matches!(
        decode(&ipv4(IpNextHeaderProtocols::Tcp, &segment)),
        Err(DecodeError::Truncated { .. })
    ));
}

#[test]
fn test_duplicate_sni_is_violation() {
    let ext = server_name_ext(&[b"one.example", b"two.example"]);
    let segment = tcp(PSH_ACK, &tls_record(&client_hello_with_extensions(&ext)));
    let decoded = decode(&ipv4(IpNextHeaderProtocols::Tcp, &segment)).unwrap();

    let hello = decoded.hello.unwrap();
    assert_eq!(hello.sni, None);
    assert_eq!(hello.violation, Some(SniViolation::DuplicateName));
}

#[test]
fn test_trailing_dot_is_violation() {
    let ext = server_name_ext(&[b"dotted.example."]);
    let segment = tcp(PSH_ACK, &tls_record(&client_hello_with_extensions(&ext)));
    let decoded = decode(&ipv4(IpNextHeaderProtocols::Tcp, &segment)).unwrap();

    assert_eq!(decoded.sni(), None);
    assert_eq!(decoded.hello.unwrap().violation, Some(SniViolation::TrailingDot));
}

// =========== Network Layer ===========

#[test]
fn test_ipv4_zero_total_length() {
    // Segmentation offload hands over packets whose total length is 0
    let payload = vec![0xaa; 281 - 40];
    let mut packet = ipv4(IpNextHeaderProtocols::Tcp, &tcp(PSH_ACK, &payload));
    assert_eq!(packet.len(), 281);
    packet[2] = 0;
    packet[3] = 0;

    let decoded = decode(&packet).unwrap();
    assert_eq!(decoded.network.total_len(), 281);
    let NetworkHeader::V4(header) = &decoded.network else {
        panic!("expected IPv4");
    };
    assert_eq!(header.total_len, 281);
}

#[test]
fn test_unsupported_ip_version() {
    let mut packet = tls_packet_v4("a.example");
    packet[0] = 0x55;
    assert_eq!(decode(&packet), Err(DecodeError::UnsupportedIpVersion(5)));
}

#[test]
fn test_unsupported_transport() {
    // ICMP echo request
    let packet = ipv4(IpNextHeaderProtocols::Icmp, &[8, 0, 0, 0, 0, 1, 0, 1]);
    assert_eq!(decode(&packet), Err(DecodeError::UnsupportedProtocol(1)));
}

#[test]
fn test_truncated_ipv6() {
    let packet = ipv6(IpNextHeaderProtocols::Tcp, &tcp(0x02, &[]));
    assert!(matches!(
        decode(&packet[..30]),
        Err(DecodeError::TooShort { layer: "ipv6", .. })
    ));
}

// =========== UDP ===========

#[test]
fn test_udp_length_past_buffer() {
    let mut datagram = udp(&[0u8; 16]);
    datagram[4] = 0x01;
    datagram[5] = 0x00;

    assert!(matches!(
        decode(&ipv4(IpNextHeaderProtocols::Udp, &datagram)),
        Err(DecodeError::Truncated { expected: 256, .. })
    ));
}

#[test]
fn test_udp_non_quic_payload() {
    // A DNS query header has the long header bit clear
    let datagram = udp(&[0x12, 0x34, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00]);
    assert_eq!(
        decode(&ipv4(IpNextHeaderProtocols::Udp, &datagram)),
        Err(DecodeError::NotLongHeader)
    );
}

#[test]
fn test_udp_quic_client_hello() {
    let decoded = decode(&quic_packet_v4("quic.example")).unwrap();
    let TransportSegment::Udp(udp) = &decoded.transport else {
        panic!("expected UDP");
    };
    assert_eq!(udp.dst_port, 443);
    assert_eq!(decoded.sni(), Some("quic.example"));
}
