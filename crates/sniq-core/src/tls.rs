//! TLS ClientHello server name extraction
//!
//! The parser starts at the handshake message type byte. Callers strip the
//! 5-byte TLS record header (TCP) or the CRYPTO frame header (QUIC) first.
//!
//! Structural problems (a length pointing past the buffer) are
//! [`DecodeError`]s. A well-formed message with a questionable `server_name`
//! extension yields a [`ClientHello`] without a name and records the
//! [`SniViolation`] instead.

use crate::error::DecodeError;
use crate::wire::ByteCursor;
use std::fmt;

/// Handshake message type of a ClientHello
pub const HANDSHAKE_CLIENT_HELLO: u8 = 0x01;

/// Extension type of `server_name`
pub const EXT_SERVER_NAME: u16 = 0x0000;

/// Name type of a DNS hostname inside `server_name`
pub const NAME_TYPE_HOST_NAME: u8 = 0x00;

/// Size of the client random
const RANDOM_LEN: usize = 32;

/// Why a `server_name` extension was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SniViolation {
    /// More than one hostname, in one extension or across several
    DuplicateName,
    /// Hostname ends with a dot
    TrailingDot,
    /// Zero-length hostname
    EmptyName,
    /// `server_name` extension with an empty name list
    EmptyList,
    /// Hostname is not valid UTF-8
    InvalidUtf8,
}

impl fmt::Display for SniViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SniViolation::DuplicateName => "multiple server names",
            SniViolation::TrailingDot => "server name has a trailing dot",
            SniViolation::EmptyName => "empty server name",
            SniViolation::EmptyList => "empty server name list",
            SniViolation::InvalidUtf8 => "server name is not valid UTF-8",
        };
        f.write_str(s)
    }
}

/// The parts of a ClientHello this crate cares about
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientHello {
    /// Legacy protocol version field
    pub version: u16,
    /// Server name indication
    pub sni: Option<String>,
    /// Set when a `server_name` extension was present but rejected
    pub violation: Option<SniViolation>,
}

impl ClientHello {
    fn rejected(version: u16, violation: SniViolation) -> Self {
        Self {
            version,
            sni: None,
            violation: Some(violation),
        }
    }
}

/// Parse a ClientHello handshake message
pub fn parse_client_hello(data: &[u8]) -> Result<ClientHello, DecodeError> {
    let mut cur = ByteCursor::new(data);

    let msg_type = cur.read_u8()?;
    if msg_type != HANDSHAKE_CLIENT_HELLO {
        return Err(DecodeError::NotAClientHello(msg_type));
    }
    // Handshake length is not enforced: a hello split over several
    // segments is parsed as far as it goes
    cur.read_u24()?;
    let version = cur.read_u16()?;
    cur.skip(RANDOM_LEN)?;

    cur.read_u8_prefixed()?; // session id
    let suites = cur.read_u16_prefixed()?;
    if suites.len() % 2 != 0 {
        return Err(DecodeError::truncated(suites.len() + 1, suites.len()));
    }
    cur.read_u8_prefixed()?; // compression methods

    let mut hello = ClientHello {
        version,
        ..ClientHello::default()
    };

    if cur.is_empty() {
        return Ok(hello);
    }

    let mut extensions = ByteCursor::new(cur.read_u16_prefixed()?);
    while !extensions.is_empty() {
        let ext_type = extensions.read_u16()?;
        let ext_data = extensions.read_u16_prefixed()?;

        if ext_type != EXT_SERVER_NAME {
            continue;
        }

        match parse_server_name(ext_data, hello.sni.is_some())? {
            Ok(Some(name)) => hello.sni = Some(name),
            Ok(None) => {}
            Err(violation) => return Ok(ClientHello::rejected(version, violation)),
        }
    }

    Ok(hello)
}

/// Parse the body of a `server_name` extension
///
/// The outer `Result` is structural, the inner one carries a violation.
fn parse_server_name(
    data: &[u8],
    already_named: bool,
) -> Result<Result<Option<String>, SniViolation>, DecodeError> {
    let mut cur = ByteCursor::new(data);
    let list = cur.read_u16_prefixed()?;
    if !cur.is_empty() {
        return Err(DecodeError::truncated(list.len(), data.len() - 2));
    }
    if list.is_empty() {
        return Ok(Err(SniViolation::EmptyList));
    }

    let mut entries = ByteCursor::new(list);
    let mut found: Option<String> = None;

    while !entries.is_empty() {
        let name_type = entries.read_u8()?;
        let name = entries.read_u16_prefixed()?;

        if name_type != NAME_TYPE_HOST_NAME {
            continue;
        }
        if already_named || found.is_some() {
            return Ok(Err(SniViolation::DuplicateName));
        }
        if name.is_empty() {
            return Ok(Err(SniViolation::EmptyName));
        }
        if name.last() == Some(&b'.') {
            return Ok(Err(SniViolation::TrailingDot));
        }
        match std::str::from_utf8(name) {
            Ok(s) => found = Some(s.to_owned()),
            Err(_) => return Ok(Err(SniViolation::InvalidUtf8)),
        }
    }

    Ok(Ok(found))
}
