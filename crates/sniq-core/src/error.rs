//! Error types for sniq-core
//!
//! Two families live here. [`DecodeError`] describes why a single packet could
//! not be decoded down to a server name; it never leaves the classifier as a
//! failure because undecodable traffic is always accepted. [`Error`] covers
//! startup problems (configuration, domain lists) that stop the process.

use thiserror::Error;

/// Why a packet could not be decoded to a usable ClientHello
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A fixed-size header does not fit in the buffer
    #[error("{layer} header too short: expected at least {expected} bytes, got {actual}")]
    TooShort {
        /// Protocol layer that was being parsed
        layer: &'static str,
        /// Minimum bytes required
        expected: usize,
        /// Bytes available
        actual: usize,
    },

    /// A length field points past the end of the buffer
    #[error("Truncated field: need {expected} bytes, {actual} available")]
    Truncated {
        /// Bytes the field declares or requires
        expected: usize,
        /// Bytes actually remaining
        actual: usize,
    },

    /// IP version nibble is neither 4 nor 6
    #[error("Unsupported IP version: {0}")]
    UnsupportedIpVersion(u8),

    /// Transport protocol other than TCP or UDP
    #[error("Unsupported transport protocol: {0}")]
    UnsupportedProtocol(u8),

    /// QUIC packet with a short header
    #[error("Not a QUIC long header packet")]
    NotLongHeader,

    /// Long header with the fixed bit cleared
    #[error("Not a QUIC packet")]
    NotQuic,

    /// Version negotiation or a long header type other than Initial
    #[error("Not a QUIC Initial packet")]
    NotInitial,

    /// QUIC version without a known Initial salt
    #[error("Unsupported QUIC version: {0:#010x}")]
    UnsupportedVersion(u32),

    /// AEAD authentication of the Initial payload failed
    #[error("QUIC Initial payload failed authentication")]
    DecryptFailed,

    /// Handshake message is not a ClientHello
    #[error("Handshake message type {0:#04x} is not a ClientHello")]
    NotAClientHello(u8),
}

impl DecodeError {
    /// Create a too-short error for the given layer
    pub fn too_short(layer: &'static str, expected: usize, actual: usize) -> Self {
        Self::TooShort {
            layer,
            expected,
            actual,
        }
    }

    /// Create a truncation error
    pub fn truncated(expected: usize, actual: usize) -> Self {
        Self::Truncated { expected, actual }
    }

    /// Short machine-friendly name used as a log field
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TooShort { .. } => "too_short",
            Self::Truncated { .. } => "truncated",
            Self::UnsupportedIpVersion(_) => "unsupported_ip_version",
            Self::UnsupportedProtocol(_) => "unsupported_protocol",
            Self::NotLongHeader => "not_long_header",
            Self::NotQuic => "not_quic",
            Self::NotInitial => "not_initial",
            Self::UnsupportedVersion(_) => "unsupported_version",
            Self::DecryptFailed => "decrypt_failed",
            Self::NotAClientHello(_) => "not_a_client_hello",
        }
    }
}

/// Main error type for sniq-core setup operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// Path to the missing config file
        path: String,
    },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    ConfigValue {
        /// Configuration key
        key: String,
        /// Error message
        message: String,
    },

    /// Domain list file error
    #[error("Domain list error for '{path}': {message}")]
    DomainList {
        /// Path to the domain list
        path: String,
        /// Error message
        message: String,
    },

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Hex decoding error
    #[error("Hex decoding error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a config value error
    pub fn config_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValue {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a domain list error
    pub fn domain_list(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DomainList {
            path: path.into(),
            message: message.into(),
        }
    }
}
