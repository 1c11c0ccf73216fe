//! QUIC Initial packet protection (RFC 9001 §5, RFC 9369 §3)
//!
//! Initial packets are protected with keys any observer can derive from the
//! destination connection id and a per-version salt.

use crate::error::DecodeError;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes128;
use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes128Gcm, Nonce};
use hkdf::Hkdf;
use sha2::Sha256;
use std::fmt;

/// AES-128-GCM key size
pub const KEY_LEN: usize = 16;

/// AEAD nonce size
pub const IV_LEN: usize = 12;

/// Header protection key size
pub const HP_LEN: usize = 16;

/// Header protection sample size
pub const SAMPLE_LEN: usize = 16;

/// AEAD authentication tag size
pub const TAG_LEN: usize = 16;

const SECRET_LEN: usize = 32;

const SALT_V1: [u8; 20] = [
    0x38, 0x76, 0x2c, 0xf7, 0xf5, 0x59, 0x34, 0xb3, 0x4d, 0x17, 0x9a, 0xe6, 0xa4, 0xc8, 0x0c, 0xad,
    0xcc, 0xbb, 0x7f, 0x0a,
];

const SALT_V2: [u8; 20] = [
    0x0d, 0xed, 0xe3, 0xde, 0xf7, 0x00, 0xa6, 0xdb, 0x81, 0x93, 0x81, 0xbe, 0x6e, 0x26, 0x9d, 0xcb,
    0xf9, 0xbd, 0x2e, 0xd9,
];

const SALT_DRAFT_29: [u8; 20] = [
    0xaf, 0xbf, 0xec, 0x28, 0x99, 0x93, 0xd2, 0x4c, 0x9e, 0x97, 0x86, 0xf1, 0x9c, 0x61, 0x11, 0xe0,
    0x43, 0x90, 0xa8, 0x99,
];

/// QUIC versions whose Initial packets can be opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuicVersion {
    /// RFC 9369
    V2,
    /// RFC 9000
    V1,
    /// draft-ietf-quic-transport-34
    Draft34,
    /// draft-ietf-quic-transport-32
    Draft32,
    /// draft-ietf-quic-transport-29
    Draft29,
}

impl QuicVersion {
    /// Supported versions, most preferred first
    pub const ALL: [QuicVersion; 5] = [
        QuicVersion::V2,
        QuicVersion::V1,
        QuicVersion::Draft34,
        QuicVersion::Draft32,
        QuicVersion::Draft29,
    ];

    /// Look up a wire version number
    pub fn from_u32(value: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.to_u32() == value)
    }

    /// Wire version number
    pub fn to_u32(self) -> u32 {
        match self {
            QuicVersion::V2 => 0x6b33_43cf,
            QuicVersion::V1 => 0x0000_0001,
            QuicVersion::Draft34 => 0xff00_0022,
            QuicVersion::Draft32 => 0xff00_0020,
            QuicVersion::Draft29 => 0xff00_001d,
        }
    }

    /// Initial salt
    pub fn salt(self) -> &'static [u8; 20] {
        match self {
            QuicVersion::V2 => &SALT_V2,
            QuicVersion::V1 | QuicVersion::Draft34 => &SALT_V1,
            QuicVersion::Draft32 | QuicVersion::Draft29 => &SALT_DRAFT_29,
        }
    }

    /// Prefix of the key, iv and hp labels
    pub fn label_prefix(self) -> &'static str {
        match self {
            QuicVersion::V2 => "quicv2",
            _ => "quic",
        }
    }

    /// Value of the long header type bits (`0x30`) for an Initial packet
    pub fn initial_type(self) -> u8 {
        match self {
            QuicVersion::V2 => 0b01,
            _ => 0b00,
        }
    }
}

impl fmt::Display for QuicVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QuicVersion::V2 => "v2",
            QuicVersion::V1 => "v1",
            QuicVersion::Draft34 => "draft-34",
            QuicVersion::Draft32 => "draft-32",
            QuicVersion::Draft29 => "draft-29",
        };
        f.write_str(name)
    }
}

/// Client Initial keys for one connection id
#[derive(Clone, PartialEq, Eq)]
pub struct InitialKeys {
    key: [u8; KEY_LEN],
    iv: [u8; IV_LEN],
    hp: [u8; HP_LEN],
}

impl fmt::Debug for InitialKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitialKeys").finish_non_exhaustive()
    }
}

impl InitialKeys {
    /// Derive the client Initial keys for `version` and `dcid`
    pub fn derive(version: QuicVersion, dcid: &[u8]) -> Result<Self, DecodeError> {
        let initial = Hkdf::<Sha256>::new(Some(version.salt()), dcid);

        let mut client_secret = [0u8; SECRET_LEN];
        expand_label(&initial, "client in", &mut client_secret)?;
        let client = Hkdf::<Sha256>::from_prk(&client_secret)
            .map_err(|_| DecodeError::DecryptFailed)?;

        let prefix = version.label_prefix();
        let mut keys = Self {
            key: [0; KEY_LEN],
            iv: [0; IV_LEN],
            hp: [0; HP_LEN],
        };
        expand_label(&client, &format!("{prefix} key"), &mut keys.key)?;
        expand_label(&client, &format!("{prefix} iv"), &mut keys.iv)?;
        expand_label(&client, &format!("{prefix} hp"), &mut keys.hp)?;

        Ok(keys)
    }

    /// AEAD key
    pub fn key(&self) -> &[u8; KEY_LEN] {
        &self.key
    }

    /// AEAD IV
    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }

    /// Header protection key
    pub fn hp(&self) -> &[u8; HP_LEN] {
        &self.hp
    }

    /// AEAD nonce for a packet number: the IV with the number XORed into
    /// its low 8 bytes
    pub fn nonce(&self, packet_number: u64) -> [u8; IV_LEN] {
        let mut nonce = self.iv;
        for (n, p) in nonce[IV_LEN - 8..]
            .iter_mut()
            .zip(packet_number.to_be_bytes())
        {
            *n ^= p;
        }
        nonce
    }

    /// Header protection mask: AES-ECB of the ciphertext sample
    pub fn header_mask(&self, sample: &[u8; SAMPLE_LEN]) -> [u8; SAMPLE_LEN] {
        let cipher = Aes128::new(aes::Block::from_slice(&self.hp));
        let mut mask = *sample;
        cipher.encrypt_block(aes::Block::from_mut_slice(&mut mask));
        mask
    }

    /// Decrypt and authenticate a payload
    pub fn open(
        &self,
        packet_number: u64,
        aad: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, DecodeError> {
        let cipher =
            Aes128Gcm::new_from_slice(&self.key).map_err(|_| DecodeError::DecryptFailed)?;
        let nonce = self.nonce(packet_number);

        cipher
            .decrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: ciphertext,
                    aad,
                },
            )
            .map_err(|_| DecodeError::DecryptFailed)
    }
}

/// HKDF-Expand-Label (RFC 8446 §7.1) with an empty context
fn expand_label(prk: &Hkdf<Sha256>, label: &str, out: &mut [u8]) -> Result<(), DecodeError> {
    let full_label = format!("tls13 {label}");
    let out_len = u16::try_from(out.len()).map_err(|_| DecodeError::DecryptFailed)?;
    let label_len = u8::try_from(full_label.len()).map_err(|_| DecodeError::DecryptFailed)?;

    let mut info = Vec::with_capacity(4 + full_label.len());
    info.extend_from_slice(&out_len.to_be_bytes());
    info.push(label_len);
    info.extend_from_slice(full_label.as_bytes());
    info.push(0);

    prk.expand(&info, out).map_err(|_| DecodeError::DecryptFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 9001 Appendix A
    const RFC_DCID: [u8; 8] = [0x83, 0x94, 0xc8, 0xf0, 0x3e, 0x51, 0x57, 0x08];

    #[test]
    fn test_version_table() {
        assert_eq!(QuicVersion::from_u32(1), Some(QuicVersion::V1));
        assert_eq!(QuicVersion::from_u32(0x6b3343cf), Some(QuicVersion::V2));
        assert_eq!(QuicVersion::from_u32(0xff00001d), Some(QuicVersion::Draft29));
        assert_eq!(QuicVersion::from_u32(0xfaceb002), None);
        // Google QUIC Q050
        assert_eq!(QuicVersion::from_u32(0x51303530), None);

        assert_eq!(QuicVersion::Draft34.salt(), QuicVersion::V1.salt());
        assert_eq!(QuicVersion::Draft32.salt(), QuicVersion::Draft29.salt());
        assert_ne!(QuicVersion::V2.salt(), QuicVersion::V1.salt());
        assert_eq!(QuicVersion::V2.initial_type(), 1);
        assert_eq!(QuicVersion::V1.initial_type(), 0);
        assert_eq!(QuicVersion::ALL[0], QuicVersion::V2);
    }

    #[test]
    fn test_rfc9001_client_keys() {
        let keys = InitialKeys::derive(QuicVersion::V1, &RFC_DCID).unwrap();
        assert_eq!(hex::encode(keys.key()), "1f369613dd76d5467730efcbe3b1a22d");
        assert_eq!(hex::encode(keys.iv()), "fa044b2f42a3fd3b46fb255c");
        assert_eq!(hex::encode(keys.hp()), "9f50449e04a0e810283a1e9933adedd2");
    }

    #[test]
    fn test_rfc9001_header_mask() {
        let keys = InitialKeys::derive(QuicVersion::V1, &RFC_DCID).unwrap();
        let mut sample = [0u8; SAMPLE_LEN];
        hex::decode_to_slice("d1b1c98dd7689fb8ec11d242b123dc9b", &mut sample).unwrap();

        let mask = keys.header_mask(&sample);
        assert_eq!(hex::encode(&mask[..5]), "437b9aec36");
    }

    #[test]
    fn test_nonce_xor() {
        let keys = InitialKeys::derive(QuicVersion::V1, &RFC_DCID).unwrap();
        assert_eq!(keys.nonce(0), *keys.iv());
        // Packet number 2 from the RFC client Initial
        assert_eq!(hex::encode(keys.nonce(2)), "fa044b2f42a3fd3b46fb255e");
    }

    #[test]
    fn test_versions_derive_distinct_keys() {
        let v1 = InitialKeys::derive(QuicVersion::V1, &RFC_DCID).unwrap();
        let v2 = InitialKeys::derive(QuicVersion::V2, &RFC_DCID).unwrap();
        let d29 = InitialKeys::derive(QuicVersion::Draft29, &RFC_DCID).unwrap();
        let d34 = InitialKeys::derive(QuicVersion::Draft34, &RFC_DCID).unwrap();

        assert_ne!(v1, v2);
        assert_ne!(v1, d29);
        // Same salt and labels
        assert_eq!(v1, d34);
    }

    #[test]
    fn test_open_round_trip() {
        let keys = InitialKeys::derive(QuicVersion::V2, &RFC_DCID).unwrap();
        let aad = b"header bytes";
        let cipher = Aes128Gcm::new_from_slice(keys.key()).unwrap();
        let sealed = cipher
            .encrypt(
                Nonce::from_slice(&keys.nonce(7)),
                Payload {
                    msg: b"crypto frame",
                    aad,
                },
            )
            .unwrap();
        assert_eq!(sealed.len(), 12 + TAG_LEN);

        assert_eq!(keys.open(7, aad, &sealed).unwrap(), b"crypto frame");
        assert_eq!(keys.open(8, aad, &sealed), Err(DecodeError::DecryptFailed));
        assert_eq!(
            keys.open(7, b"other header", &sealed),
            Err(DecodeError::DecryptFailed)
        );
    }

    #[test]
    fn test_keys_debug_hides_material() {
        let keys = InitialKeys::derive(QuicVersion::V1, &RFC_DCID).unwrap();
        assert_eq!(format!("{keys:?}"), "InitialKeys { .. }");
    }
}
