//! Bounded reads over untrusted packet bytes
//!
//! Every parser in this crate walks its input through a [`ByteCursor`]. Reads
//! never panic: a read past the end returns [`DecodeError::Truncated`] and
//! leaves the cursor where it was.

use crate::error::DecodeError;

/// Largest value a QUIC variable-length integer can carry (2^62 - 1)
pub const VARINT_MAX: u64 = (1 << 62) - 1;

/// Sequential big-endian reader over a borrowed buffer
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

type Result<T> = std::result::Result<T, DecodeError>;

impl<'a> ByteCursor<'a> {
    /// Create a cursor positioned at the start of `buf`
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Whether every byte has been consumed
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The unread tail of the buffer
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    /// Read exactly `len` bytes
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(DecodeError::truncated(len, self.remaining()));
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Skip `len` bytes
    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.read_bytes(len).map(|_| ())
    }

    /// Read a fixed-size array
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Read one byte
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Read a big-endian u16
    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_array().map(u16::from_be_bytes)
    }

    /// Read a big-endian 24-bit integer
    pub fn read_u24(&mut self) -> Result<u32> {
        let [a, b, c] = self.read_array()?;
        Ok(u32::from_be_bytes([0, a, b, c]))
    }

    /// Read a big-endian u32
    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_array().map(u32::from_be_bytes)
    }

    /// Read a QUIC variable-length integer (RFC 9000 §16)
    ///
    /// The two most significant bits of the first byte select a 1, 2, 4 or
    /// 8 byte encoding.
    pub fn read_varint(&mut self) -> Result<u64> {
        let first = *self
            .buf
            .get(self.pos)
            .ok_or_else(|| DecodeError::truncated(1, 0))?;
        let len = 1usize << (first >> 6);
        let bytes = self.read_bytes(len)?;
        let value = bytes[1..]
            .iter()
            .fold(u64::from(first & 0x3f), |acc, &b| (acc << 8) | u64::from(b));
        Ok(value)
    }

    /// Read a slice prefixed by a one-byte length
    pub fn read_u8_prefixed(&mut self) -> Result<&'a [u8]> {
        let start = self.pos;
        let len = self.read_u8()?;
        self.read_bytes(usize::from(len)).map_err(|e| {
            self.pos = start;
            e
        })
    }

    /// Read a slice prefixed by a two-byte big-endian length
    pub fn read_u16_prefixed(&mut self) -> Result<&'a [u8]> {
        let start = self.pos;
        let len = self.read_u16()?;
        self.read_bytes(usize::from(len)).map_err(|e| {
            self.pos = start;
            e
        })
    }
}
