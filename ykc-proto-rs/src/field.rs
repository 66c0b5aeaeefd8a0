//! Bounds-checked field cursor and writer for message payloads

use bytes::BufMut;

use crate::error::{ProtoError, Result};
use crate::primitives::{
    ascii_field, ascii_to_field, bcd_to_string, decode_bcd_timestamp, encode_bcd_timestamp,
    string_to_bcd, BCD_TIME_LEN,
};

/// Largest value a 5-byte meter reading can carry
pub const U40_MAX: u64 = (1 << 40) - 1;

/// Sequential reader over a payload; every read fails with
/// [`ProtoError::MalformedFrame`] instead of running past the end.
#[derive(Debug)]
pub struct FieldReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(ProtoError::malformed(format!(
                "need {} bytes at offset {}, only {} left",
                n,
                self.pos,
                self.remaining()
            )));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.bytes(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16> {
        let b = self.bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn u32(&mut self) -> Result<u32> {
        let b = self.bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// 5-byte little-endian meter reading
    pub fn u40(&mut self) -> Result<u64> {
        let b = self.bytes(5)?;
        let mut buf = [0u8; 8];
        buf[..5].copy_from_slice(b);
        Ok(u64::from_le_bytes(buf))
    }

    /// Packed BCD rendered as hex digits
    pub fn bcd(&mut self, n: usize) -> Result<String> {
        Ok(bcd_to_string(self.bytes(n)?))
    }

    /// NUL-padded text
    pub fn ascii(&mut self, n: usize) -> Result<String> {
        Ok(ascii_field(self.bytes(n)?))
    }

    /// 7-byte packed time as epoch milliseconds
    pub fn time(&mut self) -> Result<i64> {
        decode_bcd_timestamp(self.bytes(BCD_TIME_LEN)?)
    }
}

/// Payload builder mirroring [`FieldReader`]
#[derive(Debug, Default)]
pub struct FieldWriter {
    buf: Vec<u8>,
}

impl FieldWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.put_u8(v);
        self
    }

    pub fn u16(&mut self, v: u16) -> &mut Self {
        self.buf.put_u16_le(v);
        self
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.buf.put_u32_le(v);
        self
    }

    pub fn u40(&mut self, v: u64) -> Result<&mut Self> {
        if v > U40_MAX {
            return Err(ProtoError::encoding(format!("{} does not fit 5 bytes", v)));
        }
        self.buf.put_uint_le(v, 5);
        Ok(self)
    }

    pub fn bytes(&mut self, v: &[u8]) -> &mut Self {
        self.buf.put_slice(v);
        self
    }

    pub fn bcd(&mut self, v: &str, width: usize) -> Result<&mut Self> {
        let packed = string_to_bcd(v, width)?;
        self.buf.put_slice(&packed);
        Ok(self)
    }

    pub fn ascii(&mut self, v: &str, width: usize) -> Result<&mut Self> {
        let field = ascii_to_field(v, width)?;
        self.buf.put_slice(&field);
        Ok(self)
    }

    pub fn time(&mut self, epoch_millis: i64) -> Result<&mut Self> {
        let packed = encode_bcd_timestamp(epoch_millis)?;
        self.buf.put_slice(&packed);
        Ok(self)
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}
