//! Sequential access to fixed-layout account bytes.
//!
//! Reads check that enough bytes remain before consuming anything, so a
//! failed read leaves the cursor where it was.

use crate::error::DecodeError;
use crate::pubkey::{Pubkey, PUBKEY_LEN};

/// Little-endian reader over a borrowed byte buffer.
#[derive(Clone, Debug)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Unread bytes.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    pub fn read_bytes(&mut self, len: usize, field: &'static str) -> Result<&'a [u8], DecodeError> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(DecodeError::TruncatedRecord {
                field,
                needed: len,
                remaining,
            });
        }
        let out = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    pub fn skip(&mut self, len: usize, field: &'static str) -> Result<(), DecodeError> {
        self.read_bytes(len, field).map(|_| ())
    }

    pub fn read_array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N, field)?);
        Ok(out)
    }

    pub fn read_u8(&mut self, field: &'static str) -> Result<u8, DecodeError> {
        Ok(self.read_array::<1>(field)?[0])
    }

    /// Any non-zero byte reads as `true`.
    pub fn read_bool(&mut self, field: &'static str) -> Result<bool, DecodeError> {
        Ok(self.read_u8(field)? != 0)
    }

    pub fn read_u32(&mut self, field: &'static str) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.read_array(field)?))
    }

    pub fn read_u64(&mut self, field: &'static str) -> Result<u64, DecodeError> {
        Ok(u64::from_le_bytes(self.read_array(field)?))
    }

    pub fn read_i64(&mut self, field: &'static str) -> Result<i64, DecodeError> {
        Ok(i64::from_le_bytes(self.read_array(field)?))
    }

    pub fn read_pubkey(&mut self, field: &'static str) -> Result<Pubkey, DecodeError> {
        Ok(Pubkey::new_from_array(self.read_array::<PUBKEY_LEN>(field)?))
    }

    /// Reads a u32 length followed by that many UTF-8 bytes. Both the prefix
    /// and the payload are bounds checked; on failure nothing is consumed.
    pub fn read_string(&mut self, field: &'static str) -> Result<String, DecodeError> {
        let start = self.pos;
        let len = self.read_u32(field)? as usize;
        let bytes = match self.read_bytes(len, field) {
            Ok(bytes) => bytes,
            Err(err) => {
                self.pos = start;
                return Err(err);
            }
        };
        match std::str::from_utf8(bytes) {
            Ok(s) => Ok(s.to_owned()),
            Err(_) => {
                self.pos = start;
                Err(DecodeError::InvalidStringEncoding { field })
            }
        }
    }
}

/// Writer producing the layout [`ByteCursor`] reads.
#[derive(Clone, Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buf: Vec::with_capacity(cap),
        }
    }

    pub fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn bool(&mut self, v: bool) -> &mut Self {
        self.u8(v as u8)
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.bytes(&v.to_le_bytes())
    }

    pub fn u64(&mut self, v: u64) -> &mut Self {
        self.bytes(&v.to_le_bytes())
    }

    pub fn i64(&mut self, v: i64) -> &mut Self {
        self.bytes(&v.to_le_bytes())
    }

    pub fn pubkey(&mut self, key: &Pubkey) -> &mut Self {
        self.bytes(key.as_bytes())
    }

    /// # Panics
    ///
    /// Panics if `s` is longer than `u32::MAX` bytes.
    pub fn string(&mut self, s: &str) -> &mut Self {
        let len = u32::try_from(s.len()).expect("string length fits in u32");
        self.u32(len).bytes(s.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_fields_in_order() {
        let mut w = ByteWriter::new();
        w.u8(9).bool(true).u32(7).u64(u64::MAX).i64(-5).string("héllo");
        let bytes = w.into_inner();

        let mut c = ByteCursor::new(&bytes);
        assert_eq!(c.read_u8("a").unwrap(), 9);
        assert!(c.read_bool("b").unwrap());
        assert_eq!(c.read_u32("c").unwrap(), 7);
        assert_eq!(c.read_u64("d").unwrap(), u64::MAX);
        assert_eq!(c.read_i64("e").unwrap(), -5);
        assert_eq!(c.read_string("f").unwrap(), "héllo");
        assert_eq!(c.remaining(), 0);
    }

    #[test]
    fn failed_read_consumes_nothing() {
        let bytes = [1u8, 2, 3];
        let mut c = ByteCursor::new(&bytes);
        let err = c.read_u64("index").unwrap_err();
        assert_eq!(
            err,
            DecodeError::TruncatedRecord {
                field: "index",
                needed: 8,
                remaining: 3
            }
        );
        assert_eq!(c.position(), 0);
    }

    #[test]
    fn string_payload_is_checked_separately_from_prefix() {
        // Prefix claims 10 bytes, only 2 follow.
        let mut bytes = 10u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"ab");
        let mut c = ByteCursor::new(&bytes);
        assert_eq!(
            c.read_string("uri"),
            Err(DecodeError::TruncatedRecord {
                field: "uri",
                needed: 10,
                remaining: 2
            })
        );
        assert_eq!(c.position(), 0);

        // Prefix itself cut short.
        let mut c = ByteCursor::new(&bytes[..3]);
        assert!(matches!(
            c.read_string("uri"),
            Err(DecodeError::TruncatedRecord { needed: 4, .. })
        ));
    }

    #[test]
    fn rejects_non_utf8_strings() {
        let mut bytes = 2u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0xc3, 0x28]);
        let mut c = ByteCursor::new(&bytes);
        assert_eq!(
            c.read_string("region"),
            Err(DecodeError::InvalidStringEncoding { field: "region" })
        );
    }
}
