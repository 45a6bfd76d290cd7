use crate::error::{CredScanError, Result};
use crate::storage::varint::decode_varint;

/// Bounds-checked reader over a borrowed byte slice.
///
/// Every read validates the remaining length first and fails with
/// `CredScanError::Format` instead of reading past the end.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        ByteCursor { buf, pos: 0 }
    }

    /// Cursor positioned at `pos`. Fails if `pos` lies beyond the buffer.
    pub fn at(buf: &'a [u8], pos: usize) -> Result<Self> {
        let mut cursor = ByteCursor::new(buf);
        cursor.seek(pos)?;
        Ok(cursor)
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.buf.len() {
            return Err(overread(pos, 0, self.buf.len()));
        }
        self.pos = pos;
        Ok(())
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| overread(self.pos, len, self.buf.len()))?;
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.read_bytes(len).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16_be(&mut self) -> Result<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32_be(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_varint(&mut self) -> Result<u64> {
        let (value, len) = decode_varint(self.buf, self.pos).ok_or_else(|| {
            CredScanError::Format(format!("truncated varint at offset {}", self.pos))
        })?;
        self.pos += len;
        Ok(value)
    }
}

fn overread(pos: usize, len: usize, buf_len: usize) -> CredScanError {
    CredScanError::Format(format!(
        "read of {} bytes at offset {} exceeds buffer of {} bytes",
        len, pos, buf_len
    ))
}
