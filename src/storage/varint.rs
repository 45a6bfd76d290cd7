//! Variable-length integers and record serial types.
//!
//! Varints are big-endian, 1 to 9 bytes. Each of the first eight bytes carries
//! 7 bits with the high bit set when more bytes follow; a ninth byte, if
//! reached, carries a full 8 bits.
//!
//! | Serial Type  | Content Size | Meaning                   |
//! |--------------|--------------|---------------------------|
//! | 0            | 0            | NULL                      |
//! | 1..=4        | 1..=4        | big-endian integer        |
//! | 5            | 6            | 48-bit integer            |
//! | 6            | 8            | 64-bit integer            |
//! | 7            | 8            | IEEE 754 float            |
//! | 8, 9         | 0            | integer constants 0 and 1 |
//! | 10, 11       | 0            | reserved, never data      |
//! | N >= 12 even | (N-12)/2     | BLOB                      |
//! | N >= 13 odd  | (N-13)/2     | TEXT                      |

/// Longest possible varint encoding.
pub const MAX_VARINT_LEN: usize = 9;

/// Decode a varint starting at `offset`.
///
/// Returns `(value, bytes_consumed)`, or `None` when nothing can be read:
/// `offset` is at or past the end, or a continuation bit runs off the buffer.
pub fn decode_varint(buf: &[u8], offset: usize) -> Option<(u64, usize)> {
    let bytes = buf.get(offset..)?;
    if bytes.is_empty() {
        return None;
    }

    let mut value: u64 = 0;
    for (i, &byte) in bytes.iter().enumerate().take(8) {
        value = (value << 7) | u64::from(byte & 0x7F);
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }

    let last = *bytes.get(8)?;
    Some(((value << 8) | u64::from(last), MAX_VARINT_LEN))
}

/// Number of bytes `encode_varint` writes for `value`.
pub const fn varint_len(value: u64) -> usize {
    if value > 0x00FF_FFFF_FFFF_FFFF {
        return MAX_VARINT_LEN;
    }
    let mut len = 1;
    let mut v = value >> 7;
    while v != 0 {
        len += 1;
        v >>= 7;
    }
    len
}

/// Append the varint encoding of `value` to `buf`.
pub fn encode_varint(buf: &mut Vec<u8>, value: u64) {
    let len = varint_len(value);

    if len == MAX_VARINT_LEN {
        let mut bytes = [0u8; MAX_VARINT_LEN];
        bytes[8] = value as u8;
        let mut v = value >> 8;
        for slot in bytes[..8].iter_mut().rev() {
            *slot = (v as u8 & 0x7F) | 0x80;
            v >>= 7;
        }
        buf.extend_from_slice(&bytes);
        return;
    }

    for i in (0..len).rev() {
        let group = ((value >> (7 * i)) & 0x7F) as u8;
        let continuation = if i == 0 { 0 } else { 0x80 };
        buf.push(group | continuation);
    }
}

/// Body length in bytes for a serial type code.
pub const fn serial_type_length(code: u64) -> u64 {
    match code {
        0 | 8 | 9 => 0,
        1 => 1,
        2 => 2,
        3 => 3,
        4 => 4,
        5 => 6,
        6 | 7 => 8,
        10 | 11 => 0,
        n if n % 2 == 0 => (n - 12) / 2,
        n => (n - 13) / 2,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialType {
    Null,
    Integer,
    Float,
    Zero,
    One,
    Reserved,
    Blob,
    Text,
}

impl SerialType {
    pub const fn classify(code: u64) -> Self {
        match code {
            0 => SerialType::Null,
            1..=6 => SerialType::Integer,
            7 => SerialType::Float,
            8 => SerialType::Zero,
            9 => SerialType::One,
            10 | 11 => SerialType::Reserved,
            n if n % 2 == 0 => SerialType::Blob,
            _ => SerialType::Text,
        }
    }
}

/// Serial type code for a text body of `len` bytes.
pub const fn text_serial_type(len: u64) -> u64 {
    len * 2 + 13
}

/// Serial type code for a blob body of `len` bytes.
pub const fn blob_serial_type(len: u64) -> u64 {
    len * 2 + 12
}
