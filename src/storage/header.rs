//! Store file header (first 100 bytes of the file).
//!
//! Layout (big-endian):
//!   magic:               [u8; 16]  "SQLite format 3\0"
//!   page_size:           u16       power of two 512..=32768, or 1 for 65536
//!   write_version:       u8        offset 18
//!   read_version:        u8        offset 19
//!   reserved_per_page:   u8        offset 20
//!   change_counter:      u32       offset 24
//!   page_count:          u32       offset 28
//!   text_encoding:       u32       offset 56
//!   user_version:        u32       offset 60
//!   engine_version:      u32       offset 96
//!
//! Only the magic, page size and page count drive the scan.

use crate::error::{CredScanError, Result};
use crate::storage::cursor::ByteCursor;

pub const HEADER_SIZE: usize = 100;
pub const MAGIC: &[u8; 16] = b"SQLite format 3\0";

const MIN_PAGE_SIZE: u32 = 512;
const MAX_PAGE_SIZE: u32 = 65536;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreHeader {
    /// Effective page size in bytes (the stored value 1 is already expanded).
    pub page_size: u32,
    pub page_count: u32,
    pub write_version: u8,
    pub read_version: u8,
    pub reserved_per_page: u8,
    pub change_counter: u32,
    pub text_encoding: u32,
    pub user_version: u32,
    pub engine_version: u32,
}

impl StoreHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(CredScanError::Format(format!(
                "store header needs {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        let mut cur = ByteCursor::new(&bytes[..HEADER_SIZE]);
        if cur.read_bytes(MAGIC.len())? != MAGIC {
            return Err(CredScanError::Format("bad store magic".to_string()));
        }

        let stored_page_size = cur.read_u16_be()?;
        let page_size = effective_page_size(stored_page_size)?;
        let write_version = cur.read_u8()?;
        let read_version = cur.read_u8()?;
        let reserved_per_page = cur.read_u8()?;

        cur.seek(24)?;
        let change_counter = cur.read_u32_be()?;
        let page_count = cur.read_u32_be()?;

        cur.seek(56)?;
        let text_encoding = cur.read_u32_be()?;
        let user_version = cur.read_u32_be()?;

        cur.seek(96)?;
        let engine_version = cur.read_u32_be()?;

        Ok(StoreHeader {
            page_size,
            page_count,
            write_version,
            read_version,
            reserved_per_page,
            change_counter,
            text_encoding,
            user_version,
            engine_version,
        })
    }

    /// Byte offset of a 1-based page number.
    pub fn page_offset(&self, page_no: u32) -> u64 {
        u64::from(page_no.saturating_sub(1)) * u64::from(self.page_size)
    }
}

fn effective_page_size(stored: u16) -> Result<u32> {
    let size = if stored == 1 {
        MAX_PAGE_SIZE
    } else {
        u32::from(stored)
    };
    if size < MIN_PAGE_SIZE || !size.is_power_of_two() {
        return Err(CredScanError::Format(format!(
            "invalid page size {}",
            stored
        )));
    }
    Ok(size)
}
