//! B-tree page view.
//!
//! Layout (offsets relative to the page header, which starts at byte 100 on
//! page 1 and byte 0 on every other page):
//!   page_type:     u8   (0x0D = leaf table page)
//!   first_free:    u16
//!   cell_count:    u16  (big-endian, offset 3)
//!   content_start: u16
//!   fragmented:    u8
//!   [cell pointer array: u16 big-endian per cell, offset 8]
//!
//! Cell pointers are offsets from the start of the page, not the header.

use crate::error::Result;
use crate::storage::cursor::ByteCursor;
use crate::storage::header::HEADER_SIZE;

pub const LEAF_TABLE_PAGE: u8 = 0x0D;
/// Leaf pages carry an 8-byte page header; interior pages (never scanned) 12.
pub const LEAF_PAGE_HEADER_SIZE: usize = 8;
pub const CELL_POINTER_SIZE: usize = 2;

const CELL_COUNT_OFFSET: usize = 3;

/// One page read from the store, owned for the duration of its processing.
pub struct Page {
    number: u32,
    data: Vec<u8>,
}

impl Page {
    pub fn new(number: u32, data: Vec<u8>) -> Self {
        Page { number, data }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Offset of the B-tree page header; page 1 starts with the file header.
    pub fn header_offset(&self) -> usize {
        if self.number == 1 {
            HEADER_SIZE
        } else {
            0
        }
    }

    pub fn page_type(&self) -> Option<u8> {
        self.data.get(self.header_offset()).copied()
    }

    pub fn is_leaf_table(&self) -> bool {
        self.page_type() == Some(LEAF_TABLE_PAGE)
    }

    pub fn cell_count(&self) -> Result<u16> {
        ByteCursor::at(&self.data, self.header_offset() + CELL_COUNT_OFFSET)?.read_u16_be()
    }

    /// Raw pointer of cell `index`, as an offset from the page start.
    pub fn cell_pointer(&self, index: u16) -> Result<u16> {
        let ptr_offset = self.header_offset()
            + LEAF_PAGE_HEADER_SIZE
            + usize::from(index) * CELL_POINTER_SIZE;
        ByteCursor::at(&self.data, ptr_offset)?.read_u16_be()
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("number", &self.number)
            .field("size", &self.data.len())
            .field("page_type", &self.page_type())
            .finish()
    }
}
