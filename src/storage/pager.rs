use std::fs::File;
use std::io::{Cursor, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::{CredScanError, Result};
use crate::storage::header::{StoreHeader, HEADER_SIZE};
use crate::storage::page::Page;

/// Read-only page access over any seekable byte source.
///
/// Pages are not cached: every call allocates a fresh buffer that the
/// caller owns and drops when done.
pub struct Pager<R> {
    source: R,
    header: StoreHeader,
}

impl Pager<File> {
    /// Open a store file on disk.
    pub fn open(path: &Path) -> Result<Self> {
        Pager::new(File::open(path)?)
    }
}

impl<'a> Pager<Cursor<&'a [u8]>> {
    /// Page access over an in-memory store image.
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Self> {
        Pager::new(Cursor::new(bytes))
    }
}

impl<R: Read + Seek> Pager<R> {
    /// Read and validate the store header.
    pub fn new(mut source: R) -> Result<Self> {
        source.seek(SeekFrom::Start(0))?;
        let mut raw = [0u8; HEADER_SIZE];
        source.read_exact(&mut raw).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                CredScanError::Format("store is shorter than its header".to_string())
            } else {
                CredScanError::Io(e)
            }
        })?;
        let header = StoreHeader::parse(&raw)?;
        Ok(Pager { source, header })
    }

    pub fn header(&self) -> &StoreHeader {
        &self.header
    }

    /// Read exactly one page. A short read surfaces as an `UnexpectedEof`
    /// I/O error (see `CredScanError::is_short_read`).
    pub fn read_page(&mut self, page_no: u32) -> Result<Page> {
        let offset = self.header.page_offset(page_no);
        self.source.seek(SeekFrom::Start(offset))?;

        let mut data = vec![0u8; self.header.page_size as usize];
        self.source.read_exact(&mut data)?;
        Ok(Page::new(page_no, data))
    }
}
