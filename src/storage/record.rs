//! Table leaf cell decoding.
//!
//! Cell layout:
//!   [payload_len: varint] [rowid: varint]
//!   [header_len: varint] [serial_type: varint]*   <- header_len bytes in total,
//!                                                     counted from header_len itself
//!   [column bodies in declared order]

use crate::error::{CredScanError, Result};
use crate::storage::cursor::ByteCursor;
use crate::storage::varint::{serial_type_length, SerialType};

/// A decoded record borrowing its column bodies from the page buffer.
#[derive(Debug)]
pub struct Record<'a> {
    payload_len: u64,
    row_id: u64,
    serial_types: Vec<u64>,
    body: &'a [u8],
}

/// One column body located inside a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column<'a> {
    pub serial_type: u64,
    pub bytes: &'a [u8],
}

impl<'a> Column<'a> {
    pub fn kind(&self) -> SerialType {
        SerialType::classify(self.serial_type)
    }

    pub fn as_text(&self) -> Option<&'a [u8]> {
        (self.kind() == SerialType::Text).then_some(self.bytes)
    }

    pub fn as_blob(&self) -> Option<&'a [u8]> {
        (self.kind() == SerialType::Blob).then_some(self.bytes)
    }
}

impl<'a> Record<'a> {
    /// Decode the cell that starts at `offset` within `page`.
    ///
    /// Fails with `Format` on any structural overrun and with `ResourceLimit`
    /// when the header holds more than `column_limit` serial types.
    pub fn decode(page: &'a [u8], offset: usize, column_limit: usize) -> Result<Self> {
        let mut cur = ByteCursor::at(page, offset)?;
        let payload_len = cur.read_varint()?;
        let row_id = cur.read_varint()?;

        let header_start = cur.position();
        let header_len = usize::try_from(cur.read_varint()?)
            .map_err(|_| CredScanError::Format("record header length overflow".to_string()))?;
        let header_end = header_start
            .checked_add(header_len)
            .filter(|&end| end >= cur.position() && end <= page.len())
            .ok_or_else(|| {
                CredScanError::Format(format!(
                    "record header of {} bytes at offset {} does not fit the page",
                    header_len, header_start
                ))
            })?;

        let mut serial_types = Vec::new();
        while cur.position() < header_end {
            if serial_types.len() >= column_limit {
                return Err(CredScanError::ResourceLimit(format!(
                    "record header has more than {} columns",
                    column_limit
                )));
            }
            serial_types.push(cur.read_varint()?);
        }
        if cur.position() != header_end {
            return Err(CredScanError::Format(
                "serial type straddles record header end".to_string(),
            ));
        }

        Ok(Record {
            payload_len,
            row_id,
            serial_types,
            body: &page[header_end..],
        })
    }

    pub fn payload_len(&self) -> u64 {
        self.payload_len
    }

    pub fn row_id(&self) -> u64 {
        self.row_id
    }

    pub fn column_count(&self) -> usize {
        self.serial_types.len()
    }

    pub fn serial_types(&self) -> &[u64] {
        &self.serial_types
    }

    /// Locate column `index`. `Ok(None)` if the record has fewer columns;
    /// `Err` if the column body runs past the page.
    pub fn column(&self, index: usize) -> Result<Option<Column<'a>>> {
        let Some(&serial_type) = self.serial_types.get(index) else {
            return Ok(None);
        };

        let start = self.serial_types[..index]
            .iter()
            .try_fold(0u64, |acc, &code| acc.checked_add(serial_type_length(code)))
            .and_then(|start| usize::try_from(start).ok());
        let len = usize::try_from(serial_type_length(serial_type)).ok();

        let (Some(start), Some(len)) = (start, len) else {
            return Err(CredScanError::Format("column offset overflow".to_string()));
        };
        let bytes = ByteCursor::at(self.body, start)
            .and_then(|mut cur| cur.read_bytes(len))
            .map_err(|_| {
                CredScanError::Format(format!("column {} body runs past the page", index))
            })?;

        Ok(Some(Column { serial_type, bytes }))
    }
}
