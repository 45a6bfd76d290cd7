use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use tracing::debug;

use crate::config::ScanLimits;
use crate::error::{CredScanError, Result};
use crate::storage::header::StoreHeader;
use crate::storage::page::Page;
use crate::storage::pager::Pager;
use crate::storage::record::Record;
use crate::types::{credential_columns as cols, CellLocation, CredentialTuple};

/// Counters describing what a scan visited and what it dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub pages_visited: u64,
    pub leaf_pages: u64,
    /// Pages dropped because of an I/O error other than end of file.
    pub pages_skipped: u64,
    pub cells_examined: u64,
    /// Cells whose pointer fell inside the page-end safety margin.
    pub cells_out_of_bounds: u64,
    pub cells_malformed: u64,
    pub records_over_column_limit: u64,
    pub tuples_emitted: u64,
    pub page_limit_hit: bool,
    pub cell_limit_hit: bool,
    /// The store ended before its declared page count.
    pub stopped_at_eof: bool,
}

impl ScanStats {
    /// True if any limit cut the scan short.
    pub fn truncated(&self) -> bool {
        self.page_limit_hit || self.cell_limit_hit || self.records_over_column_limit > 0
    }
}

struct PageCells {
    page: Page,
    next_cell: u16,
    cell_count: u16,
}

/// Lazy scan of a store for credential tuples.
///
/// Pages are read one at a time and dropped as soon as their cells are
/// exhausted. The scan cannot be rewound; open a new `Scanner` to start over.
pub struct Scanner<R> {
    pager: Pager<R>,
    limits: ScanLimits,
    next_page: u32,
    last_page: u32,
    current: Option<PageCells>,
    stats: ScanStats,
    finished: bool,
}

/// Scan an in-memory store image with default limits.
pub fn scan(bytes: &[u8]) -> Result<Scanner<Cursor<&[u8]>>> {
    Ok(Scanner::new(Pager::from_bytes(bytes)?, ScanLimits::default()))
}

impl Scanner<File> {
    pub fn open_path(path: &Path, limits: ScanLimits) -> Result<Self> {
        Ok(Scanner::new(Pager::open(path)?, limits))
    }
}

impl<R: Read + Seek> Scanner<R> {
    /// Validate the header of `source` and prepare a scan.
    pub fn open(source: R, limits: ScanLimits) -> Result<Self> {
        Ok(Scanner::new(Pager::new(source)?, limits))
    }

    pub fn new(pager: Pager<R>, limits: ScanLimits) -> Self {
        let declared = pager.header().page_count;
        let stats = ScanStats {
            page_limit_hit: declared > limits.page_limit,
            ..ScanStats::default()
        };
        Scanner {
            last_page: declared.min(limits.page_limit),
            pager,
            limits,
            next_page: 1,
            current: None,
            stats,
            finished: false,
        }
    }

    pub fn header(&self) -> &StoreHeader {
        self.pager.header()
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// Advance to the next leaf table page, or `None` when the scan is over.
    fn load_next_leaf(&mut self) -> Option<PageCells> {
        while !self.finished && self.next_page <= self.last_page {
            let page_no = self.next_page;
            match page_no.checked_add(1) {
                Some(next) => self.next_page = next,
                None => self.finished = true,
            }

            let page = match self.pager.read_page(page_no) {
                Ok(page) => page,
                Err(e) if e.is_short_read() => {
                    debug!(page = page_no, "store ends before declared page count");
                    self.stats.stopped_at_eof = true;
                    self.finished = true;
                    break;
                }
                Err(e) => {
                    debug!(page = page_no, error = %e, "skipping unreadable page");
                    self.stats.pages_skipped += 1;
                    continue;
                }
            };
            self.stats.pages_visited += 1;

            if !page.is_leaf_table() {
                continue;
            }
            self.stats.leaf_pages += 1;

            let count = match page.cell_count() {
                Ok(count) => count,
                Err(e) => {
                    debug!(page = page_no, error = %e, "unreadable cell count");
                    continue;
                }
            };
            if count > self.limits.cell_limit {
                debug!(page = page_no, count, limit = self.limits.cell_limit, "cell limit hit");
                self.stats.cell_limit_hit = true;
            }

            return Some(PageCells {
                page,
                next_cell: 0,
                cell_count: count.min(self.limits.cell_limit),
            });
        }

        self.finished = true;
        None
    }
}

impl<R: Read + Seek> Iterator for Scanner<R> {
    type Item = CredentialTuple;

    fn next(&mut self) -> Option<CredentialTuple> {
        loop {
            if self.current.is_none() {
                self.current = Some(self.load_next_leaf()?);
            }
            let cells = self.current.as_mut()?;
            if cells.next_cell >= cells.cell_count {
                // Release the page before reading the next one.
                self.current = None;
                continue;
            }

            let index = cells.next_cell;
            cells.next_cell += 1;
            self.stats.cells_examined += 1;

            let location = CellLocation {
                page: cells.page.number(),
                cell: index,
            };
            match examine_cell(&cells.page, index, &self.limits) {
                Ok(CellOutcome::Credential(tuple)) => {
                    self.stats.tuples_emitted += 1;
                    return Some(tuple);
                }
                Ok(CellOutcome::NotCredential) => {}
                Ok(CellOutcome::OutOfBounds) => {
                    self.stats.cells_out_of_bounds += 1;
                }
                Err(CredScanError::ResourceLimit(msg)) => {
                    debug!(%location, %msg, "record skipped");
                    self.stats.records_over_column_limit += 1;
                }
                Err(e) => {
                    debug!(%location, error = %e, "malformed cell");
                    self.stats.cells_malformed += 1;
                }
            }
        }
    }
}

enum CellOutcome {
    Credential(CredentialTuple),
    NotCredential,
    /// The pointer fell inside the page-end safety margin; nothing was read.
    OutOfBounds,
}

fn examine_cell(page: &Page, index: u16, limits: &ScanLimits) -> Result<CellOutcome> {
    let offset = usize::from(page.cell_pointer(index)?);
    if offset >= page.size().saturating_sub(limits.safety_margin) {
        return Ok(CellOutcome::OutOfBounds);
    }

    let record = Record::decode(page.data(), offset, limits.column_limit)?;
    Ok(match credential_from_record(&record, page.number(), index)? {
        Some(tuple) => CellOutcome::Credential(tuple),
        None => CellOutcome::NotCredential,
    })
}

/// Apply the fixed column layout and the plausibility filters.
fn credential_from_record(
    record: &Record<'_>,
    page: u32,
    cell: u16,
) -> Result<Option<CredentialTuple>> {
    let Some(site) = record.column(cols::SITE)?.and_then(|c| c.as_text()) else {
        return Ok(None);
    };
    if !site.starts_with(cols::SITE_PREFIX) {
        return Ok(None);
    }

    let Some(secret) = record.column(cols::SECRET)?.and_then(|c| c.as_blob()) else {
        return Ok(None);
    };
    if secret.len() <= cols::MIN_SECRET_EXCLUSIVE {
        return Ok(None);
    }

    let account = record
        .column(cols::ACCOUNT)?
        .and_then(|c| c.as_text())
        .map(<[u8]>::to_vec);

    Ok(Some(CredentialTuple {
        site: site.to_vec(),
        account,
        secret: secret.to_vec(),
        location: CellLocation { page, cell },
    }))
}
