//! Synthetic store images and mock capabilities shared by integration tests.
#![allow(dead_code)]

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{engine::general_purpose::STANDARD, Engine};
use zeroize::Zeroizing;

use credscan::storage::header::{HEADER_SIZE, MAGIC};
use credscan::storage::page::LEAF_TABLE_PAGE;
use credscan::storage::varint::{blob_serial_type, encode_varint, text_serial_type, varint_len};
use credscan::{CredScanError, Result, UnwrapCapability};

pub const PAGE_SIZE: usize = 4096;
/// Free space left at the end of every generated leaf page, so cells stay
/// clear of the scanner's safety margin.
pub const TAIL_PAD: usize = 128;

#[derive(Debug, Clone)]
pub enum Col {
    Null,
    Int(u8),
    Text(Vec<u8>),
    Blob(Vec<u8>),
}

pub fn text(s: &str) -> Col {
    Col::Text(s.as_bytes().to_vec())
}

pub fn blob(b: &[u8]) -> Col {
    Col::Blob(b.to_vec())
}

/// Encode a full table leaf cell: payload length, rowid, record.
pub fn encode_cell(row_id: u64, cols: &[Col]) -> Vec<u8> {
    let mut types = Vec::new();
    let mut body = Vec::new();
    for col in cols {
        match col {
            Col::Null => encode_varint(&mut types, 0),
            Col::Int(v) => {
                encode_varint(&mut types, 1);
                body.push(*v);
            }
            Col::Text(t) => {
                encode_varint(&mut types, text_serial_type(t.len() as u64));
                body.extend_from_slice(t);
            }
            Col::Blob(b) => {
                encode_varint(&mut types, blob_serial_type(b.len() as u64));
                body.extend_from_slice(b);
            }
        }
    }

    // The header length counts its own varint.
    let mut header_len = types.len() + 1;
    while varint_len(header_len as u64) + types.len() != header_len {
        header_len = varint_len(header_len as u64) + types.len();
    }

    let mut record = Vec::new();
    encode_varint(&mut record, header_len as u64);
    record.extend_from_slice(&types);
    record.extend_from_slice(&body);

    let mut cell = Vec::new();
    encode_varint(&mut cell, record.len() as u64);
    encode_varint(&mut cell, row_id);
    cell.extend_from_slice(&record);
    cell
}

/// A login row in the fixed layout: site, _, _, account, _, secret.
pub fn login_cell(row_id: u64, site: &str, account: Option<&str>, secret: &[u8]) -> Vec<u8> {
    encode_cell(
        row_id,
        &[
            text(site),
            text("https://action.example"),
            text("username"),
            account.map(text).unwrap_or(Col::Null),
            text("password"),
            blob(secret),
            text("submit"),
        ],
    )
}

fn header_offset(page_no: u32) -> usize {
    if page_no == 1 {
        HEADER_SIZE
    } else {
        0
    }
}

/// Lay out a leaf page with cells at explicit offsets.
pub fn leaf_page_at(page_no: u32, page_size: usize, cells: &[(u16, Vec<u8>)]) -> Vec<u8> {
    let mut data = vec![0u8; page_size];
    let base = header_offset(page_no);
    data[base] = LEAF_TABLE_PAGE;
    data[base + 3..base + 5].copy_from_slice(&(cells.len() as u16).to_be_bytes());
    for (i, (offset, cell)) in cells.iter().enumerate() {
        let ptr = base + 8 + i * 2;
        data[ptr..ptr + 2].copy_from_slice(&offset.to_be_bytes());
        let start = *offset as usize;
        let end = (start + cell.len()).min(page_size);
        data[start..end].copy_from_slice(&cell[..end - start]);
    }
    data
}

/// Lay out a leaf page, packing cells downward from `page_size - TAIL_PAD`.
pub fn leaf_page(page_no: u32, page_size: usize, cells: &[Vec<u8>]) -> Vec<u8> {
    let mut end = page_size - TAIL_PAD;
    let mut placed = Vec::new();
    for cell in cells {
        end -= cell.len();
        placed.push((end as u16, cell.clone()));
    }
    leaf_page_at(page_no, page_size, &placed)
}

/// An interior table page (type 0x05) that the scanner must ignore.
pub fn interior_page(page_no: u32, page_size: usize) -> Vec<u8> {
    let mut data = vec![0u8; page_size];
    data[header_offset(page_no)] = 0x05;
    data
}

pub struct StoreBuilder {
    page_size: usize,
    declared_pages: Option<u32>,
    pages: Vec<Vec<u8>>,
}

impl StoreBuilder {
    /// New store whose page 1 is an empty leaf page.
    pub fn new(page_size: usize) -> Self {
        StoreBuilder {
            page_size,
            declared_pages: None,
            pages: vec![leaf_page(1, page_size, &[])],
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Replace page 1 (its first 100 bytes are overwritten by the header).
    pub fn first_page(mut self, data: Vec<u8>) -> Self {
        self.pages[0] = data;
        self
    }

    pub fn page(mut self, data: Vec<u8>) -> Self {
        assert_eq!(data.len(), self.page_size);
        self.pages.push(data);
        self
    }

    pub fn next_page_no(&self) -> u32 {
        self.pages.len() as u32 + 1
    }

    pub fn leaf(self, cells: &[Vec<u8>]) -> Self {
        let page = leaf_page(self.next_page_no(), self.page_size, cells);
        self.page(page)
    }

    pub fn declared_pages(mut self, count: u32) -> Self {
        self.declared_pages = Some(count);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut bytes: Vec<u8> = self.pages.concat();
        let stored_size: u16 = if self.page_size == 65536 {
            1
        } else {
            self.page_size as u16
        };
        let count = self.declared_pages.unwrap_or(self.pages.len() as u32);

        bytes[..HEADER_SIZE].fill(0);
        bytes[..16].copy_from_slice(MAGIC);
        bytes[16..18].copy_from_slice(&stored_size.to_be_bytes());
        bytes[18] = 1;
        bytes[19] = 1;
        bytes[21] = 64;
        bytes[22] = 32;
        bytes[23] = 32;
        bytes[28..32].copy_from_slice(&count.to_be_bytes());
        bytes[56..60].copy_from_slice(&1u32.to_be_bytes());
        bytes
    }
}

pub const TEST_KEY: [u8; 32] = [0x5Au8; 32];

/// Seal `plaintext` in the "v10" || nonce || ciphertext || tag layout.
pub fn seal(key: &[u8; 32], nonce: [u8; 12], plaintext: &[u8]) -> Vec<u8> {
    let cipher = Aes256Gcm::new_from_slice(key).unwrap();
    let sealed = cipher.encrypt(Nonce::from_slice(&nonce), plaintext).unwrap();
    let mut out = b"v10".to_vec();
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);
    out
}

/// Unprotects only the blob it was created for, like an account-bound
/// platform capability refusing blobs from other identities.
pub struct BoundCapability {
    pub blob: Vec<u8>,
    pub key: Vec<u8>,
}

impl BoundCapability {
    pub fn new(blob: &[u8], key: &[u8]) -> Self {
        BoundCapability {
            blob: blob.to_vec(),
            key: key.to_vec(),
        }
    }
}

impl UnwrapCapability for BoundCapability {
    fn unprotect(&self, blob: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        if blob == self.blob.as_slice() {
            Ok(Zeroizing::new(self.key.clone()))
        } else {
            Err(CredScanError::Unwrap(
                "blob was protected by another account".to_string(),
            ))
        }
    }
}

pub const ACCOUNT_BLOB: &[u8] = b"protected-by-this-account";

/// Key token as stored in the artifact: marker followed by the protected blob.
pub fn key_token(blob: &[u8]) -> Vec<u8> {
    [b"DPAPI".as_slice(), blob].concat()
}

/// A key artifact in the nested JSON layout.
pub fn key_artifact(token: &[u8]) -> String {
    format!(
        r#"{{"browser":{{"enabled":true}},"os_crypt":{{"audit_enabled":true,"encrypted_key":"{}"}}}}"#,
        STANDARD.encode(token)
    )
}

/// Deterministic xorshift64 PRNG for reproducible sweeps.
pub struct Rng(u64);

impl Rng {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    pub fn fill(&mut self, buf: &mut [u8]) {
        for b in buf.iter_mut() {
            *b = self.next() as u8;
        }
    }
}
