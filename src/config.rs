//! Tunable limits for scanning and decryption.
//!
//! Every limit is a hard cap. Hitting one truncates the scan of the current
//! page or record instead of growing a buffer.

/// Default number of pages visited per store.
pub const DEFAULT_PAGE_LIMIT: u32 = 1000;
/// Default number of cells visited per leaf page.
pub const DEFAULT_CELL_LIMIT: u16 = 100;
/// Default number of serial types read per record header.
pub const DEFAULT_COLUMN_LIMIT: usize = 20;
/// Cells whose pointer lands this close to the page end are never read.
pub const DEFAULT_SAFETY_MARGIN: usize = 100;

pub const DEFAULT_MAX_KEY_LEN: usize = 256;
pub const DEFAULT_MAX_PLAINTEXT_LEN: usize = 1024;
/// Key artifacts above 1 MiB are rejected before parsing.
pub const DEFAULT_MAX_ARTIFACT_LEN: u64 = 1024 * 1024;
pub const DEFAULT_KEY_FIELD: &str = "encrypted_key";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLimits {
    pub page_limit: u32,
    pub cell_limit: u16,
    pub column_limit: usize,
    pub safety_margin: usize,
}

impl Default for ScanLimits {
    fn default() -> Self {
        ScanLimits {
            page_limit: DEFAULT_PAGE_LIMIT,
            cell_limit: DEFAULT_CELL_LIMIT,
            column_limit: DEFAULT_COLUMN_LIMIT,
            safety_margin: DEFAULT_SAFETY_MARGIN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptConfig {
    /// Upper bound on the unwrapped key.
    pub max_key_len: usize,
    /// Upper bound on a single decrypted secret.
    pub max_plaintext_len: usize,
    /// Upper bound on the key-token artifact file.
    pub max_artifact_len: u64,
    /// Field holding the base64 key token inside the artifact.
    pub key_field: String,
}

impl Default for DecryptConfig {
    fn default() -> Self {
        DecryptConfig {
            max_key_len: DEFAULT_MAX_KEY_LEN,
            max_plaintext_len: DEFAULT_MAX_PLAINTEXT_LEN,
            max_artifact_len: DEFAULT_MAX_ARTIFACT_LEN,
            key_field: DEFAULT_KEY_FIELD.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub scan: ScanLimits,
    pub decrypt: DecryptConfig,
}
