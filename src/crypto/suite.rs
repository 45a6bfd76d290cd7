use crate::error::{DecryptFailure, Result};

/// Version marker that opens every secret this crate can decrypt.
pub const SECRET_VERSION_MARKER: &[u8; 3] = b"v10";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherSuite {
    Aes128Gcm,
    Aes192Gcm,
    Aes256Gcm,
}

impl CipherSuite {
    /// Pick the AES-GCM variant matching an unwrapped key.
    pub fn for_key_len(len: usize) -> Result<Self> {
        match len {
            16 => Ok(CipherSuite::Aes128Gcm),
            24 => Ok(CipherSuite::Aes192Gcm),
            32 => Ok(CipherSuite::Aes256Gcm),
            other => Err(DecryptFailure::UnsupportedKeyLength(other).into()),
        }
    }

    pub const fn key_len(self) -> usize {
        match self {
            CipherSuite::Aes128Gcm => 16,
            CipherSuite::Aes192Gcm => 24,
            CipherSuite::Aes256Gcm => 32,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            CipherSuite::Aes128Gcm => "aes128-gcm",
            CipherSuite::Aes192Gcm => "aes192-gcm",
            CipherSuite::Aes256Gcm => "aes256-gcm",
        }
    }
}
