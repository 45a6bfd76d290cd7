use thiserror::Error;

/// Why a single secret could not be opened.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptFailure {
    #[error("missing or unknown version marker")]
    VersionMarker,

    #[error("secret too short to hold nonce, ciphertext and tag")]
    Truncated,

    #[error("authentication tag mismatch")]
    Authentication,

    #[error("plaintext of {len} bytes exceeds limit of {max}")]
    PlaintextTooLarge { len: usize, max: usize },

    #[error("unsupported key length {0}")]
    UnsupportedKeyLength(usize),
}

#[derive(Error, Debug)]
pub enum CredScanError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Key unwrap error: {0}")]
    Unwrap(String),

    #[error("Decryption error: {0}")]
    Decrypt(#[from] DecryptFailure),

    #[error("Resource limit exceeded: {0}")]
    ResourceLimit(String),
}

impl CredScanError {
    /// True for an I/O error caused by reading past the end of the file.
    pub fn is_short_read(&self) -> bool {
        matches!(self, CredScanError::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
    }
}

pub type Result<T> = std::result::Result<T, CredScanError>;
