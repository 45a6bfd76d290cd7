use std::fmt;

use zeroize::Zeroizing;

/// Column positions of the login table, assumed and never verified.
///
/// The scanner has no schema to consult; these indices are an external
/// contract with the store's writer. A record whose account column is NULL,
/// missing or not text is reported with no account.
pub mod credential_columns {
    pub const SITE: usize = 0;
    pub const ACCOUNT: usize = 3;
    pub const SECRET: usize = 5;

    /// Site identifiers must start with this prefix.
    pub const SITE_PREFIX: &[u8] = b"http";
    /// Secrets of this length or shorter are never emitted.
    pub const MIN_SECRET_EXCLUSIVE: usize = 15;
}

/// Where a tuple was found in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellLocation {
    pub page: u32,
    pub cell: u16,
}

impl fmt::Display for CellLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {} cell {}", self.page, self.cell)
    }
}

/// Raw credential columns recovered by the scanner, still encrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialTuple {
    pub site: Vec<u8>,
    pub account: Option<Vec<u8>>,
    pub secret: Vec<u8>,
    pub location: CellLocation,
}

/// A credential whose secret passed authenticated decryption.
///
/// The plaintext is wiped from memory when the value is dropped.
pub struct DecryptedCredential {
    pub site: Vec<u8>,
    pub account: Option<Vec<u8>>,
    pub secret: Zeroizing<Vec<u8>>,
    pub location: CellLocation,
}

impl DecryptedCredential {
    pub fn site_lossy(&self) -> String {
        String::from_utf8_lossy(&self.site).into_owned()
    }

    pub fn account_lossy(&self) -> Option<String> {
        self.account
            .as_deref()
            .map(|a| String::from_utf8_lossy(a).into_owned())
    }
}

impl fmt::Debug for DecryptedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptedCredential")
            .field("site", &self.site_lossy())
            .field("account", &self.account_lossy())
            .field("secret", &format_args!("<{} bytes>", self.secret.len()))
            .field("location", &self.location)
            .finish()
    }
}
