use std::fmt;

use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{CredScanError, Result};

/// Prefix the key token carries ahead of the protected blob.
pub const KEY_TOKEN_MARKER: &[u8; 5] = b"DPAPI";
/// Tokens are accepted when they start with this tag and hold a full marker.
const MARKER_TAG: &[u8; 2] = b"DP";

/// Raw symmetric key recovered for one store.
/// Key material is zeroed on drop and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    key: Vec<u8>,
}

impl MasterKey {
    pub fn from_slice(slice: &[u8]) -> Self {
        MasterKey {
            key: slice.to_vec(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    pub fn len(&self) -> usize {
        self.key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MasterKey(<{} bytes>)", self.key.len())
    }
}

/// Account-scoped unprotect operation supplied by the platform.
///
/// Implementations succeed only for the identity that produced the blob and
/// take no key from the caller.
pub trait UnwrapCapability {
    fn unprotect(&self, blob: &[u8]) -> Result<Zeroizing<Vec<u8>>>;
}

impl<T: UnwrapCapability + ?Sized> UnwrapCapability for &T {
    fn unprotect(&self, blob: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        (**self).unprotect(blob)
    }
}

impl<T: UnwrapCapability + ?Sized> UnwrapCapability for Box<T> {
    fn unprotect(&self, blob: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        (**self).unprotect(blob)
    }
}

/// Check the token marker, hand the protected blob to `capability`, and
/// bound the result.
pub fn unwrap_master_key<C: UnwrapCapability + ?Sized>(
    token: &[u8],
    capability: &C,
    max_key_len: usize,
) -> Result<MasterKey> {
    if token.len() < KEY_TOKEN_MARKER.len() || !token.starts_with(MARKER_TAG) {
        return Err(CredScanError::Format(
            "key token lacks its marker prefix".to_string(),
        ));
    }

    let blob = &token[KEY_TOKEN_MARKER.len()..];
    let raw = capability.unprotect(blob).map_err(|e| match e {
        CredScanError::Unwrap(_) => e,
        other => CredScanError::Unwrap(other.to_string()),
    })?;

    if raw.is_empty() {
        return Err(CredScanError::Unwrap("capability returned an empty key".to_string()));
    }
    if raw.len() > max_key_len {
        return Err(CredScanError::Unwrap(format!(
            "unwrapped key of {} bytes exceeds limit of {}",
            raw.len(),
            max_key_len
        )));
    }

    debug!(key_len = raw.len(), "master key unwrapped");
    Ok(MasterKey::from_slice(&raw))
}
