use aes_gcm::aead::consts::U12;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::aes::Aes192;
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm, Nonce, Tag};
use zeroize::Zeroizing;

use crate::crypto::suite::{CipherSuite, SECRET_VERSION_MARKER};
use crate::crypto::unwrap::MasterKey;
use crate::error::{DecryptFailure, Result};

/// Nonce size for AES-GCM is 12 bytes.
pub const NONCE_SIZE: usize = 12;
/// Authentication tag is 16 bytes.
pub const TAG_SIZE: usize = 16;
/// Marker plus nonce; anything shorter is not a sealed secret.
pub const MIN_SECRET_LEN: usize = SECRET_VERSION_MARKER.len() + NONCE_SIZE;

/// AES-GCM with a 192-bit key and 96-bit nonce.
pub type Aes192Gcm = AesGcm<Aes192, U12>;

/// The parts of a sealed secret:
///   "v10" (3 bytes) || nonce (12 bytes) || ciphertext || tag (16 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SealedSecret<'a> {
    pub nonce: &'a [u8],
    pub ciphertext: &'a [u8],
    pub tag: &'a [u8],
}

impl<'a> SealedSecret<'a> {
    pub fn split(secret: &'a [u8]) -> Result<Self> {
        if secret.len() < MIN_SECRET_LEN || !secret.starts_with(SECRET_VERSION_MARKER) {
            return Err(DecryptFailure::VersionMarker.into());
        }
        let tag_start = secret
            .len()
            .checked_sub(TAG_SIZE)
            .filter(|&start| start >= MIN_SECRET_LEN)
            .ok_or(DecryptFailure::Truncated)?;

        Ok(SealedSecret {
            nonce: &secret[SECRET_VERSION_MARKER.len()..MIN_SECRET_LEN],
            ciphertext: &secret[MIN_SECRET_LEN..tag_start],
            tag: &secret[tag_start..],
        })
    }
}

enum CipherImpl {
    Aes128(Box<Aes128Gcm>),
    Aes192(Box<Aes192Gcm>),
    Aes256(Box<Aes256Gcm>),
}

/// Per-store record decryptor built once from the unwrapped key.
pub struct RecordCipher {
    suite: CipherSuite,
    inner: CipherImpl,
    max_plaintext_len: usize,
}

impl RecordCipher {
    pub fn new(master_key: &MasterKey, max_plaintext_len: usize) -> Result<Self> {
        let suite = CipherSuite::for_key_len(master_key.len())?;
        let invalid = |_| DecryptFailure::UnsupportedKeyLength(master_key.len());
        let inner = match suite {
            CipherSuite::Aes128Gcm => CipherImpl::Aes128(Box::new(
                Aes128Gcm::new_from_slice(master_key.as_bytes()).map_err(invalid)?,
            )),
            CipherSuite::Aes192Gcm => CipherImpl::Aes192(Box::new(
                Aes192Gcm::new_from_slice(master_key.as_bytes()).map_err(invalid)?,
            )),
            CipherSuite::Aes256Gcm => CipherImpl::Aes256(Box::new(
                Aes256Gcm::new_from_slice(master_key.as_bytes()).map_err(invalid)?,
            )),
        };
        Ok(RecordCipher {
            suite,
            inner,
            max_plaintext_len,
        })
    }

    pub const fn suite(&self) -> CipherSuite {
        self.suite
    }

    /// Open one sealed secret. Nothing is returned unless the tag verifies.
    pub fn decrypt(&self, secret: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let sealed = SealedSecret::split(secret)?;
        if sealed.ciphertext.len() > self.max_plaintext_len {
            return Err(DecryptFailure::PlaintextTooLarge {
                len: sealed.ciphertext.len(),
                max: self.max_plaintext_len,
            }
            .into());
        }

        let nonce = Nonce::from_slice(sealed.nonce);
        let tag = Tag::from_slice(sealed.tag);
        let mut buffer = Zeroizing::new(sealed.ciphertext.to_vec());

        let opened = match &self.inner {
            CipherImpl::Aes128(c) => c.decrypt_in_place_detached(nonce, b"", &mut buffer, tag),
            CipherImpl::Aes192(c) => c.decrypt_in_place_detached(nonce, b"", &mut buffer, tag),
            CipherImpl::Aes256(c) => c.decrypt_in_place_detached(nonce, b"", &mut buffer, tag),
        };
        // On failure `buffer` holds unauthenticated bytes; it is wiped on drop.
        opened.map_err(|_| DecryptFailure::Authentication)?;
        Ok(buffer)
    }
}

/// Decrypt a single secret with `master_key`.
pub fn decrypt_secret(
    master_key: &MasterKey,
    secret: &[u8],
    max_plaintext_len: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    RecordCipher::new(master_key, max_plaintext_len)?.decrypt(secret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CredScanError;
    use aes_gcm::aead::Aead;

    fn test_key() -> MasterKey {
        MasterKey::from_slice(&[0x42u8; 32])
    }

    fn seal(key: &[u8], nonce: &[u8; NONCE_SIZE], plaintext: &[u8]) -> Vec<u8> {
        let sealed = match key.len() {
            16 => Aes128Gcm::new_from_slice(key)
                .unwrap()
                .encrypt(Nonce::from_slice(nonce), plaintext),
            24 => Aes192Gcm::new_from_slice(key)
                .unwrap()
                .encrypt(Nonce::from_slice(nonce), plaintext),
            _ => Aes256Gcm::new_from_slice(key)
                .unwrap()
                .encrypt(Nonce::from_slice(nonce), plaintext),
        }
        .unwrap();
        let mut out = SECRET_VERSION_MARKER.to_vec();
        out.extend_from_slice(nonce);
        out.extend_from_slice(&sealed);
        out
    }

    fn failure(result: Result<Zeroizing<Vec<u8>>>) -> DecryptFailure {
        match result {
            Err(CredScanError::Decrypt(f)) => f,
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("decryption unexpectedly succeeded"),
        }
    }

    #[test]
    fn test_decrypt_roundtrip() {
        let secret = seal(&[0x42u8; 32], &[9u8; 12], b"correct horse");
        let cipher = RecordCipher::new(&test_key(), 1024).unwrap();
        assert_eq!(cipher.suite(), CipherSuite::Aes256Gcm);
        assert_eq!(&*cipher.decrypt(&secret).unwrap(), b"correct horse");
    }

    #[test]
    fn test_decrypt_aes128() {
        let key = MasterKey::from_slice(&[0x11u8; 16]);
        let secret = seal(&[0x11u8; 16], &[1u8; 12], b"short key");
        assert_eq!(&*decrypt_secret(&key, &secret, 1024).unwrap(), b"short key");
    }

    #[test]
    fn test_decrypt_aes192() {
        let key = MasterKey::from_slice(&[0x24u8; 24]);
        let cipher = RecordCipher::new(&key, 1024).unwrap();
        assert_eq!(cipher.suite(), CipherSuite::Aes192Gcm);
        let secret = seal(&[0x24u8; 24], &[2u8; 12], b"mid key");
        assert_eq!(&*cipher.decrypt(&secret).unwrap(), b"mid key");
    }

    #[test]
    fn test_key_schedules_wipe_on_drop() {
        fn wipes_on_drop<T: zeroize::ZeroizeOnDrop>() {}
        wipes_on_drop::<aes_gcm::aes::Aes128>();
        wipes_on_drop::<Aes192>();
        wipes_on_drop::<aes_gcm::aes::Aes256>();
    }

    #[test]
    fn test_empty_plaintext() {
        let secret = seal(&[0x42u8; 32], &[0u8; 12], b"");
        assert_eq!(secret.len(), 31);
        assert!(decrypt_secret(&test_key(), &secret, 1024).unwrap().is_empty());
    }

    #[test]
    fn test_split_layout() {
        let secret = seal(&[0x42u8; 32], &[5u8; 12], b"abcd");
        let sealed = SealedSecret::split(&secret).unwrap();
        assert_eq!(sealed.nonce, &[5u8; 12]);
        assert_eq!(sealed.ciphertext.len(), 4);
        assert_eq!(sealed.tag.len(), TAG_SIZE);
    }

    #[test]
    fn test_version_marker_required() {
        let mut secret = seal(&[0x42u8; 32], &[9u8; 12], b"data");
        secret[2] = b'1';
        assert_eq!(
            failure(decrypt_secret(&test_key(), &secret, 1024)),
            DecryptFailure::VersionMarker
        );
        assert_eq!(
            failure(decrypt_secret(&test_key(), b"v10short", 1024)),
            DecryptFailure::VersionMarker
        );
    }

    #[test]
    fn test_negative_ciphertext_span() {
        // Marker and nonce present, but no room for a tag.
        let secret = [b"v10".as_slice(), &[0u8; 16]].concat();
        assert_eq!(secret.len(), 19);
        assert_eq!(
            failure(decrypt_secret(&test_key(), &secret, 1024)),
            DecryptFailure::Truncated
        );
    }

    #[test]
    fn test_wrong_key_fails() {
        let secret = seal(&[0x01u8; 32], &[9u8; 12], b"secret");
        assert_eq!(
            failure(decrypt_secret(&test_key(), &secret, 1024)),
            DecryptFailure::Authentication
        );
    }

    #[test]
    fn test_tamper_detection() {
        let mut secret = seal(&[0x42u8; 32], &[9u8; 12], b"Sensitive data");
        secret[16] ^= 0x01;
        assert_eq!(
            failure(decrypt_secret(&test_key(), &secret, 1024)),
            DecryptFailure::Authentication
        );
    }

    #[test]
    fn test_plaintext_bound() {
        let cipher = RecordCipher::new(&test_key(), 1024).unwrap();
        let at_limit = seal(&[0x42u8; 32], &[9u8; 12], &[b'a'; 1024]);
        assert_eq!(cipher.decrypt(&at_limit).unwrap().len(), 1024);

        let over = seal(&[0x42u8; 32], &[9u8; 12], &[b'a'; 1025]);
        assert_eq!(
            failure(cipher.decrypt(&over)),
            DecryptFailure::PlaintextTooLarge { len: 1025, max: 1024 }
        );
    }

    #[test]
    fn test_unsupported_key_length() {
        let key = MasterKey::from_slice(&[0u8; 20]);
        assert!(matches!(
            RecordCipher::new(&key, 1024),
            Err(CredScanError::Decrypt(DecryptFailure::UnsupportedKeyLength(20)))
        ));
    }
}
