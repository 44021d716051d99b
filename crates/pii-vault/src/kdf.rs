//! Key derivation for both encryption schemes.
//!
//! Field keys come from PBKDF2-HMAC-SHA256 over a fixed salt. Chat keys are a
//! single SHA-256 of the secret. The two derivations are intentionally
//! different and must stay that way: existing rows were written with them.
//!
//! Keys are never persisted. A wrong secret is not detectable here; it simply
//! yields a different key, and the failure surfaces at decryption time.

use hmac::Hmac;
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::Zeroizing;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Salt shared by every field-key derivation.
///
/// Deployments that share a secret therefore share a key.
pub const FIELD_KEY_SALT: &[u8] = b"unique_salt";

/// PBKDF2 iteration count for field keys.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Errors produced by key derivation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KdfError {
    /// The supplied secret is the empty string. This is a configuration
    /// problem on the caller's side, not a data error.
    #[error("encryption secret is empty")]
    EmptySecret,

    /// PBKDF2 rejected the requested output length.
    #[error("invalid derived key length")]
    InvalidLength,
}

/// A 256-bit symmetric key derived from a secret.
///
/// The bytes are zeroed when the value is dropped.
#[derive(Clone)]
pub struct DerivedKey(Zeroizing<[u8; KEY_LEN]>);

impl DerivedKey {
    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material, not even in debug builds.
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// Derive the field-encryption key for `secret`.
///
/// CPU-bound: 100k HMAC rounds. Hot paths should go through
/// [`crate::KeyCache`] or hold a [`crate::FieldCipher`].
///
/// # Errors
///
/// Returns [`KdfError::EmptySecret`] if `secret` is empty.
pub fn derive_field_key(secret: &str) -> Result<DerivedKey, KdfError> {
    ensure_secret(secret)?;
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::pbkdf2::<Hmac<Sha256>>(
        secret.as_bytes(),
        FIELD_KEY_SALT,
        PBKDF2_ITERATIONS,
        &mut key[..],
    )
    .map_err(|_| KdfError::InvalidLength)?;
    Ok(DerivedKey(key))
}

/// Derive the chat-message key for `secret`: `SHA-256(secret)`.
///
/// # Errors
///
/// Returns [`KdfError::EmptySecret`] if `secret` is empty.
pub fn derive_message_key(secret: &str) -> Result<DerivedKey, KdfError> {
    ensure_secret(secret)?;
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    key.copy_from_slice(&Sha256::digest(secret.as_bytes()));
    Ok(DerivedKey(key))
}

fn ensure_secret(secret: &str) -> Result<(), KdfError> {
    if secret.is_empty() {
        return Err(KdfError::EmptySecret);
    }
    Ok(())
}
