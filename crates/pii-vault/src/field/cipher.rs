//! AES-256-GCM encryption and decryption of individual string fields.
//!
//! **Every call draws a fresh 96-bit nonce from the OS CSPRNG.** Nonce reuse
//! under GCM breaks both confidentiality and authentication; never add a
//! code path that accepts a caller-chosen nonce.

use aes_gcm::{
    aead::{AeadInPlace, KeyInit},
    Aes256Gcm, Nonce, Tag,
};
use rand::{rngs::OsRng, RngCore};

use super::envelope::Envelope;
use super::FieldError;
use crate::kdf::{self, DerivedKey};

/// Byte length of a GCM nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of a GCM authentication tag (16 bytes = 128 bits).
pub const TAG_LEN: usize = 16;

/// A field cipher bound to one derived key.
///
/// Construction runs PBKDF2 once; every later `encrypt` / `decrypt` is cheap.
/// Cloning is cheap and clones share no mutable state.
#[derive(Clone)]
pub struct FieldCipher {
    cipher: Aes256Gcm,
}

impl FieldCipher {
    /// Derive the field key for `secret` and build a cipher from it.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::Key`] if the secret is empty.
    pub fn new(secret: &str) -> Result<Self, FieldError> {
        let key = kdf::derive_field_key(secret)?;
        Ok(Self::from_key(&key))
    }

    /// Build a cipher from an already-derived key.
    pub fn from_key(key: &DerivedKey) -> Self {
        Self {
            cipher: Aes256Gcm::new(key.as_bytes().into()),
        }
    }

    /// Encrypt `plaintext` into a new [`Envelope`].
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::AeadFailure`] on an internal AEAD error (should be
    /// unreachable for field-sized inputs).
    pub fn encrypt(&self, plaintext: &str) -> Result<Envelope, FieldError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);

        let mut buffer = plaintext.as_bytes().to_vec();
        let tag = self
            .cipher
            .encrypt_in_place_detached(Nonce::from_slice(&nonce_bytes), b"", &mut buffer)
            .map_err(|_| FieldError::AeadFailure)?;

        Ok(Envelope::from_parts(&nonce_bytes, &buffer, tag.as_slice()))
    }

    /// Decrypt `envelope`, verifying its authentication tag.
    ///
    /// # Errors
    ///
    /// - [`FieldError::IncompleteEnvelope`], [`FieldError::InvalidHex`], or
    ///   [`FieldError::InvalidLength`] if the envelope is structurally invalid.
    /// - [`FieldError::AeadFailure`] on a wrong key or tampered data/tag.
    /// - [`FieldError::InvalidUtf8`] if the authenticated plaintext is not UTF-8.
    pub fn try_decrypt(&self, envelope: &Envelope) -> Result<String, FieldError> {
        let decoded = envelope.decode()?;
        let mut buffer = decoded.ciphertext;
        self.cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(&decoded.nonce),
                b"",
                &mut buffer,
                Tag::from_slice(&decoded.tag),
            )
            .map_err(|_| FieldError::AeadFailure)?;
        String::from_utf8(buffer).map_err(|_| FieldError::InvalidUtf8)
    }

    /// Decrypt `envelope`, logging and swallowing any failure.
    pub fn decrypt(&self, envelope: &Envelope) -> Option<String> {
        match self.try_decrypt(envelope) {
            Ok(plaintext) => Some(plaintext),
            Err(e) => {
                tracing::warn!(error = %e, "field decryption failed");
                None
            }
        }
    }
}

impl std::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FieldCipher([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_key_cipher() -> FieldCipher {
        let mut key = [0u8; kdf::KEY_LEN];
        OsRng.fill_bytes(&mut key);
        FieldCipher {
            cipher: Aes256Gcm::new((&key).into()),
        }
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let cipher = random_key_cipher();
        let envelope = cipher.encrypt("juan.delacruz@example.com").unwrap();
        assert_eq!(cipher.try_decrypt(&envelope).unwrap(), "juan.delacruz@example.com");
    }

    #[test]
    fn envelope_sizes() {
        let cipher = random_key_cipher();
        let envelope = cipher.encrypt("Juan").unwrap();
        assert_eq!(envelope.iv.len(), NONCE_LEN * 2);
        assert_eq!(envelope.auth_tag.len(), TAG_LEN * 2);
        // GCM is a stream mode: ciphertext length equals plaintext length.
        assert_eq!(envelope.data.len(), "Juan".len() * 2);
    }

    #[test]
    fn empty_plaintext_round_trip() {
        let cipher = random_key_cipher();
        let envelope = cipher.encrypt("").unwrap();
        assert!(envelope.data.is_empty());
        assert_eq!(cipher.try_decrypt(&envelope).unwrap(), "");
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let a = random_key_cipher();
        let b = random_key_cipher();
        let envelope = a.encrypt("secret").unwrap();
        assert!(matches!(b.try_decrypt(&envelope), Err(FieldError::AeadFailure)));
        assert!(b.decrypt(&envelope).is_none());
    }

    #[test]
    fn tampered_ciphertext_fails_auth() {
        let cipher = random_key_cipher();
        let mut envelope = cipher.encrypt("tamper me").unwrap();
        let mut data = hex::decode(&envelope.data).unwrap();
        data[0] ^= 0x01;
        envelope.data = hex::encode(data);
        assert!(matches!(
            cipher.try_decrypt(&envelope),
            Err(FieldError::AeadFailure)
        ));
    }

    #[test]
    fn tampered_tag_fails_auth() {
        let cipher = random_key_cipher();
        let mut envelope = cipher.encrypt("tamper me").unwrap();
        let mut tag = hex::decode(&envelope.auth_tag).unwrap();
        tag[TAG_LEN - 1] ^= 0x80;
        envelope.auth_tag = hex::encode(tag);
        assert!(cipher.decrypt(&envelope).is_none());
    }

    #[test]
    fn debug_is_redacted() {
        assert!(format!("{:?}", random_key_cipher()).contains("REDACTED"));
    }
}
