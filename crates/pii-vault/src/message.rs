//! Message Encryption Service: AES-256-CBC for chat bodies.
//!
//! Stored as two hex columns on the `Message` row: `encrypted_message` and
//! `iv` (16 bytes). The key is `SHA-256(chat secret)`.
//!
//! There is **no authentication tag**. A modified ciphertext either fails
//! unpadding or decrypts to different text; it is never detected as tampered.
//! The format is kept bit-compatible with rows already in the database.
//!
//! Read-path failures map to two fixed strings that are safe to render in a
//! chat window: `"[IV Error]"` for a bad IV and `"[Decryption Error]"` for
//! everything else.

use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use common::protocol::{ChatCiphertext, DECRYPTION_ERROR_SENTINEL, IV_ERROR_SENTINEL};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;

use crate::kdf::{self, DerivedKey, KdfError};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Byte length of a CBC IV (one AES block).
pub const IV_LEN: usize = 16;

/// Errors produced by the message encryption layer.
#[derive(Debug, Error)]
pub enum MessageError {
    /// The chat secret could not be turned into a key.
    #[error("key derivation failed: {0}")]
    Key(#[from] KdfError),

    /// The stored ciphertext or IV column is empty.
    #[error("missing encrypted message or IV")]
    MissingInput,

    /// The IV does not decode to exactly 16 bytes.
    #[error("IV length invalid, expected {IV_LEN} bytes")]
    InvalidIv,

    /// The ciphertext column is not valid hex.
    #[error("ciphertext is not valid hex")]
    InvalidHex,

    /// CBC decryption produced invalid padding (wrong key or corrupted data).
    #[error("bad padding")]
    BadPadding,

    /// The decrypted bytes are not valid UTF-8.
    #[error("decrypted message is not valid UTF-8")]
    InvalidUtf8,
}

impl MessageError {
    /// The fixed string shown to users in place of the message.
    pub fn sentinel(&self) -> &'static str {
        match self {
            MessageError::InvalidIv => IV_ERROR_SENTINEL,
            _ => DECRYPTION_ERROR_SENTINEL,
        }
    }
}

/// A chat cipher bound to one derived key.
#[derive(Clone, Debug)]
pub struct MessageCipher {
    key: DerivedKey,
}

impl MessageCipher {
    /// Derive the chat key for `secret`.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::Key`] if the secret is empty.
    pub fn new(secret: &str) -> Result<Self, MessageError> {
        Ok(Self::from_key(kdf::derive_message_key(secret)?))
    }

    /// Build a cipher from an already-derived key.
    pub fn from_key(key: DerivedKey) -> Self {
        Self { key }
    }

    /// Encrypt `plaintext` under a fresh random IV.
    pub fn encrypt(&self, plaintext: &str) -> ChatCiphertext {
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);

        let ciphertext = Aes256CbcEnc::new(self.key.as_bytes().into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

        ChatCiphertext::new(hex::encode(ciphertext), hex::encode(iv))
    }

    /// Decrypt a hex ciphertext / hex IV pair.
    ///
    /// # Errors
    ///
    /// Checked in order: [`MessageError::MissingInput`],
    /// [`MessageError::InvalidIv`], [`MessageError::InvalidHex`],
    /// [`MessageError::BadPadding`], [`MessageError::InvalidUtf8`].
    pub fn decrypt(&self, ciphertext_hex: &str, iv_hex: &str) -> Result<String, MessageError> {
        if ciphertext_hex.is_empty() || iv_hex.is_empty() {
            return Err(MessageError::MissingInput);
        }

        let iv: [u8; IV_LEN] = hex::decode(iv_hex)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or(MessageError::InvalidIv)?;

        let ciphertext = hex::decode(ciphertext_hex).map_err(|_| MessageError::InvalidHex)?;

        let plaintext = Aes256CbcDec::new(self.key.as_bytes().into(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| MessageError::BadPadding)?;

        String::from_utf8(plaintext).map_err(|_| MessageError::InvalidUtf8)
    }

    /// Decrypt a stored [`ChatCiphertext`].
    pub fn decrypt_stored(&self, stored: &ChatCiphertext) -> Result<String, MessageError> {
        self.decrypt(&stored.encrypted_message, &stored.iv)
    }

    /// Decrypt for display: the plaintext, or the sentinel for the failure.
    pub fn decrypt_or_sentinel(&self, ciphertext_hex: &str, iv_hex: &str) -> String {
        self.decrypt(ciphertext_hex, iv_hex)
            .unwrap_or_else(|e| log_and_substitute(&e))
    }
}

/// Encrypt a chat message under the key derived from `secret`.
///
/// # Errors
///
/// Returns [`MessageError::Key`] if `secret` is empty.
pub fn encrypt_message(plaintext: &str, secret: &str) -> Result<ChatCiphertext, MessageError> {
    Ok(MessageCipher::new(secret)?.encrypt(plaintext))
}

/// Decrypt a chat message, reporting the failure cause.
///
/// # Errors
///
/// See [`MessageCipher::decrypt`]; an empty secret is [`MessageError::Key`].
pub fn decrypt_message(
    ciphertext_hex: &str,
    iv_hex: &str,
    secret: &str,
) -> Result<String, MessageError> {
    MessageCipher::new(secret)?.decrypt(ciphertext_hex, iv_hex)
}

/// Decrypt a chat message for display.
///
/// Returns the plaintext, `"[IV Error]"`, or `"[Decryption Error]"`.
pub fn decrypt_message_or_sentinel(ciphertext_hex: &str, iv_hex: &str, secret: &str) -> String {
    decrypt_message(ciphertext_hex, iv_hex, secret).unwrap_or_else(|e| log_and_substitute(&e))
}

fn log_and_substitute(e: &MessageError) -> String {
    tracing::warn!(error = %e, "chat message decryption failed");
    e.sentinel().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_scenario() {
        let stored = encrypt_message("Hello", "chatkey").unwrap();
        assert_eq!(stored.iv.len(), 32);
        assert_eq!(
            decrypt_message(&stored.encrypted_message, &stored.iv, "chatkey").unwrap(),
            "Hello"
        );
        assert_eq!(
            decrypt_message_or_sentinel(&stored.encrypted_message, &stored.iv[..30], "chatkey"),
            "[IV Error]"
        );
    }

    #[test]
    fn ciphertext_is_whole_blocks() {
        let cipher = MessageCipher::new("chatkey").unwrap();
        // 16 bytes of input gains a full padding block.
        let stored = cipher.encrypt("0123456789abcdef");
        assert_eq!(stored.encrypted_message.len(), 64);
        let stored = cipher.encrypt("");
        assert_eq!(stored.encrypted_message.len(), 32);
        assert_eq!(cipher.decrypt_stored(&stored).unwrap(), "");
    }

    #[test]
    fn iv_is_fresh_per_call() {
        let cipher = MessageCipher::new("chatkey").unwrap();
        let a = cipher.encrypt("same");
        let b = cipher.encrypt("same");
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.encrypted_message, b.encrypted_message);
    }

    #[test]
    fn missing_columns_are_decryption_errors() {
        let cipher = MessageCipher::new("chatkey").unwrap();
        let stored = cipher.encrypt("hi");
        assert!(matches!(cipher.decrypt("", &stored.iv), Err(MessageError::MissingInput)));
        assert_eq!(
            cipher.decrypt_or_sentinel(&stored.encrypted_message, ""),
            "[Decryption Error]"
        );
    }

    #[test]
    fn malformed_iv_hex_is_an_iv_error() {
        let cipher = MessageCipher::new("chatkey").unwrap();
        let stored = cipher.encrypt("hi");
        assert!(matches!(
            cipher.decrypt(&stored.encrypted_message, "zz112233445566778899aabbccddeeff"),
            Err(MessageError::InvalidIv)
        ));
        assert!(matches!(
            cipher.decrypt(&stored.encrypted_message, &format!("{}00", stored.iv)),
            Err(MessageError::InvalidIv)
        ));
    }

    #[test]
    fn iv_checked_before_ciphertext() {
        let cipher = MessageCipher::new("chatkey").unwrap();
        assert!(matches!(cipher.decrypt("not hex", "0011"), Err(MessageError::InvalidIv)));
    }

    #[test]
    fn bad_ciphertext_is_a_decryption_error() {
        let cipher = MessageCipher::new("chatkey").unwrap();
        let stored = cipher.encrypt("hi");
        assert!(matches!(cipher.decrypt("xyz", &stored.iv), Err(MessageError::InvalidHex)));
        // Not a whole number of blocks.
        assert!(matches!(cipher.decrypt("abcd", &stored.iv), Err(MessageError::BadPadding)));
    }

    #[test]
    fn empty_secret_maps_to_decryption_error() {
        let stored = encrypt_message("hi", "chatkey").unwrap();
        assert!(matches!(encrypt_message("hi", ""), Err(MessageError::Key(_))));
        assert_eq!(
            decrypt_message_or_sentinel(&stored.encrypted_message, &stored.iv, ""),
            "[Decryption Error]"
        );
    }

    #[test]
    fn sentinels() {
        assert_eq!(MessageError::InvalidIv.sentinel(), "[IV Error]");
        assert_eq!(MessageError::BadPadding.sentinel(), "[Decryption Error]");
        assert_eq!(MessageError::MissingInput.sentinel(), "[Decryption Error]");
        assert_eq!(MessageError::InvalidUtf8.sentinel(), "[Decryption Error]");
    }

    #[test]
    fn decrypts_ciphertext_from_another_writer() {
        // Rows written by the chat server use the same primitive: raw
        // AES-256-CBC/PKCS#7 keyed by SHA-256 of the secret.
        let cipher = MessageCipher::new("chatkey").unwrap();
        let iv = [0u8; IV_LEN];
        let expected = Aes256CbcEnc::new(
            kdf::derive_message_key("chatkey").unwrap().as_bytes().into(),
            &iv.into(),
        )
        .encrypt_padded_vec_mut::<Pkcs7>(b"Hello");
        assert_eq!(
            cipher.decrypt(&hex::encode(expected), &hex::encode(iv)).unwrap(),
            "Hello"
        );
    }
}
