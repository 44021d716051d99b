//! Field Encryption Service: AEAD for short PII strings stored in text columns.
//!
//! Callers hand over plaintext and the field secret and get back an
//! [`Envelope`]; on the read path they hand the envelope back and get
//! `Some(plaintext)` or `None`.
//!
//! # Column format
//!
//! ```text
//! {"iv":"<hex nonce>","data":"<hex ciphertext>","authTag":"<hex tag>"}
//! ```
//!
//! # Failure policy
//!
//! Decryption fails closed. [`try_decrypt_field`] reports why; [`decrypt_field`]
//! logs the cause at `warn` and returns `None`, leaving the caller to render a
//! fallback (blank name, placeholder photo).

pub mod cipher;
pub mod envelope;

pub use cipher::FieldCipher;
pub use envelope::Envelope;

use thiserror::Error;

use crate::kdf::KdfError;

/// Errors produced by the field encryption layer.
#[derive(Debug, Error)]
pub enum FieldError {
    /// The field secret could not be turned into a key.
    #[error("key derivation failed: {0}")]
    Key(#[from] KdfError),

    /// Column text is not a JSON object with `iv`, `data`, and `authTag`.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// A required envelope field is present but blank.
    #[error("incomplete envelope: `{0}` is empty")]
    IncompleteEnvelope(&'static str),

    /// An envelope field is not valid hex.
    #[error("envelope field `{0}` is not valid hex")]
    InvalidHex(&'static str),

    /// The nonce or tag decoded to the wrong number of bytes.
    #[error("envelope field `{0}` has the wrong length")]
    InvalidLength(&'static str),

    /// AES-GCM encryption failed, or decryption failed authentication.
    #[error("aead operation failed")]
    AeadFailure,

    /// The authenticated plaintext is not valid UTF-8.
    #[error("decrypted field is not valid UTF-8")]
    InvalidUtf8,
}

/// A stored column read back through [`read_column`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnValue {
    /// The column held a valid envelope for this secret.
    Decrypted(String),
    /// The column does not look like an envelope: a row written before
    /// encryption was introduced. The text is returned as-is.
    Legacy(String),
    /// The column looks like an envelope but could not be decrypted.
    Unreadable,
}

impl ColumnValue {
    /// The readable text, if any.
    pub fn into_option(self) -> Option<String> {
        match self {
            ColumnValue::Decrypted(s) | ColumnValue::Legacy(s) => Some(s),
            ColumnValue::Unreadable => None,
        }
    }
}

/// Encrypt `plaintext` under the field key derived from `secret`.
///
/// Derives the key on every call; see [`FieldCipher`] for repeated use.
///
/// # Errors
///
/// Returns [`FieldError::Key`] if `secret` is empty.
pub fn encrypt_field(plaintext: &str, secret: &str) -> Result<Envelope, FieldError> {
    FieldCipher::new(secret)?.encrypt(plaintext)
}

/// Decrypt `envelope` with the field key derived from `secret`.
///
/// # Errors
///
/// Any [`FieldError`]; a wrong secret surfaces as [`FieldError::AeadFailure`].
pub fn try_decrypt_field(envelope: &Envelope, secret: &str) -> Result<String, FieldError> {
    FieldCipher::new(secret)?.try_decrypt(envelope)
}

/// Decrypt `envelope`, returning `None` on any failure.
pub fn decrypt_field(envelope: &Envelope, secret: &str) -> Option<String> {
    match try_decrypt_field(envelope, secret) {
        Ok(plaintext) => Some(plaintext),
        Err(e) => {
            tracing::warn!(error = %e, "field decryption failed");
            None
        }
    }
}

/// Encrypt `plaintext` and serialize the envelope to column text.
///
/// # Errors
///
/// Returns [`FieldError::Key`] if `secret` is empty.
pub fn encrypt_column(plaintext: &str, secret: &str) -> Result<String, FieldError> {
    encrypt_field(plaintext, secret).map(|envelope| envelope.to_json())
}

/// Parse column text as an envelope and decrypt it, returning `None` on any
/// failure (including text that is not an envelope).
pub fn decrypt_column(text: &str, secret: &str) -> Option<String> {
    let envelope = match Envelope::from_json(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(error = %e, "stored column is not a field envelope");
            return None;
        }
    };
    decrypt_field(&envelope, secret)
}

/// Read a column that may predate encryption.
///
/// Text that does not start with `{` is treated as legacy plaintext and
/// returned unchanged; anything else must be a valid envelope.
pub fn read_column(text: &str, secret: &str) -> ColumnValue {
    match FieldCipher::new(secret) {
        Ok(cipher) => read_column_with(text, &cipher),
        Err(e) => {
            tracing::warn!(error = %e, "field key unavailable");
            if looks_like_envelope(text) {
                ColumnValue::Unreadable
            } else {
                ColumnValue::Legacy(text.to_owned())
            }
        }
    }
}

/// [`read_column`] with an already-built cipher.
pub fn read_column_with(text: &str, cipher: &FieldCipher) -> ColumnValue {
    if !looks_like_envelope(text) {
        return ColumnValue::Legacy(text.to_owned());
    }
    let decrypted = Envelope::from_json(text).and_then(|envelope| cipher.try_decrypt(&envelope));
    match decrypted {
        Ok(plaintext) => ColumnValue::Decrypted(plaintext),
        Err(e) => {
            tracing::warn!(error = %e, "field decryption failed");
            ColumnValue::Unreadable
        }
    }
}

fn looks_like_envelope(text: &str) -> bool {
    text.trim_start().starts_with('{')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn juan_scenario() {
        let envelope = encrypt_field("Juan", "topsecret").unwrap();
        assert_eq!(decrypt_field(&envelope, "topsecret").as_deref(), Some("Juan"));
        assert_eq!(decrypt_field(&envelope, "wrongsecret"), None);
    }

    #[test]
    fn empty_secret_is_a_key_error() {
        assert!(matches!(
            encrypt_field("Juan", ""),
            Err(FieldError::Key(KdfError::EmptySecret))
        ));
    }

    #[test]
    fn column_round_trip() {
        let text = encrypt_column("/uploads/ids/123.png", "topsecret").unwrap();
        assert!(text.contains("\"authTag\""));
        assert_eq!(
            decrypt_column(&text, "topsecret").as_deref(),
            Some("/uploads/ids/123.png")
        );
    }

    #[test]
    fn decrypt_column_rejects_garbage() {
        assert_eq!(decrypt_column("not json", "topsecret"), None);
        assert_eq!(decrypt_column(r#"{"iv":"00"}"#, "topsecret"), None);
    }

    #[test]
    fn read_column_classifies_values() {
        let cipher = FieldCipher::new("topsecret").unwrap();
        let stored = cipher.encrypt("Maria").unwrap().to_json();

        assert_eq!(
            read_column_with(&stored, &cipher),
            ColumnValue::Decrypted("Maria".into())
        );
        assert_eq!(
            read_column_with("Maria", &cipher),
            ColumnValue::Legacy("Maria".into())
        );
        assert_eq!(
            read_column_with(r#"{"iv":"","data":"","authTag":""}"#, &cipher),
            ColumnValue::Unreadable
        );
    }

    #[test]
    fn read_column_without_key_keeps_legacy_text() {
        assert_eq!(
            read_column("plain@example.com", ""),
            ColumnValue::Legacy("plain@example.com".into())
        );
        assert_eq!(read_column("{\"iv\":\"aa\"}", ""), ColumnValue::Unreadable);
    }

    #[test]
    fn column_value_into_option() {
        assert_eq!(ColumnValue::Legacy("a".into()).into_option().as_deref(), Some("a"));
        assert_eq!(ColumnValue::Unreadable.into_option(), None);
    }
}
