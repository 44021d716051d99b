//! Persisted shapes exchanged between the encryption core and its callers.
//!
//! These types mirror the text columns the application stores; their serde
//! names are part of the on-disk format and must not change.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Chat messages
// ---------------------------------------------------------------------------

/// Rendered in place of a chat message whose IV is not exactly 16 bytes.
pub const IV_ERROR_SENTINEL: &str = "[IV Error]";

/// Rendered in place of a chat message that could not be decrypted for any
/// other reason (missing columns, wrong key, bad padding).
pub const DECRYPTION_ERROR_SENTINEL: &str = "[Decryption Error]";

/// An encrypted chat message as stored on a `Message` row.
///
/// Both fields are lowercase hex. `iv` decodes to 16 bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCiphertext {
    /// AES-256-CBC ciphertext, hex encoded.
    pub encrypted_message: String,
    /// CBC initialisation vector, hex encoded.
    pub iv: String,
}

impl ChatCiphertext {
    /// Construct a [`ChatCiphertext`] from its two hex columns.
    pub fn new(encrypted_message: impl Into<String>, iv: impl Into<String>) -> Self {
        Self {
            encrypted_message: encrypted_message.into(),
            iv: iv.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Error output
// ---------------------------------------------------------------------------

/// Standard error body written by tooling on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"decryption_failed"`).
    pub code: String,
    /// Human-readable description. Never contains plaintext or key material.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_ciphertext_uses_column_names() {
        let c = ChatCiphertext::new("ab01", "00112233445566778899aabbccddeeff");
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["encrypted_message"], "ab01");
        assert_eq!(json["iv"], "00112233445566778899aabbccddeeff");
    }

    #[test]
    fn chat_ciphertext_from_row() {
        let row = r#"{"encrypted_message":"ff","iv":"00"}"#;
        let c: ChatCiphertext = serde_json::from_str(row).unwrap();
        assert_eq!(c, ChatCiphertext::new("ff", "00"));
    }

    #[test]
    fn error_response_new() {
        let e = ErrorResponse::new("config", "ENCRYPTION_SECRET is required");
        assert_eq!(e.code, "config");
        assert!(e.message.contains("ENCRYPTION_SECRET"));
    }

    #[test]
    fn sentinels_are_distinct() {
        assert_ne!(IV_ERROR_SENTINEL, DECRYPTION_ERROR_SENTINEL);
    }
}
