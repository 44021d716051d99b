//! Encryption core for PII at rest and chat messages.
//!
//! Two independent schemes share one key-derivation module:
//!
//! - [`field`]: AES-256-GCM over short strings (names, emails, URLs), keyed by
//!   PBKDF2-HMAC-SHA256 of the field secret. Output is a self-contained
//!   [`Envelope`] stored as JSON text.
//! - [`message`]: AES-256-CBC over chat bodies, keyed by a single SHA-256 of
//!   the chat secret. Output is a hex ciphertext + hex IV column pair.
//!
//! Every operation is a pure function of `(input, secret)`. Decryption fails
//! closed: callers get `None` or a fixed sentinel, never a panic.
//!
//! # Invariants
//!
//! - **No plaintext, secret, or key material** is ever written to a log field.
//! - The library never reads configuration; secrets are injected per call.

pub mod blind_index;
pub mod cache;
pub mod field;
pub mod kdf;
pub mod message;
pub mod record;

pub use cache::KeyCache;
pub use field::{
    decrypt_column, decrypt_field, encrypt_column, encrypt_field, read_column, try_decrypt_field,
    ColumnValue, Envelope, FieldCipher, FieldError,
};
pub use kdf::{DerivedKey, KdfError};
pub use message::{
    decrypt_message, decrypt_message_or_sentinel, encrypt_message, MessageCipher, MessageError,
};
