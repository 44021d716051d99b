//! Common types, persisted column shapes, and errors shared across `pii-vault` crates.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
pub use protocol::{ChatCiphertext, DECRYPTION_ERROR_SENTINEL, IV_ERROR_SENTINEL};
