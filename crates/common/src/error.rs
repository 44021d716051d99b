//! Common error types shared across crates.

use thiserror::Error;

/// Caller-facing classification of encryption-core failures.
///
/// Variants map to process exit codes returned by operator tooling:
/// - [`ServiceError::Configuration`] → 78 (`EX_CONFIG`)
/// - [`ServiceError::Decryption`] → 2
/// - [`ServiceError::InvalidInput`] → 64 (`EX_USAGE`)
/// - [`ServiceError::Internal`] → 70 (`EX_SOFTWARE`)
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A required secret is missing or empty.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Stored ciphertext could not be turned back into plaintext. Operator
    /// tooling prints the fail-closed value and exits with this code.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// The caller supplied input that cannot be read (e.g. stdin is not UTF-8).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the process exit code that should be used for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            ServiceError::Configuration(_) => 78,
            ServiceError::Decryption(_) => 2,
            ServiceError::InvalidInput(_) => 64,
            ServiceError::Internal(_) => 70,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(ServiceError::Configuration("x".into()).exit_code(), 78);
        assert_eq!(ServiceError::Decryption("x".into()).exit_code(), 2);
        assert_eq!(ServiceError::InvalidInput("x".into()).exit_code(), 64);
        assert_eq!(ServiceError::Internal("x".into()).exit_code(), 70);
    }

    #[test]
    fn display_includes_message() {
        let e = ServiceError::Configuration("CHAT_ENCRYPTION_SECRET is empty".into());
        assert!(e.to_string().contains("CHAT_ENCRYPTION_SECRET"));
    }
}
