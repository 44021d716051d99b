//! Deterministic lookup hashes for encrypted columns.
//!
//! Field envelopes use a fresh nonce per write, so the same email never
//! encrypts to the same text twice and cannot be matched in SQL. Rows that
//! need equality lookup also store a hash of the normalised value.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of the lower-cased email, as stored in `emailHashed`.
pub fn email_lookup_hash(email: &str) -> String {
    hex::encode(Sha256::digest(email.to_lowercase().as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        // sha256("abc")
        assert_eq!(
            email_lookup_hash("ABC"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(
            email_lookup_hash("Juan@Example.com"),
            email_lookup_hash("juan@example.com")
        );
    }

    #[test]
    fn whitespace_is_significant() {
        assert_ne!(
            email_lookup_hash(" juan@example.com"),
            email_lookup_hash("juan@example.com")
        );
    }
}
