//! In-memory cache of derived keys, keyed by the secret that produced them.
//!
//! PBKDF2 at 100k rounds is too slow to run on every column of every row, so
//! read paths share one [`KeyCache`]. Lookups are lock-free (`arc-swap`); a
//! miss derives the key outside any lock and publishes it with a
//! read-copy-update.
//!
//! # Invariants
//!
//! - The cache key is the secret string itself, never a hash or prefix of it.
//! - Field and message keys live in separate namespaces because the same
//!   secret derives different keys under the two schemes.

use std::{collections::HashMap, sync::Arc};

use arc_swap::ArcSwap;

use crate::field::{FieldCipher, FieldError};
use crate::kdf::{self, DerivedKey};
use crate::message::{MessageCipher, MessageError};

/// Which derivation produced a cached key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyPurpose {
    /// PBKDF2 field key.
    Field,
    /// SHA-256 chat key.
    Message,
}

type KeyMap = HashMap<(KeyPurpose, String), Arc<DerivedKey>>;

/// Shared, lock-free cache of derived keys.
///
/// Cloning is cheap; clones share the same underlying map.
#[derive(Clone, Debug)]
pub struct KeyCache {
    inner: Arc<ArcSwap<KeyMap>>,
}

impl KeyCache {
    /// Create a new, empty [`KeyCache`].
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ArcSwap::new(Arc::new(HashMap::new()))),
        }
    }

    /// Return the number of keys currently cached.
    pub fn len(&self) -> usize {
        self.inner.load().len()
    }

    /// Return `true` if no keys are cached.
    pub fn is_empty(&self) -> bool {
        self.inner.load().is_empty()
    }

    /// A [`FieldCipher`] for `secret`, deriving and caching the key on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::Key`] if `secret` is empty. Nothing is cached.
    pub fn field_cipher(&self, secret: &str) -> Result<FieldCipher, FieldError> {
        let key = self.get_or_derive(KeyPurpose::Field, secret, kdf::derive_field_key)?;
        Ok(FieldCipher::from_key(&key))
    }

    /// A [`MessageCipher`] for `secret`, deriving and caching the key on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::Key`] if `secret` is empty. Nothing is cached.
    pub fn message_cipher(&self, secret: &str) -> Result<MessageCipher, MessageError> {
        let key = self.get_or_derive(KeyPurpose::Message, secret, kdf::derive_message_key)?;
        Ok(MessageCipher::from_key(DerivedKey::clone(&key)))
    }

    /// Drop every cached key. Call after rotating a secret.
    pub fn clear(&self) {
        self.inner.store(Arc::new(HashMap::new()));
    }

    fn get_or_derive(
        &self,
        purpose: KeyPurpose,
        secret: &str,
        derive: fn(&str) -> Result<DerivedKey, kdf::KdfError>,
    ) -> Result<Arc<DerivedKey>, kdf::KdfError> {
        let lookup = (purpose, secret.to_owned());
        if let Some(key) = self.inner.load().get(&lookup) {
            return Ok(Arc::clone(key));
        }

        let key = Arc::new(derive(secret)?);
        tracing::debug!(purpose = ?purpose, "derived key cached");
        self.inner.rcu(|current| {
            let mut next = KeyMap::clone(current);
            next.entry(lookup.clone()).or_insert_with(|| Arc::clone(&key));
            next
        });
        Ok(key)
    }
}

impl Default for KeyCache {
    fn default() -> Self {
        Self::new()
    }
}
