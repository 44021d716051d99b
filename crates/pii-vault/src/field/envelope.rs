//! The persisted envelope format for one encrypted field value.
//!
//! ```text
//! {"iv":"<24 hex>","data":"<hex>","authTag":"<32 hex>"}
//! ```
//!
//! This is the only place that (de)serializes envelopes. Row helpers and
//! column helpers both go through [`Envelope::to_json`] / [`Envelope::from_json`].

use serde::{Deserialize, Serialize};

use super::cipher::{NONCE_LEN, TAG_LEN};
use super::FieldError;

/// Hex-encoded AES-256-GCM output for a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// 96-bit nonce, hex encoded.
    pub iv: String,
    /// Ciphertext without the tag, hex encoded. Empty for an empty plaintext.
    pub data: String,
    /// 128-bit GCM authentication tag, hex encoded.
    #[serde(rename = "authTag")]
    pub auth_tag: String,
}

/// Raw bytes of a validated [`Envelope`].
pub(crate) struct DecodedEnvelope {
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
    pub tag: [u8; TAG_LEN],
}

impl Envelope {
    /// Build an envelope from raw cipher output.
    pub(crate) fn from_parts(nonce: &[u8], ciphertext: &[u8], tag: &[u8]) -> Self {
        Self {
            iv: hex::encode(nonce),
            data: hex::encode(ciphertext),
            auth_tag: hex::encode(tag),
        }
    }

    /// Serialize to the JSON text stored in a column.
    pub fn to_json(&self) -> String {
        // A struct of three strings always serializes.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parse column text back into an [`Envelope`].
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::MalformedEnvelope`] if `text` is not a JSON object
    /// carrying all of `iv`, `data`, and `authTag` as strings.
    pub fn from_json(text: &str) -> Result<Self, FieldError> {
        // serde's messages can quote the input; report position only.
        serde_json::from_str(text).map_err(|e| {
            FieldError::MalformedEnvelope(format!(
                "{:?} error at line {} column {}",
                e.classify(),
                e.line(),
                e.column()
            ))
        })
    }

    /// Check completeness and decode all three fields from hex.
    ///
    /// # Errors
    ///
    /// - [`FieldError::IncompleteEnvelope`] if `iv` or `authTag` is blank.
    /// - [`FieldError::InvalidHex`] if any field is not valid hex.
    /// - [`FieldError::InvalidLength`] if the nonce or tag has the wrong size.
    pub(crate) fn decode(&self) -> Result<DecodedEnvelope, FieldError> {
        if self.iv.is_empty() {
            return Err(FieldError::IncompleteEnvelope("iv"));
        }
        if self.auth_tag.is_empty() {
            return Err(FieldError::IncompleteEnvelope("authTag"));
        }

        let nonce = decode_fixed::<NONCE_LEN>(&self.iv, "iv")?;
        let tag = decode_fixed::<TAG_LEN>(&self.auth_tag, "authTag")?;
        let ciphertext = hex::decode(&self.data).map_err(|_| FieldError::InvalidHex("data"))?;

        Ok(DecodedEnvelope {
            nonce,
            ciphertext,
            tag,
        })
    }
}

fn decode_fixed<const N: usize>(
    value: &str,
    field: &'static str,
) -> Result<[u8; N], FieldError> {
    let bytes = hex::decode(value).map_err(|_| FieldError::InvalidHex(field))?;
    bytes.try_into().map_err(|_| FieldError::InvalidLength(field))
}
