//! Row-level helpers: encrypt or decrypt the PII columns of a JSON row.
//!
//! Read paths fetch rows as JSON objects and must replace every encrypted
//! column with its plaintext, or with a safe fallback when it cannot be read.
//! [`PiiField`] names a column by dot-notation path, with `[]` to fan out over
//! arrays (`"tenants[].email"`), and says what to show on failure.
//!
//! The read-path helpers never return errors: a row is always renderable.

use common::protocol::ChatCiphertext;
use serde_json::Value;

use crate::field::{read_column_with, ColumnValue, FieldCipher, FieldError};
use crate::message::MessageCipher;

/// Placeholder shown when a profile picture URL cannot be decrypted.
pub const DEFAULT_PROFILE_PICTURE: &str = "/ou.jpg";

/// What to put in a column that cannot be decrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fallback {
    /// JSON `null`.
    Null,
    /// The empty string.
    Empty,
    /// Fixed text, e.g. a placeholder image URL.
    Text(String),
}

impl Fallback {
    fn to_value(&self) -> Value {
        match self {
            Fallback::Null => Value::Null,
            Fallback::Empty => Value::String(String::new()),
            Fallback::Text(s) => Value::String(s.clone()),
        }
    }
}

/// An encrypted column within a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PiiField {
    /// Dot-notation path to the column.
    pub path: String,
    /// Value substituted when decryption fails.
    pub fallback: Fallback,
}

impl PiiField {
    /// A column that falls back to `null`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            fallback: Fallback::Null,
        }
    }

    /// Set the fallback for this column.
    pub fn or(mut self, fallback: Fallback) -> Self {
        self.fallback = fallback;
        self
    }
}

/// Counts of what [`decrypt_record`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecryptSummary {
    /// Columns decrypted successfully.
    pub decrypted: usize,
    /// Columns left as legacy plaintext.
    pub legacy: usize,
    /// Columns replaced by their fallback.
    pub fallbacks: usize,
}

/// Segments of a dot-notation column path.
enum PathSegment {
    /// Navigate into an object property by name.
    Key(String),
    /// Expand into every element of a JSON array.
    ArrayItem,
}

/// Parse a dot-notation path into a list of [`PathSegment`]s.
///
/// `"tenants[].email"` → `[Key("tenants"), ArrayItem, Key("email")]`.
fn parse_path(path: &str) -> Vec<PathSegment> {
    let mut segments = Vec::new();
    for part in path.split('.') {
        if let Some(key) = part.strip_suffix("[]") {
            segments.push(PathSegment::Key(key.to_owned()));
            segments.push(PathSegment::ArrayItem);
        } else {
            segments.push(PathSegment::Key(part.to_owned()));
        }
    }
    segments
}

/// Visit every value reachable at `segments`, skipping missing properties.
fn visit_at_path<E>(
    value: &mut Value,
    segments: &[PathSegment],
    f: &mut impl FnMut(&mut Value) -> Result<(), E>,
) -> Result<(), E> {
    let Some((head, rest)) = segments.split_first() else {
        return f(value);
    };

    match head {
        PathSegment::Key(key) => {
            if let Value::Object(map) = value {
                if let Some(child) = map.get_mut(key) {
                    visit_at_path(child, rest, f)?;
                }
            }
        }
        PathSegment::ArrayItem => {
            if let Value::Array(arr) = value {
                for item in arr.iter_mut() {
                    visit_at_path(item, rest, f)?;
                }
            }
        }
    }
    Ok(())
}

/// Replace each string leaf named by `fields` with its envelope JSON text.
///
/// Non-string leaves (`null`, numbers) and missing paths are left untouched.
///
/// # Errors
///
/// Returns the first [`FieldError`] from the cipher; `row` may then be
/// partially encrypted and should be discarded.
pub fn encrypt_record(
    row: &mut Value,
    fields: &[PiiField],
    cipher: &FieldCipher,
) -> Result<(), FieldError> {
    for field in fields {
        let segments = parse_path(&field.path);
        visit_at_path(row, &segments, &mut |leaf: &mut Value| {
            if let Value::String(s) = leaf {
                *leaf = Value::String(cipher.encrypt(s)?.to_json());
            }
            Ok::<(), FieldError>(())
        })?;
    }
    Ok(())
}

/// Replace each encrypted leaf named by `fields` with its plaintext.
///
/// Legacy plaintext is kept as-is. Unreadable envelopes and `null` leaves
/// are replaced with the column's [`Fallback`]. Missing paths are skipped.
pub fn decrypt_record(
    row: &mut Value,
    fields: &[PiiField],
    cipher: &FieldCipher,
) -> DecryptSummary {
    let mut summary = DecryptSummary::default();
    for field in fields {
        let segments = parse_path(&field.path);
        let _ = visit_at_path(row, &segments, &mut |leaf: &mut Value| {
            let read = match leaf {
                Value::String(s) => read_column_with(s, cipher),
                _ => ColumnValue::Unreadable,
            };
            *leaf = match read {
                ColumnValue::Decrypted(plaintext) => {
                    summary.decrypted += 1;
                    Value::String(plaintext)
                }
                ColumnValue::Legacy(text) => {
                    summary.legacy += 1;
                    Value::String(text)
                }
                ColumnValue::Unreadable => {
                    summary.fallbacks += 1;
                    tracing::warn!(path = %field.path, "PII column unreadable, using fallback");
                    field.fallback.to_value()
                }
            };
            Ok::<(), std::convert::Infallible>(())
        });
    }
    summary
}

/// Decrypt a batch of `Message` rows in place.
///
/// Each row's `encrypted_message` and `iv` columns are read and a `message`
/// property is written holding the plaintext or a sentinel string. Rows
/// that are not objects are skipped.
pub fn decrypt_message_rows(rows: &mut [Value], cipher: &MessageCipher) {
    for row in rows.iter_mut() {
        let Value::Object(map) = row else {
            continue;
        };
        let column = |name: &str| {
            map.get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned()
        };
        let stored = ChatCiphertext::new(column("encrypted_message"), column("iv"));
        let message = cipher.decrypt_or_sentinel(&stored.encrypted_message, &stored.iv);
        map.insert("message".into(), Value::String(message));
    }
}
