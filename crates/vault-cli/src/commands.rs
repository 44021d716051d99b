//! Subcommands and their execution.
//!
//! Every command writes one JSON value to stdout. Decryption failures are
//! not errors here: they print `null` (fields) or the sentinel string (chat)
//! and exit with the [`ServiceError::Decryption`] code, mirroring what a read
//! path shows.

use std::io::Read;

use clap::{Parser, Subcommand};
use common::ServiceError;
use pii_vault::{blind_index, Envelope, FieldCipher, FieldError, MessageCipher, MessageError};
use tracing::warn;

use crate::config::Config;

/// Encrypt and decrypt stored PII columns and chat messages.
#[derive(Parser, Debug)]
#[command(name = "vault-cli", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encrypt a value into envelope JSON (uses ENCRYPTION_SECRET)
    EncryptField {
        /// Plaintext, or `-` to read stdin
        plaintext: String,
    },
    /// Decrypt envelope JSON back to plaintext (uses ENCRYPTION_SECRET)
    DecryptField {
        /// Envelope JSON as stored in the column, or `-` to read stdin
        envelope: String,
    },
    /// Encrypt a chat message (uses CHAT_ENCRYPTION_SECRET)
    EncryptMessage {
        /// Message text, or `-` to read stdin
        plaintext: String,
    },
    /// Decrypt a chat message from its two hex columns (uses CHAT_ENCRYPTION_SECRET)
    DecryptMessage {
        /// Hex `encrypted_message` column
        #[arg(long)]
        ciphertext: String,
        /// Hex `iv` column
        #[arg(long)]
        iv: String,
    },
    /// Compute the email lookup hash stored beside an encrypted email
    LookupHash {
        /// Email address, or `-` to read stdin
        email: String,
    },
}

/// What a command printed and how the process should exit.
#[derive(Debug, PartialEq, Eq)]
pub struct Output {
    pub stdout: String,
    pub exit_code: i32,
}

impl Output {
    fn ok(stdout: String) -> Self {
        Self { stdout, exit_code: 0 }
    }

    /// Log `cause` and print the fail-closed value instead of an error body.
    fn decrypt_failed(stdout: String, cause: ServiceError) -> Self {
        warn!(error = %cause, "value could not be decrypted");
        Self {
            stdout,
            exit_code: cause.exit_code(),
        }
    }
}

/// Execute `command`.
///
/// # Errors
///
/// Returns [`ServiceError::Configuration`] when the needed secret is unset and
/// [`ServiceError::InvalidInput`] when stdin cannot be read. Malformed or
/// undecryptable ciphertext is not an error; see [`Output`].
pub fn run(command: Command, cfg: &Config, stdin: &mut impl Read) -> Result<Output, ServiceError> {
    match command {
        Command::EncryptField { plaintext } => {
            let cipher = FieldCipher::new(cfg.field_secret()?).map_err(field_error)?;
            let plaintext = resolve_input(plaintext, stdin)?;
            let envelope = cipher.encrypt(&plaintext).map_err(field_error)?;
            Ok(Output::ok(envelope.to_json()))
        }
        Command::DecryptField { envelope } => {
            let cipher = FieldCipher::new(cfg.field_secret()?).map_err(field_error)?;
            let text = resolve_input(envelope, stdin)?;
            match Envelope::from_json(text.trim()).and_then(|env| cipher.try_decrypt(&env)) {
                Ok(plaintext) => Ok(Output::ok(to_json(&plaintext)?)),
                Err(e) => Ok(Output::decrypt_failed(
                    "null".into(),
                    ServiceError::Decryption(e.to_string()),
                )),
            }
        }
        Command::EncryptMessage { plaintext } => {
            let cipher = MessageCipher::new(cfg.chat_secret()?).map_err(message_error)?;
            let plaintext = resolve_input(plaintext, stdin)?;
            Ok(Output::ok(to_json(&cipher.encrypt(&plaintext))?))
        }
        Command::DecryptMessage { ciphertext, iv } => {
            let cipher = MessageCipher::new(cfg.chat_secret()?).map_err(message_error)?;
            match cipher.decrypt(ciphertext.trim(), iv.trim()) {
                Ok(plaintext) => Ok(Output::ok(to_json(&plaintext)?)),
                Err(e) => Ok(Output::decrypt_failed(
                    to_json(e.sentinel())?,
                    ServiceError::Decryption(e.to_string()),
                )),
            }
        }
        Command::LookupHash { email } => {
            let email = resolve_input(email, stdin)?;
            Ok(Output::ok(to_json(&blind_index::email_lookup_hash(
                email.trim(),
            ))?))
        }
    }
}

/// `-` means "read all of stdin", minus one trailing newline.
fn resolve_input(arg: String, stdin: &mut impl Read) -> Result<String, ServiceError> {
    if arg != "-" {
        return Ok(arg);
    }
    let mut buf = String::new();
    stdin
        .read_to_string(&mut buf)
        .map_err(|e| ServiceError::InvalidInput(format!("failed to read stdin: {e}")))?;
    if buf.ends_with('\n') {
        buf.pop();
        if buf.ends_with('\r') {
            buf.pop();
        }
    }
    Ok(buf)
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, ServiceError> {
    serde_json::to_string(value).map_err(|e| ServiceError::Internal(e.to_string()))
}

fn field_error(e: FieldError) -> ServiceError {
    match e {
        FieldError::Key(e) => ServiceError::Configuration(e.to_string()),
        other => ServiceError::Internal(other.to_string()),
    }
}

fn message_error(e: MessageError) -> ServiceError {
    match e {
        MessageError::Key(e) => ServiceError::Configuration(e.to_string()),
        other => ServiceError::Internal(other.to_string()),
    }
}
