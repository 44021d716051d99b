//! Configuration loading and validation for the operator CLI.
//!
//! Secrets are read from the same environment variables the application
//! uses, so the CLI derives the same keys. Each subcommand needs only one of
//! the two secrets; [`Config::field_secret`] and [`Config::chat_secret`]
//! report a missing one when it is actually required.

use anyhow::{Context, Result};
use common::ServiceError;
use serde::Deserialize;

/// Validated CLI configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// PII-at-rest field secret (`ENCRYPTION_SECRET`).
    #[serde(default)]
    pub encryption_secret: String,

    /// Chat message secret (`CHAT_ENCRYPTION_SECRET`).
    #[serde(default)]
    pub chat_encryption_secret: String,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment cannot be deserialised.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        cfg.try_deserialize()
            .context("failed to deserialise configuration")
    }

    /// The field secret, or a configuration error if it is unset.
    pub fn field_secret(&self) -> Result<&str, ServiceError> {
        require(&self.encryption_secret, "ENCRYPTION_SECRET")
    }

    /// The chat secret, or a configuration error if it is unset.
    pub fn chat_secret(&self) -> Result<&str, ServiceError> {
        require(&self.chat_encryption_secret, "CHAT_ENCRYPTION_SECRET")
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("encryption_secret", &redacted(&self.encryption_secret))
            .field("chat_encryption_secret", &redacted(&self.chat_encryption_secret))
            .field("log_level", &self.log_level)
            .finish()
    }
}

fn redacted(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "[REDACTED]"
    }
}

fn require<'a>(value: &'a str, name: &str) -> Result<&'a str, ServiceError> {
    if value.is_empty() {
        return Err(ServiceError::Configuration(format!(
            "{name} is required and must not be empty"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(field: &str, chat: &str) -> Config {
        Config {
            encryption_secret: field.into(),
            chat_encryption_secret: chat.into(),
            log_level: default_log_level(),
        }
    }

    #[test]
    fn defaults() {
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn missing_field_secret_is_config_error() {
        let err = cfg("", "chatkey").field_secret().unwrap_err();
        assert!(matches!(err, ServiceError::Configuration(_)));
        assert!(err.to_string().contains("ENCRYPTION_SECRET"));
    }

    #[test]
    fn missing_chat_secret_is_config_error() {
        let err = cfg("topsecret", "").chat_secret().unwrap_err();
        assert!(err.to_string().contains("CHAT_ENCRYPTION_SECRET"));
    }

    #[test]
    fn whitespace_secret_is_accepted() {
        let c = cfg(" ", "\t");
        assert_eq!(c.field_secret().unwrap(), " ");
        assert_eq!(c.chat_secret().unwrap(), "\t");
    }

    #[test]
    fn secrets_available_independently() {
        let c = cfg("topsecret", "");
        assert_eq!(c.field_secret().unwrap(), "topsecret");
        assert!(c.chat_secret().is_err());
    }

    #[test]
    fn debug_hides_secrets() {
        let out = format!("{:?}", cfg("topsecret", ""));
        assert!(!out.contains("topsecret"));
        assert!(out.contains("REDACTED"));
        assert!(out.contains("<unset>"));
    }
}
