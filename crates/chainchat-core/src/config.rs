//! Environment-driven configuration for chainchat.
//!
//! Values are read from the process environment after `.env` has been
//! loaded with `dotenvy`. Command-line flags may override individual
//! fields before [`ChainchatConfig::validate`] is called.
//!
//! Environment variables:
//! - `CHAINCHAT_HOME` (default: `$HOME/.chainchat`, or `./.chainchat`)
//! - `CHAINCHAT_KEYSTORE` (default: `$CHAINCHAT_HOME/keystore.json`)
//! - `CHAINCHAT_SCOPE` (optional local identity, e.g. a wallet address)
//! - `CHAINCHAT_SEALED` (default: false)
//! - `CHAINCHAT_PASSPHRASE` (required when sealed)
//! - `LOG_FORMAT` - "text" or "json" (default: "text")
//! - `LOG_FILE` - path to a log file (optional)
//! - `LOG_ANSI` - "true"/"false" override for ANSI colors

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{ConfigError, Result};

/// Directory name used under `$HOME` when `CHAINCHAT_HOME` is unset.
pub const DEFAULT_HOME_DIR: &str = ".chainchat";

/// Key store file name used under the home directory.
pub const DEFAULT_KEYSTORE_FILE: &str = "keystore.json";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidValue {
                key: "LOG_FORMAT".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogConfig {
    /// Output format.
    pub format: LogFormat,
    /// Optional log file; when set, logs go to a daily-rotated file.
    pub file: Option<PathBuf>,
    /// ANSI color override (auto-detected when `None`).
    pub ansi: Option<bool>,
}

/// Top-level configuration for the chainchat CLI and embedders.
#[derive(Clone)]
pub struct ChainchatConfig {
    /// Base directory for local state.
    pub home_dir: PathBuf,
    /// Path of the key store document.
    pub keystore_path: PathBuf,
    /// Local identity scope (normalized lower-case), if any.
    pub scope: Option<String>,
    /// Whether the key store is sealed with a passphrase.
    pub sealed: bool,
    /// Passphrase for a sealed key store.
    pub passphrase: Option<String>,
    /// Logging settings.
    pub log: LogConfig,
}

impl fmt::Debug for ChainchatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainchatConfig")
            .field("home_dir", &self.home_dir)
            .field("keystore_path", &self.keystore_path)
            .field("scope", &self.scope)
            .field("sealed", &self.sealed)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "[REDACTED]"))
            .field("log", &self.log)
            .finish()
    }
}

impl ChainchatConfig {
    /// Loads `.env` (if present) into the process environment, then reads it.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Constructs configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Constructs configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let home_dir = match non_empty(lookup("CHAINCHAT_HOME")) {
            Some(dir) => PathBuf::from(dir),
            None => non_empty(lookup("HOME"))
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."))
                .join(DEFAULT_HOME_DIR),
        };

        let keystore_path = non_empty(lookup("CHAINCHAT_KEYSTORE"))
            .map(PathBuf::from)
            .unwrap_or_else(|| home_dir.join(DEFAULT_KEYSTORE_FILE));

        let scope = lookup("CHAINCHAT_SCOPE").and_then(|s| normalize_scope(&s));

        let sealed = parse_bool(lookup("CHAINCHAT_SEALED"), false);
        let passphrase = non_empty(lookup("CHAINCHAT_PASSPHRASE"));

        let format = match non_empty(lookup("LOG_FORMAT")) {
            Some(value) => value.parse()?,
            None => LogFormat::default(),
        };
        let file = non_empty(lookup("LOG_FILE")).map(PathBuf::from);
        let ansi = lookup("LOG_ANSI").map(|v| parse_bool(Some(v), false));

        Ok(Self {
            home_dir,
            keystore_path,
            scope,
            sealed,
            passphrase,
            log: LogConfig { format, file, ansi },
        })
    }

    /// Checks cross-field requirements after overrides have been applied.
    pub fn validate(&self) -> Result<()> {
        if self.sealed && self.passphrase.is_none() {
            return Err(ConfigError::Missing(
                "CHAINCHAT_PASSPHRASE is required for a sealed key store".to_string(),
            ));
        }
        Ok(())
    }
}

/// Normalizes an identity scope: trimmed and lower-cased, `None` when empty.
///
/// Wallet addresses are case-insensitive but often appear checksummed in
/// mixed case.
pub fn normalize_scope(scope: &str) -> Option<String> {
    let trimmed = scope.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parses a boolean setting with a default fallback.
///
/// Recognizes "true", "1", "yes", "on" and "false", "0", "no", "off"
/// (case-insensitive). Any other value or a missing variable returns the
/// default.
fn parse_bool(value: Option<String>, default: bool) -> bool {
    value
        .and_then(|val| match val.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}
