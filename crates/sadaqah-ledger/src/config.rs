//! Ledger configuration.
//!
//! Values come from an optional JSON file (`SADAQAH_CONFIG_FILE`), then
//! individual environment variables override single fields.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sadaqah_core::MissingRatePolicy;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

/// Default canonical currency code (one gram of gold).
pub const DEFAULT_CANONICAL_CURRENCY: &str = "XAU";

/// Default number of commit attempts per transition.
pub const DEFAULT_MAX_COMMIT_ATTEMPTS: u32 = 5;

/// Ledger and cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Path to the `RocksDB` data directory (default: "/data/sadaqah").
    pub data_dir: String,

    /// Code of the currency box totals are kept in (default: "XAU").
    pub canonical_currency: String,

    /// What to do when a currency has no reference rate.
    pub missing_rate_policy: MissingRatePolicy,

    /// Currency cache TTL in seconds.
    pub currency_cache_ttl_secs: u64,

    /// Currency type cache TTL in seconds.
    pub currency_type_cache_ttl_secs: u64,

    /// Tag cache TTL in seconds.
    pub tag_cache_ttl_secs: u64,

    /// Maximum entries per cache.
    pub cache_capacity: u64,

    /// How many times a transition is attempted before `WriteConflict`.
    pub max_commit_attempts: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: "/data/sadaqah".into(),
            canonical_currency: DEFAULT_CANONICAL_CURRENCY.into(),
            missing_rate_policy: MissingRatePolicy::FailClosed,
            currency_cache_ttl_secs: 300,
            currency_type_cache_ttl_secs: 3600,
            tag_cache_ttl_secs: 600,
            cache_capacity: 10_000,
            max_commit_attempts: DEFAULT_MAX_COMMIT_ATTEMPTS,
        }
    }
}

impl LedgerConfig {
    /// Load configuration from the optional config file and environment.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Configuration` if the config file cannot be read
    /// or a variable holds an unparsable value.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var("SADAQAH_CONFIG_FILE") {
            Ok(path) => {
                tracing::info!(path = %path, "Loading ledger config file");
                Self::from_file(&path)?
            }
            Err(_) => Self::default(),
        };

        if let Ok(dir) = std::env::var("SADAQAH_DATA_DIR") {
            config.data_dir = dir;
        }
        if let Ok(code) = std::env::var("SADAQAH_CANONICAL_CURRENCY") {
            config.canonical_currency = code.trim().to_uppercase();
        }
        config.missing_rate_policy =
            env_parse("SADAQAH_MISSING_RATE_POLICY", config.missing_rate_policy)?;
        config.currency_cache_ttl_secs =
            env_parse("SADAQAH_CURRENCY_CACHE_TTL_SECS", config.currency_cache_ttl_secs)?;
        config.currency_type_cache_ttl_secs = env_parse(
            "SADAQAH_CURRENCY_TYPE_CACHE_TTL_SECS",
            config.currency_type_cache_ttl_secs,
        )?;
        config.tag_cache_ttl_secs = env_parse("SADAQAH_TAG_CACHE_TTL_SECS", config.tag_cache_ttl_secs)?;
        config.cache_capacity = env_parse("SADAQAH_CACHE_CAPACITY", config.cache_capacity)?;
        config.max_commit_attempts =
            env_parse("SADAQAH_MAX_COMMIT_ATTEMPTS", config.max_commit_attempts)?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Configuration` if the file is unreadable or invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            LedgerError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&contents).map_err(|e| {
            LedgerError::Configuration(format!("invalid config {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the ledger cannot run with.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Configuration` describing the first bad field.
    pub fn validate(&self) -> Result<()> {
        if self.canonical_currency.trim().is_empty() {
            return Err(LedgerError::Configuration(
                "canonical_currency must not be empty".into(),
            ));
        }
        if self.max_commit_attempts == 0 {
            return Err(LedgerError::Configuration(
                "max_commit_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Currency cache TTL.
    #[must_use]
    pub const fn currency_ttl(&self) -> Duration {
        Duration::from_secs(self.currency_cache_ttl_secs)
    }

    /// Currency type cache TTL.
    #[must_use]
    pub const fn currency_type_ttl(&self) -> Duration {
        Duration::from_secs(self.currency_type_cache_ttl_secs)
    }

    /// Tag cache TTL.
    #[must_use]
    pub const fn tag_ttl(&self) -> Duration {
        Duration::from_secs(self.tag_cache_ttl_secs)
    }
}

/// Parse an environment variable, keeping `current` when it is unset.
fn env_parse<T>(name: &str, current: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| LedgerError::Configuration(format!("{name}: {e}"))),
        Err(_) => Ok(current),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = LedgerConfig::default();
        assert_eq!(config.canonical_currency, "XAU");
        assert_eq!(config.missing_rate_policy, MissingRatePolicy::FailClosed);
        assert_eq!(config.currency_ttl(), Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn file_fills_missing_fields_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"canonical_currency": "XAG", "missing_rate_policy": "zero_contribution"}}"#
        )
        .unwrap();

        let config = LedgerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.canonical_currency, "XAG");
        assert_eq!(
            config.missing_rate_policy,
            MissingRatePolicy::ZeroContribution
        );
        assert_eq!(config.max_commit_attempts, DEFAULT_MAX_COMMIT_ATTEMPTS);
    }

    #[test]
    fn zero_attempts_rejected() {
        let config = LedgerConfig {
            max_commit_attempts: 0,
            ..LedgerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(LedgerError::Configuration(_))
        ));
    }

    #[test]
    fn unreadable_file_is_configuration_error() {
        let err = LedgerConfig::from_file("/nonexistent/sadaqah.json").unwrap_err();
        assert!(matches!(err, LedgerError::Configuration(_)));
    }
}
