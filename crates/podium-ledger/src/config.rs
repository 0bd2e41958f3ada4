//! # Ledger Configuration
//!
//! Timings and network settings for the access layer.

use crate::domain::LedgerError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default hard timeout for history queries (ms).
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default idle lifetime for subscriptions (ms).
pub const DEFAULT_CONNECTION_LIFETIME_MS: u64 = 60_000;

/// Characters per post chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 128;

/// POD granted to every new user.
pub const DEFAULT_INITIAL_GRANT: i64 = 1000;

/// Ledger access configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Application/network identifier submitted with every write.
    pub network_id: String,

    /// Hard timeout for history queries in milliseconds. Zero disables it.
    pub timeout_ms: u64,

    /// Idle lifetime of subscriptions in milliseconds. Zero keeps them open.
    pub connection_lifetime_ms: u64,

    /// Attempts to open a log connection before a history query gives up.
    pub open_retries: u32,

    /// Pause between connection attempts in milliseconds.
    pub open_retry_delay_ms: u64,

    /// Post chunk size in characters.
    pub chunk_size: usize,

    /// POD granted to each new user.
    pub initial_grant: i64,

    /// Verbose logging.
    pub debug: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            network_id: "podium|alpha|0".to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            connection_lifetime_ms: DEFAULT_CONNECTION_LIFETIME_MS,
            open_retries: 3,
            open_retry_delay_ms: 250,
            chunk_size: DEFAULT_CHUNK_SIZE,
            initial_grant: DEFAULT_INITIAL_GRANT,
            debug: false,
        }
    }
}

impl LedgerConfig {
    /// Create a config for testing (shorter timings).
    pub fn for_testing() -> Self {
        Self {
            network_id: "podium|test|0".to_string(),
            timeout_ms: 3_000,
            connection_lifetime_ms: 5_000,
            open_retries: 2,
            open_retry_delay_ms: 10,
            debug: true,
            ..Self::default()
        }
    }

    /// Load from `PODIUM_*` environment variables.
    ///
    /// `PODIUM_NETWORK_ID` is required.
    pub fn from_env() -> Result<Self, LedgerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LedgerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        config.network_id = lookup("PODIUM_NETWORK_ID")
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                LedgerError::EnvironmentMisconfigured("PODIUM_NETWORK_ID not set".into())
            })?;

        if let Some(raw) = lookup("PODIUM_TIMEOUT_MS") {
            config.timeout_ms = parse_var("PODIUM_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = lookup("PODIUM_LIFETIME_MS") {
            config.connection_lifetime_ms = parse_var("PODIUM_LIFETIME_MS", &raw)?;
        }
        if let Some(raw) = lookup("PODIUM_DEBUG") {
            config.debug = matches!(raw.as_str(), "1" | "true" | "yes");
        }

        Ok(config)
    }

    /// Hard history timeout, `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    /// Subscription idle lifetime (zero means no expiry).
    pub fn connection_lifetime(&self) -> Duration {
        Duration::from_millis(self.connection_lifetime_ms)
    }

    /// Pause between connection attempts.
    pub fn open_retry_delay(&self) -> Duration {
        Duration::from_millis(self.open_retry_delay_ms)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, LedgerError> {
    raw.trim()
        .parse()
        .map_err(|_| LedgerError::EnvironmentMisconfigured(format!("{key}=`{raw}` is not a number")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::default();
        assert_eq!(config.timeout(), Some(Duration::from_secs(10)));
        assert_eq!(config.connection_lifetime(), Duration::from_secs(60));
        assert_eq!(config.chunk_size, 128);
    }

    #[test]
    fn test_zero_timeout_disables() {
        let config = LedgerConfig {
            timeout_ms: 0,
            ..LedgerConfig::for_testing()
        };
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_missing_network_id_is_fatal() {
        let err = LedgerConfig::from_lookup(|_| None).unwrap_err();
        assert!(matches!(err, LedgerError::EnvironmentMisconfigured(_)));
        assert_eq!(err.code(), 900);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PODIUM_NETWORK_ID", "podium|beta|4"),
            ("PODIUM_TIMEOUT_MS", "2500"),
            ("PODIUM_DEBUG", "true"),
        ]
        .into_iter()
        .collect();
        let config = LedgerConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.network_id, "podium|beta|4");
        assert_eq!(config.timeout_ms, 2500);
        assert!(config.debug);
        assert_eq!(config.connection_lifetime_ms, DEFAULT_CONNECTION_LIFETIME_MS);
    }

    #[test]
    fn test_bad_number_rejected() {
        let err = LedgerConfig::from_lookup(|k| match k {
            "PODIUM_NETWORK_ID" => Some("x".into()),
            "PODIUM_LIFETIME_MS" => Some("soon".into()),
            _ => None,
        })
        .unwrap_err();
        assert!(err.to_string().contains("PODIUM_LIFETIME_MS"));
    }
}
