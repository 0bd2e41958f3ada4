//! # Node Configuration
//!
//! Ledger settings plus the identity of the network and its root account.

use podium_ledger::{LedgerConfig, LedgerError};
use serde::{Deserialize, Serialize};

/// POD minted to the root account when a network is first launched.
pub const DEFAULT_INITIAL_MINT: i64 = 1_000_000;

/// Root account created on first launch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootAccount {
    /// User id of the root account.
    pub id: String,
    /// Display name written to the root profile.
    pub name: String,
    /// Bio written to the root profile.
    pub bio: String,
    /// Text of the network's first post.
    pub first_post: String,
}

impl Default for RootAccount {
    fn default() -> Self {
        Self {
            id: "podium".to_string(),
            name: "Podium".to_string(),
            bio: "The root account of this network".to_string(),
            first_post: "Welcome to Podium".to_string(),
        }
    }
}

/// Node configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Ledger access settings. `network_id` is replaced by the live network
    /// record at launch.
    pub ledger: LedgerConfig,

    /// Application name, first segment of every network id.
    pub network_name: String,

    /// Application version, second segment of every network id.
    pub network_version: String,

    /// Root account settings.
    pub root: RootAccount,

    /// POD minted to the root account on first launch.
    pub initial_mint: i64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            ledger: LedgerConfig::default(),
            network_name: "podium".to_string(),
            network_version: "alpha".to_string(),
            root: RootAccount::default(),
            initial_mint: DEFAULT_INITIAL_MINT,
        }
    }
}

impl NodeConfig {
    /// Create a config for testing (shorter timings).
    pub fn for_testing() -> Self {
        Self {
            ledger: LedgerConfig::for_testing(),
            network_version: "test".to_string(),
            initial_mint: 5_000,
            ..Self::default()
        }
    }

    /// Load from `PODIUM_*` environment variables.
    pub fn from_env() -> Result<Self, LedgerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    ///
    /// `PODIUM_NETWORK_ID` is optional here; it defaults to the first
    /// iteration of the configured network.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LedgerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name) = non_empty(lookup("PODIUM_NETWORK_NAME")) {
            config.network_name = name;
        }
        if let Some(version) = non_empty(lookup("PODIUM_NETWORK_VERSION")) {
            config.network_version = version;
        }

        let fallback_id = config.network_id(0);
        config.ledger = LedgerConfig::from_lookup(|key| {
            lookup(key).or_else(|| (key == "PODIUM_NETWORK_ID").then(|| fallback_id.clone()))
        })?;

        if let Some(id) = non_empty(lookup("PODIUM_ROOT_ID")) {
            config.root.id = id;
        }
        if let Some(name) = non_empty(lookup("PODIUM_ROOT_NAME")) {
            config.root.name = name;
        }
        if let Some(bio) = lookup("PODIUM_ROOT_BIO") {
            config.root.bio = bio;
        }
        if let Some(post) = non_empty(lookup("PODIUM_FIRST_POST")) {
            config.root.first_post = post;
        }
        if let Some(raw) = lookup("PODIUM_INITIAL_MINT") {
            config.initial_mint = raw.trim().parse().map_err(|_| {
                LedgerError::EnvironmentMisconfigured(format!(
                    "PODIUM_INITIAL_MINT=`{raw}` is not a number"
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the bootstrap cannot work with.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.root.id.trim().is_empty() || self.root.first_post.is_empty() {
            return Err(LedgerError::EnvironmentMisconfigured(
                "root id and first post must not be empty".into(),
            ));
        }
        if self.network_name.contains('|') || self.network_version.contains('|') {
            return Err(LedgerError::EnvironmentMisconfigured(
                "network name and version must not contain `|`".into(),
            ));
        }
        if self.initial_mint < 0 {
            return Err(LedgerError::EnvironmentMisconfigured(format!(
                "initial mint must not be negative (got {})",
                self.initial_mint
            )));
        }
        Ok(())
    }

    /// Network id of iteration `subversion`: `<name>|<version>|<n>`.
    pub fn network_id(&self, subversion: u64) -> String {
        format!("{}|{}|{}", self.network_name, self.network_version, subversion)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<&str, &str> = vars.iter().copied().collect();
        move |key: &str| vars.get(key).map(|v| v.to_string())
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = NodeConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.ledger.network_id, "podium|alpha|0");
        assert_eq!(config.root.id, "podium");
        assert_eq!(config.initial_mint, DEFAULT_INITIAL_MINT);
    }

    #[test]
    fn test_root_overrides() {
        let config = NodeConfig::from_lookup(lookup_from(&[
            ("PODIUM_ROOT_ID", "admin"),
            ("PODIUM_ROOT_NAME", "Admin"),
            ("PODIUM_ROOT_BIO", ""),
            ("PODIUM_FIRST_POST", "hello"),
            ("PODIUM_INITIAL_MINT", "42"),
            ("PODIUM_TIMEOUT_MS", "500"),
        ]))
        .unwrap();
        assert_eq!(config.root.id, "admin");
        assert_eq!(config.root.name, "Admin");
        assert_eq!(config.root.bio, "");
        assert_eq!(config.root.first_post, "hello");
        assert_eq!(config.initial_mint, 42);
        assert_eq!(config.ledger.timeout_ms, 500);
    }

    #[test]
    fn test_blank_root_id_keeps_default() {
        let config = NodeConfig::from_lookup(lookup_from(&[("PODIUM_ROOT_ID", "  ")])).unwrap();
        assert_eq!(config.root.id, "podium");
    }

    #[test]
    fn test_bad_mint_rejected() {
        let err = NodeConfig::from_lookup(lookup_from(&[("PODIUM_INITIAL_MINT", "lots")]))
            .unwrap_err();
        assert_eq!(err.code(), 900);
        assert!(err.to_string().contains("PODIUM_INITIAL_MINT"));

        let err = NodeConfig::from_lookup(lookup_from(&[("PODIUM_INITIAL_MINT", "-1")]))
            .unwrap_err();
        assert!(matches!(err, LedgerError::EnvironmentMisconfigured(_)));
    }

    #[test]
    fn test_separator_in_name_rejected() {
        let err = NodeConfig::from_lookup(lookup_from(&[("PODIUM_NETWORK_NAME", "a|b")]))
            .unwrap_err();
        assert!(matches!(err, LedgerError::EnvironmentMisconfigured(_)));
    }

    #[test]
    fn test_network_id_format() {
        let config = NodeConfig::for_testing();
        assert_eq!(config.network_id(3), "podium|test|3");
    }
}
