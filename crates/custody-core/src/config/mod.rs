//! Configuration parsing and management.
//!
//! A custody deployment is described by a TOML file with four optional
//! sections: where the ledger lives, who the local submitter is, which
//! custodians a case may be handed to, and how hard a client retries on a
//! conflicting commit.
//!
//! ```toml
//! [ledger]
//! path = "custody-ledger.db"
//! history_batch_size = 64
//!
//! [identity]
//! org_id = "Org1"
//! client_id = "appUser"
//!
//! [custody]
//! policy = "allow_list"
//! allowed_custodians = ["Forensics_Lab", "District_Court"]
//!
//! [client]
//! max_conflict_retries = 3
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::case::CustodianPolicy;
use crate::ledger::DEFAULT_HISTORY_BATCH_SIZE;

/// Top-level custody configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustodyConfig {
    /// Ledger storage settings.
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Identity of the local submitter.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Custody transfer rules.
    #[serde(default)]
    pub custody: CustodyRulesConfig,

    /// Client-side submission behavior.
    #[serde(default)]
    pub client: ClientConfig,
}

impl CustodyConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails [`Self::validate`].
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Checks cross-field constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if:
    /// - `identity.org_id` is empty
    /// - `ledger.history_batch_size` is zero
    /// - the allow-list policy is selected with no allowed custodians
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identity.org_id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "identity.org_id must not be empty".to_string(),
            ));
        }
        if self.ledger.history_batch_size == 0 {
            return Err(ConfigError::Validation(
                "ledger.history_batch_size must be at least 1".to_string(),
            ));
        }
        if self.custody.policy == PolicyKind::AllowList
            && self.custody.allowed_custodians.is_empty()
        {
            return Err(ConfigError::Validation(
                "custody.policy = \"allow_list\" requires at least one entry in \
                 allowed_custodians"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Builds the custodian policy described by the `[custody]` section.
    ///
    /// `allowed_custodians` is ignored under the permissive policy.
    #[must_use]
    pub fn custodian_policy(&self) -> CustodianPolicy {
        match self.custody.policy {
            PolicyKind::Permissive => CustodianPolicy::Permissive,
            PolicyKind::AllowList => {
                CustodianPolicy::allow_list(self.custody.allowed_custodians.iter().cloned())
            },
        }
    }
}

/// Ledger storage settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// Path to the `SQLite` ledger file.
    #[serde(default = "default_ledger_path")]
    pub path: PathBuf,

    /// Versions fetched per round trip when walking a history.
    #[serde(default = "default_history_batch_size")]
    pub history_batch_size: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: default_ledger_path(),
            history_batch_size: default_history_batch_size(),
        }
    }
}

/// Identity of the local submitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    /// Organization recorded as custodian on case creation.
    #[serde(default = "default_org_id")]
    pub org_id: String,

    /// Individual client within the organization.
    #[serde(default = "default_client_id")]
    pub client_id: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            org_id: default_org_id(),
            client_id: default_client_id(),
        }
    }
}

/// Which custodian policy to enforce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Any identifier is accepted.
    #[default]
    Permissive,
    /// Only `allowed_custodians` are accepted.
    AllowList,
}

/// Custody transfer rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustodyRulesConfig {
    /// Policy applied to `transferCustody` targets.
    #[serde(default)]
    pub policy: PolicyKind,

    /// Accepted targets under [`PolicyKind::AllowList`].
    #[serde(default)]
    pub allowed_custodians: Vec<String>,
}

/// Client-side submission behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Resubmissions allowed after a conflicting commit. Zero disables retry.
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: default_max_conflict_retries(),
        }
    }
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("custody-ledger.db")
}

const fn default_history_batch_size() -> u64 {
    DEFAULT_HISTORY_BATCH_SIZE
}

fn default_org_id() -> String {
    "Org1".to_string()
}

fn default_client_id() -> String {
    "appUser".to_string()
}

const fn default_max_conflict_retries() -> u32 {
    3
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error reading configuration file.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Validation error.
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = CustodyConfig::from_toml("").unwrap();
        assert_eq!(config, CustodyConfig::default());
        assert_eq!(config.ledger.path, PathBuf::from("custody-ledger.db"));
        assert_eq!(config.ledger.history_batch_size, DEFAULT_HISTORY_BATCH_SIZE);
        assert_eq!(config.identity.org_id, "Org1");
        assert_eq!(config.client.max_conflict_retries, 3);
        assert_eq!(config.custodian_policy(), CustodianPolicy::Permissive);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [ledger]
            path = "/var/lib/custody/ledger.db"
            history_batch_size = 16

            [identity]
            org_id = "Org2"
            client_id = "analyst"

            [custody]
            policy = "allow_list"
            allowed_custodians = ["Forensics_Lab", "District_Court"]

            [client]
            max_conflict_retries = 0
        "#;

        let config = CustodyConfig::from_toml(toml).unwrap();
        assert_eq!(
            config.ledger.path,
            PathBuf::from("/var/lib/custody/ledger.db")
        );
        assert_eq!(config.ledger.history_batch_size, 16);
        assert_eq!(config.identity.org_id, "Org2");
        assert_eq!(config.identity.client_id, "analyst");
        assert_eq!(config.client.max_conflict_retries, 0);

        let policy = config.custodian_policy();
        assert!(policy.permits("District_Court"));
        assert!(!policy.permits("Org3"));
    }

    #[test]
    fn test_reject_empty_org_id() {
        let err = CustodyConfig::from_toml("[identity]\norg_id = \"  \"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref msg) if msg.contains("org_id")));
    }

    #[test]
    fn test_reject_zero_batch_size() {
        let err = CustodyConfig::from_toml("[ledger]\nhistory_batch_size = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_reject_empty_allow_list() {
        let err = CustodyConfig::from_toml("[custody]\npolicy = \"allow_list\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref msg) if msg.contains("allowed_custodians")));
    }

    #[test]
    fn test_permissive_ignores_allowed_list() {
        let toml = r#"
            [custody]
            policy = "permissive"
            allowed_custodians = ["Forensics_Lab"]
        "#;
        let config = CustodyConfig::from_toml(toml).unwrap();
        assert!(config.custodian_policy().permits("anyone"));
    }

    #[test]
    fn test_reject_unknown_keys() {
        let err = CustodyConfig::from_toml("[ledger]\npth = \"typo.db\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_reject_unknown_policy() {
        let err = CustodyConfig::from_toml("[custody]\npolicy = \"anything\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = CustodyConfig::default();
        config.custody.policy = PolicyKind::AllowList;
        config.custody.allowed_custodians = vec!["Forensics_Lab".to_string()];

        let text = config.to_toml().unwrap();
        assert_eq!(CustodyConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("custody.toml");
        std::fs::write(&path, "[identity]\norg_id = \"Org3\"\n").unwrap();

        let config = CustodyConfig::from_file(&path).unwrap();
        assert_eq!(config.identity.org_id, "Org3");

        let missing = CustodyConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io(_)));
    }
}
