use std::path::Path;

use reach_oid::Version;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// How the store allocates identifiers for newly persisted objects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierStrategy {
    /// A counter per logical type: `CUS:1`, `CUS:2`, ...
    #[default]
    Sequence,
    /// Time-ordered UUID v7 strings.
    Uuid,
}

/// Configuration for an [`InMemoryStore`](crate::InMemoryStore).
///
/// ```toml
/// identifier_strategy = "uuid"
/// user = "sven"
/// stamp_time = false
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub identifier_strategy: IdentifierStrategy,
    /// User stamped into every version the store produces.
    pub user: Option<String>,
    /// Whether versions carry the UTC time they were produced at.
    pub stamp_time: bool,
    /// Sequence of a freshly created object's first version.
    pub initial_sequence: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            identifier_strategy: IdentifierStrategy::Sequence,
            user: None,
            stamp_time: true,
            initial_sequence: 1,
        }
    }
}

impl StoreConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(input: &str) -> StoreResult<Self> {
        let config: Self = toml::from_str(input).map_err(|e| StoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the store could not encode into a version.
    pub fn validate(&self) -> StoreResult<()> {
        if let Some(user) = &self.user {
            Version::validate_user(user).map_err(|e| StoreError::Config(e.to_string()))?;
        }
        Ok(())
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> StoreResult<String> {
        toml::to_string(self).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Deterministic configuration: sequence identifiers, no timestamps.
    pub fn deterministic() -> Self {
        Self {
            stamp_time: false,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        assert_eq!(StoreConfig::from_toml_str("").unwrap(), StoreConfig::default());
    }

    #[test]
    fn parses_every_key() {
        let config = StoreConfig::from_toml_str(
            r#"
            identifier_strategy = "uuid"
            user = "sven"
            stamp_time = false
            initial_sequence = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.identifier_strategy, IdentifierStrategy::Uuid);
        assert_eq!(config.user.as_deref(), Some("sven"));
        assert!(!config.stamp_time);
        assert_eq!(config.initial_sequence, 10);
    }

    #[test]
    fn unknown_strategy_is_a_config_error() {
        let err = StoreConfig::from_toml_str(r#"identifier_strategy = "random""#).unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn unencodable_user_is_a_config_error() {
        for user in ["a:b", "a~b", ""] {
            let err = StoreConfig::from_toml_str(&format!("user = {user:?}")).unwrap_err();
            match err {
                StoreError::Config(message) => assert!(message.contains("version user"), "{message}"),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn toml_roundtrip() {
        let config = StoreConfig {
            user: Some("joe".into()),
            ..StoreConfig::deterministic()
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(StoreConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = StoreConfig::load("/nonexistent/reach/store.toml").unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
