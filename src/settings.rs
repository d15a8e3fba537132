//! Sync configuration
//!
//! The data half of the plugin options: everything that can be written down
//! in a JSON document. Hooks (reader, writer, merge, ...) are set on
//! [`crate::SyncOptions`] in code.

use serde::{Deserialize, Serialize};

use crate::error::SyncResult;

/// Storage key used when none is configured
pub const DEFAULT_KEY: &str = "store";

/// Serializable plugin settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncConfig {
    /// Lookup key in storage
    pub key: String,
    /// State paths to persist (None = whole state)
    pub paths: Option<Vec<String>>,
    /// Replace state with the snapshot instead of merging
    pub overwrite: bool,
    /// Read storage at construction rather than at attach
    pub fetch_before_use: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            key: DEFAULT_KEY.to_string(),
            paths: None,
            overwrite: false,
            fetch_before_use: false,
        }
    }
}

impl SyncConfig {
    /// Parse from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> SyncResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        log::debug!("Loaded sync config for key '{}'", config.key);
        Ok(config)
    }

    pub fn to_json(&self) -> SyncResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.key, "store");
        assert!(config.paths.is_none());
        assert!(!config.overwrite);
        assert!(!config.fetch_before_use);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SyncConfig::from_json(r#"{"paths": ["a.b", "c"], "fetchBeforeUse": true}"#)
            .unwrap();
        assert_eq!(config.key, "store");
        assert_eq!(config.paths, Some(vec!["a.b".to_string(), "c".to_string()]));
        assert!(config.fetch_before_use);
    }

    #[test]
    fn test_json_round_trip() {
        let config = SyncConfig {
            key: "app".into(),
            paths: Some(vec!["user".into()]),
            overwrite: true,
            fetch_before_use: false,
        };
        let json = config.to_json().unwrap();
        assert_eq!(SyncConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let err = SyncConfig::from_json("{\"key\": 3}").unwrap_err();
        assert!(matches!(err, SyncError::InvalidConfig(_)));
    }
}
