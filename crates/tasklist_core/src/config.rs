//! Store configuration.
//!
//! The only knob is the key under which the full task list is stored.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Key used by earlier builds of the app; keeping it preserves their data.
pub const DEFAULT_STORAGE_KEY: &str = "tasks";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Fixed key holding the serialized task list.
    pub storage_key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

impl StoreConfig {
    pub fn with_storage_key(storage_key: impl Into<String>) -> Self {
        Self {
            storage_key: storage_key.into(),
        }
    }

    /// # Errors
    /// - Returns `ConfigError::EmptyStorageKey` for an empty or blank key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_key.trim().is_empty() {
            return Err(ConfigError::EmptyStorageKey);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyStorageKey,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyStorageKey => write!(f, "storage key cannot be empty"),
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::{ConfigError, StoreConfig, DEFAULT_STORAGE_KEY};

    #[test]
    fn default_config_uses_legacy_key() {
        let config = StoreConfig::default();
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn blank_storage_key_is_rejected() {
        let err = StoreConfig::with_storage_key("  ").validate().unwrap_err();
        assert_eq!(err, ConfigError::EmptyStorageKey);
    }
}
