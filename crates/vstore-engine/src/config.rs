use std::path::Path;

use serde::{Deserialize, Serialize};
use vstore_lock::LockConfig;

/// Errors loading a [`VStoreConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Engine settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VStoreConfig {
    /// Upper bound for any template's binary `max_size`, in bytes.
    pub max_binary_size: i64,
    /// Topic receiving object-version-creating events.
    pub object_events_topic: String,
    /// Page size of template and object listings.
    pub list_batch_size: usize,
    /// Concurrent validation tasks and binary lookups per operation.
    pub validation_concurrency: usize,
    pub lock: LockConfig,
}

impl Default for VStoreConfig {
    fn default() -> Self {
        Self {
            max_binary_size: 10 * 1024 * 1024,
            object_events_topic: "vstore.objects".into(),
            list_batch_size: 1000,
            validation_concurrency: 16,
            lock: LockConfig::default(),
        }
    }
}

impl VStoreConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_binary_size <= 0 {
            return Err(ConfigError::Invalid("max_binary_size must be positive".into()));
        }
        if self.list_batch_size == 0 {
            return Err(ConfigError::Invalid("list_batch_size must be positive".into()));
        }
        if self.validation_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "validation_concurrency must be positive".into(),
            ));
        }
        if self.object_events_topic.trim().is_empty() {
            return Err(ConfigError::Invalid("object_events_topic must be set".into()));
        }
        Ok(())
    }
}
