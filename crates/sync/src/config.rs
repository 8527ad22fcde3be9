//! Synchronizer configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// When the rebuilt tree is re-hashed and compared with the target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    Off,
    /// Only in builds with debug assertions
    #[default]
    Debug,
    Always,
}

impl ValidationMode {
    pub fn is_enabled(self) -> bool {
        match self {
            ValidationMode::Off => false,
            ValidationMode::Debug => cfg!(debug_assertions),
            ValidationMode::Always => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// More changed documents than this in one collection are fetched in bulk
    pub bulk_document_threshold: usize,

    pub validate: ValidationMode,

    /// Languages that can be materialized here (empty means all)
    pub supported_languages: Vec<String>,

    /// Log a warning for every project skipped as unsupported
    pub warn_on_skipped_projects: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            bulk_document_threshold: 2,
            validate: ValidationMode::Debug,
            supported_languages: Vec::new(),
            warn_on_skipped_projects: true,
        }
    }
}

impl SyncConfig {
    /// Parse a `[sync]`-style table body
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: SyncConfig = toml::from_str(toml_str).map_err(|e| ConfigError::Parse {
            path: "<string>".to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text).map_err(|err| match err {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.supported_languages.iter().any(|l| l.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                field: "supported_languages",
                message: "language names must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn supports_language(&self, language: &str) -> bool {
        self.supported_languages.is_empty()
            || self.supported_languages.iter().any(|l| l == language)
    }
}
