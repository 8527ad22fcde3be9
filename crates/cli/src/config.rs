//! Process configuration
//!
//! Read from `replica.toml` in the working directory, or from the file
//! given with `--config`. Every table is optional.
//!
//! ```toml
//! [sync]
//! bulk_document_threshold = 2
//! validate = "always"
//! supported_languages = ["C#"]
//!
//! [log]
//! level = "info"
//! ```

use anyhow::{Context, Result};
use replica_sync::SyncConfig;
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "replica.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub sync: SyncConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl CliConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: CliConfig = toml::from_str(text)?;
        config.sync.validate()?;
        Ok(config)
    }
}

/// Load the explicit config file, or `replica.toml` if present, or defaults
pub fn load(explicit: Option<&Path>) -> Result<CliConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if !default.exists() {
                return Ok(CliConfig::default());
            }
            default.to_path_buf()
        }
    };

    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    CliConfig::from_toml(&text).with_context(|| format!("Invalid config {}", path.display()))
}
