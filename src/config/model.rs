// src/config/model.rs

use serde::Deserialize;
use thiserror::Error;

use crate::registry::DEFAULT_DISPLAY_NAME;

/// Top-level runtime config
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)] pub logging: LoggingConfig,
    #[serde(default)] pub service: ServiceSettings,
}

/// Mirror of the `[logging]` table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default)]                   pub enable: bool,
    #[serde(default)]                   pub file:   Option<String>,
    #[serde(default = "default_level")] pub level:  String,
}
fn default_level() -> String { "INFO".into() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { enable: false, file: None, level: default_level() }
    }
}

/// Mirror of the `[service]` table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceSettings {
    #[serde(default = "default_display_name")] pub display_name: String,
}
fn default_display_name() -> String { DEFAULT_DISPLAY_NAME.into() }

impl Default for ServiceSettings {
    fn default() -> Self {
        Self { display_name: default_display_name() }
    }
}

/// All the ways config loading can go wrong
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("display name must not be empty")]
    EmptyDisplayName,
}
