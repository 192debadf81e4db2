// src/config/loader.rs

//! # Configuration Loader
//!
//! Reads `lddrv.toml` next to the executable. The file is optional: without
//! it every setting takes its default.

use std::{fs, io::ErrorKind, path::Path};

use super::model::{Config, ConfigError};

/// File name looked up in the executable's directory.
pub const CONFIG_FILE: &str = "lddrv.toml";

/// Load and validate the configuration at `path`.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let txt = fs::read_to_string(path)?;
    let cfg: Config = toml::from_str(&txt)?;
    if cfg.service.display_name.trim().is_empty() {
        return Err(ConfigError::EmptyDisplayName);
    }
    Ok(cfg)
}

/// Like [`load`], but a missing file yields the defaults.
pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
    match load(path) {
        Err(ConfigError::Io(e)) if e.kind() == ErrorKind::NotFound => Ok(Config::default()),
        other => other,
    }
}
