//! Well-known filesystem locations.
//!
//! Everything lives under `~/.whoop` unless `WHOOP_CONFIG_DIR` points
//! somewhere else.

use std::path::PathBuf;

use crate::error::{ConfigError, Result};

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "WHOOP_CONFIG_DIR";

/// Directory name under the home directory.
pub const APP_DIR: &str = ".whoop";

pub const LOG_DIR: &str = "logs";

/// Resolve the config directory from the process environment.
pub fn config_dir() -> Result<PathBuf> {
    config_dir_with(|key| std::env::var(key).ok())
}

/// Resolve the config directory through `lookup` instead of the process
/// environment.
pub fn config_dir_with(lookup: impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
    if let Some(dir) = lookup(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(APP_DIR))
        .ok_or(ConfigError::NoHomeDir(CONFIG_DIR_ENV))
}
