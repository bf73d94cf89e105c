// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{HarnessConfig, RawHarnessConfig};
use crate::errors::Result;

pub const CONFIG_ENV_VAR: &str = "RDB_HARNESS_CONFIG";

/// Load a configuration file from a given path and return the raw
/// `RawHarnessConfig`.
///
/// This only performs TOML deserialization; it does **not** parse durations
/// or check mode tags. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawHarnessConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawHarnessConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<HarnessConfig> {
    let raw_config = load_from_path(&path)?;
    let config = HarnessConfig::try_from(raw_config)?;
    Ok(config)
}

/// Default config location: `$RDB_HARNESS_CONFIG`, else `Harness.toml` in the
/// current working directory.
pub fn default_config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("Harness.toml"))
}

/// Load `path` when it exists, otherwise fall back to defaults.
///
/// An explicitly requested file that is missing is still an error; only the
/// implicit default may be absent.
pub fn load_or_default(path: Option<&Path>) -> Result<HarnessConfig> {
    match path {
        Some(path) => load_and_validate(path),
        None => {
            let path = default_config_path();
            if path.is_file() {
                load_and_validate(&path)
            } else {
                Ok(HarnessConfig::default())
            }
        }
    }
}
