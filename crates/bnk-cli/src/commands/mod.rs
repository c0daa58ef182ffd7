//! Subcommands and the paths they share.

pub mod cache;
pub mod config;
pub mod convert;

use std::path::{Path, PathBuf};

use bnk_core::ConverterConfig;

/// `<config dir>/bnk/config.json`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bnk")
        .join("config.json")
}

/// `<data dir>/bnk/cache.json`.
pub fn default_cache_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bnk")
        .join("cache.json")
}

/// Explicit config file, else the default file if present, else defaults.
pub fn load_config(path: Option<&str>) -> anyhow::Result<ConverterConfig> {
    if let Some(path) = path {
        return Ok(ConverterConfig::from_file(Path::new(path))?);
    }
    let default_path = default_config_path();
    if default_path.exists() {
        Ok(ConverterConfig::from_file(&default_path)?)
    } else {
        Ok(ConverterConfig::default())
    }
}
