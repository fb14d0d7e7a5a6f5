//! Configuration loading for the server binary

use std::path::{Path, PathBuf};

use thiserror::Error;

use hubly_core::config::ConfigError;
use hubly_core::HublyConfig;

/// Path of an optional config file
pub const CONFIG_ENV: &str = "HUBLY_CONFIG";
/// Listen address override
pub const ADDR_ENV: &str = "HUBLY_ADDR";
/// Database path override
pub const DB_ENV: &str = "HUBLY_DB";

/// Errors raised while loading configuration
#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(#[from] ConfigError),
}

/// Build a config from an optional file plus overrides, then validate it
///
/// Files ending in `.json` are parsed as JSON, anything else as TOML.
pub fn load_from(
    path: Option<&Path>,
    addr_override: Option<String>,
    db_override: Option<PathBuf>,
) -> Result<HublyConfig, ConfigLoadError> {
    let mut config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            if path.extension().is_some_and(|ext| ext == "json") {
                HublyConfig::from_json(&text)?
            } else {
                HublyConfig::from_toml(&text)?
            }
        }
        None => HublyConfig::default(),
    };

    if let Some(addr) = addr_override {
        config.server.addr = addr;
    }
    if let Some(db) = db_override {
        config.database.path = db;
    }

    config.validate()?;
    Ok(config)
}

/// Resolve configuration from `HUBLY_CONFIG`, `HUBLY_ADDR` and `HUBLY_DB`
pub fn load_config() -> Result<HublyConfig, ConfigLoadError> {
    let path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
    let addr = std::env::var(ADDR_ENV).ok();
    let db = std::env::var_os(DB_ENV).map(PathBuf::from);
    load_from(path.as_deref(), addr, db)
}
