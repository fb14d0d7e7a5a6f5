//! Configuration for hubly
//!
//! Centralized configuration for the HTTP listener, storage location, desk
//! behavior, and the administrator created on first start.

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::settings::DEFAULT_MISSED_CHAT_THRESHOLD_SECONDS;
use crate::staff::NewStaff;

/// System-wide configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HublyConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Storage settings
    pub database: DatabaseConfig,
    /// Desk behavior settings
    pub desk: DeskConfig,
    /// Administrator to create when the roster has none
    pub admin: Option<AdminBootstrap>,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind
    pub addr: String,
    /// Allowed browser origin; `None` allows any
    pub cors_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8080".to_string(),
            cors_origin: None,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Desk behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    /// Threshold seeded into the widget settings when none are stored yet
    pub default_missed_chat_threshold_seconds: u32,
    /// Attempts for a versioned ticket write before giving up with a conflict
    pub max_write_retries: u32,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            default_missed_chat_threshold_seconds: DEFAULT_MISSED_CHAT_THRESHOLD_SECONDS,
            max_write_retries: 5,
        }
    }
}

/// Administrator bootstrap record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminBootstrap {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

impl From<AdminBootstrap> for NewStaff {
    fn from(admin: AdminBootstrap) -> Self {
        NewStaff {
            first_name: admin.first_name,
            last_name: admin.last_name,
            email: admin.email,
            phone: admin.phone,
        }
    }
}

/// `<data dir>/hubly/hubly.sqlite`, or the working directory when the
/// platform has no data dir
pub fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("hubly"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hubly.sqlite")
}

impl HublyConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Load config from JSON string
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    /// Serialize config to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parsed listener address
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .addr
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("server.addr: {}", self.server.addr)))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;

        if self.desk.default_missed_chat_threshold_seconds == 0 {
            return Err(ConfigError::OutOfRange(
                "desk.default_missed_chat_threshold_seconds must be positive".to_string(),
            ));
        }

        if self.desk.max_write_retries == 0 {
            return Err(ConfigError::OutOfRange(
                "desk.max_write_retries must be at least 1".to_string(),
            ));
        }

        if let Some(admin) = &self.admin {
            for (name, value) in [
                ("admin.first_name", &admin.first_name),
                ("admin.last_name", &admin.last_name),
                ("admin.email", &admin.email),
            ] {
                if value.trim().is_empty() {
                    return Err(ConfigError::MissingField(name.to_string()));
                }
            }
        }

        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ConfigError {
    InvalidValue(String),
    OutOfRange(String),
    MissingField(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid value: {}", msg),
            ConfigError::OutOfRange(msg) => write!(f, "Value out of range: {}", msg),
            ConfigError::MissingField(msg) => write!(f, "Missing field: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
