//! Configuration file handling
//!
//! Supports JSON and TOML files, picked by extension. A configuration is
//! validated after every load and before every save.
//!
//! ```toml
//! name = "iZZi ERV 300"
//! extract_correction = 10
//! bypass_mode = "auto"
//! bypass_temp = 23
//! role = "master"
//!
//! [connection]
//! type = "tcp"
//! host = "192.168.1.40"
//! port = 8234
//! ```

use crate::error::{ConfigError, Result, SettingsError};
use izzifast_core::{BypassMode, Role};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default TCP port of the serial-to-Ethernet bridge
pub const DEFAULT_PORT: u16 = 8234;
/// Default display name of the unit
pub const DEFAULT_NAME: &str = "iZZi ERV 300";
/// Default bypass temperature (°C)
pub const DEFAULT_BYPASS_TEMP: i32 = 23;

/// Accepted extract correction window (%)
pub const EXTRACT_CORRECTION_RANGE: std::ops::RangeInclusive<i32> = -20..=20;
/// Accepted configured bypass temperature window (°C)
pub const BYPASS_TEMP_RANGE: std::ops::RangeInclusive<i32> = 17..=24;

/// Connection protocol type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    /// TCP bridge
    Tcp,
    /// Local serial device
    Serial,
}

impl std::fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionType::Tcp => write!(f, "tcp"),
            ConnectionType::Serial => write!(f, "serial"),
        }
    }
}

/// Where the unit's bus is reachable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    #[serde(rename = "type")]
    pub connection_type: ConnectionType,
    /// Bridge host, required for TCP
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Device path, required for serial
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

impl ConnectionSettings {
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self {
            connection_type: ConnectionType::Tcp,
            host: Some(host.into()),
            port,
            device: None,
        }
    }

    pub fn serial(device: impl Into<String>) -> Self {
        Self {
            connection_type: ConnectionType::Serial,
            host: None,
            port: DEFAULT_PORT,
            device: Some(device.into()),
        }
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self::tcp("localhost", DEFAULT_PORT)
    }
}

/// Complete izzifast configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Display name of the unit
    #[serde(default = "default_name")]
    pub name: String,
    /// Percentage taken off one fan to balance the airflow
    ///
    /// Positive values slow the supply fan. Negative values raise the extract
    /// fan by the same share.
    #[serde(default)]
    pub extract_correction: i32,
    /// Bypass mode applied on startup
    #[serde(default)]
    pub bypass_mode: BypassMode,
    /// Bypass temperature applied on startup (°C)
    #[serde(default = "default_bypass_temp")]
    pub bypass_temp: i32,
    /// Whether this controller drives the bus or only listens
    #[serde(default)]
    pub role: Role,
    pub connection: ConnectionSettings,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}

fn default_bypass_temp() -> i32 {
    DEFAULT_BYPASS_TEMP
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: default_name(),
            extract_correction: 0,
            bypass_mode: BypassMode::default(),
            bypass_temp: DEFAULT_BYPASS_TEMP,
            role: Role::default(),
            connection: ConnectionSettings::default(),
        }
    }
}

/// File formats a configuration can be stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Toml,
}

impl Format {
    fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Format::Json),
            Some("toml") => Ok(Format::Toml),
            _ => Err(ConfigError::UnsupportedFormat(format!(
                "{} (expected .json or .toml)",
                path.display()
            ))
            .into()),
        }
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Platform config location: `<config dir>/izzifast/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("izzifast").join("config.toml"))
            .ok_or_else(|| {
                SettingsError::ConfigDirectory("no configuration directory on this platform".into())
            })
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let format = Format::from_path(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| SettingsError::LoadError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    ///
    /// Missing parent directories are created.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        self.validate()?;

        let content = match Format::from_path(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content).map_err(|e| SettingsError::SaveError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        match self.connection.connection_type {
            ConnectionType::Tcp => {
                if is_blank(&self.connection.host) {
                    return Err(ConfigError::MissingKey("connection.host".to_string()));
                }
                if self.connection.port == 0 {
                    return Err(ConfigError::ValueOutOfRange {
                        key: "connection.port".to_string(),
                        value: "0".to_string(),
                    });
                }
            }
            ConnectionType::Serial => {
                if is_blank(&self.connection.device) {
                    return Err(ConfigError::MissingKey("connection.device".to_string()));
                }
            }
        }

        if self.name.trim().is_empty() {
            return Err(ConfigError::MissingKey("name".to_string()));
        }

        if !EXTRACT_CORRECTION_RANGE.contains(&self.extract_correction) {
            return Err(ConfigError::ValueOutOfRange {
                key: "extract_correction".to_string(),
                value: self.extract_correction.to_string(),
            });
        }

        if !BYPASS_TEMP_RANGE.contains(&self.bypass_temp) {
            return Err(ConfigError::ValueOutOfRange {
                key: "bypass_temp".to_string(),
                value: self.bypass_temp.to_string(),
            });
        }

        Ok(())
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}
