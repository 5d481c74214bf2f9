//! # Bridge Configuration
//!
//! Settings for the HTTP surface, the cloud endpoint, the camera, the printer
//! limits advertised to remote clients, the client notification channel and
//! logging.
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:3000"
//!
//! [cloud]
//! api_host = "https://api.astroprint.com/v2"
//!
//! [camera]
//! enabled = true
//! capabilities = ["video"]
//!
//! [printer]
//! printer_name = "workshop-mk3"
//! max_nozzle_temp = 280.0
//!
//! [log]
//! level = "debug"
//! ```
//!
//! Every field has a default, so an empty file is a valid configuration.

// src/config.rs - Single configuration file
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration struct for the bridge.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cloud: CloudConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub printer: PrinterConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

/// Cloud endpoint settings. The bridge only records outbound traffic against
/// these; the transport lives in the cloud client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CloudConfig {
    #[serde(default = "default_api_host")]
    pub api_host: String,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            api_host: default_api_host(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CameraConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_camera_capabilities")]
    pub capabilities: Vec<String>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            capabilities: default_camera_capabilities(),
        }
    }
}

/// Printer limits reported to remote clients. They never change the host's
/// own printer profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PrinterConfig {
    #[serde(default)]
    pub printer_name: Option<String>,
    #[serde(default = "default_max_nozzle_temp")]
    pub max_nozzle_temp: f64,
    #[serde(default = "default_max_bed_temp")]
    pub max_bed_temp: f64,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            printer_name: None,
            max_nozzle_temp: default_max_nozzle_temp(),
            max_bed_temp: default_max_bed_temp(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotifierConfig {
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LogConfig {
    pub fn max_level(&self) -> Result<tracing::Level, ConfigError> {
        tracing::Level::from_str(&self.level)
            .map_err(|_| ConfigError::Invalid(format!("unknown log level '{}'", self.level)))
    }
}

impl Config {
    /// Validate values serde cannot check on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.notifier.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "notifier.channel_capacity must be > 0".to_string(),
            ));
        }
        if self.printer.max_nozzle_temp <= 0.0 {
            return Err(ConfigError::Invalid(
                "printer.max_nozzle_temp must be > 0".to_string(),
            ));
        }
        if self.printer.max_bed_temp <= 0.0 {
            return Err(ConfigError::Invalid(
                "printer.max_bed_temp must be > 0".to_string(),
            ));
        }
        self.log.max_level()?;
        Ok(())
    }

    pub fn printer_name(&self) -> &str {
        self.printer.printer_name.as_deref().unwrap_or("printbridge")
    }
}

// Default value functions
fn default_bind() -> String { "0.0.0.0:3000".to_string() }
fn default_api_host() -> String { "https://api.astroprint.com/v2".to_string() }
fn default_camera_capabilities() -> Vec<String> { vec!["video".to_string()] }
fn default_max_nozzle_temp() -> f64 { 280.0 }
fn default_max_bed_temp() -> f64 { 140.0 }
fn default_channel_capacity() -> usize { 64 }
fn default_log_level() -> String { "info".to_string() }

/// Load and validate configuration from a TOML file at the given path.
pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        tracing::error!("Failed to read config file '{}': {}", path, e);
        ConfigError::Io(e)
    })?;
    let config: Config = toml::from_str(&contents).map_err(|e| {
        tracing::error!("Failed to parse config TOML: {}", e);
        ConfigError::Toml(e)
    })?;
    config.validate()?;
    Ok(config)
}
