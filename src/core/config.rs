//! Configuration management

use anyhow::{Context, Result};
use controller_tools_protocol::{DEFAULT_BACKEND_HOST, DEFAULT_BACKEND_PORT};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Backend connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Host the backend listens on
    #[serde(default = "default_host")]
    pub host: String,
    /// Port shared by the HTTP and WebSocket endpoints
    #[serde(default = "default_port")]
    pub port: u16,
    /// Timeout for snapshot requests in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_host() -> String {
    DEFAULT_BACKEND_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_BACKEND_PORT
}
fn default_request_timeout() -> u64 {
    5000
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

impl BackendConfig {
    pub fn ws_url(&self) -> String {
        controller_tools_protocol::ws_url(&self.host, self.port)
    }

    pub fn controllers_url(&self) -> String {
        controller_tools_protocol::controllers_url(&self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Notification channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Title shown on every toast
    #[serde(default = "default_title")]
    pub title: String,
    /// Delay between a closed connection and the next attempt, in milliseconds
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,
}

fn default_title() -> String {
    crate::PRODUCT_NAME.to_string()
}
fn default_reconnect_delay() -> u64 {
    10_000
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            reconnect_delay_ms: default_reconnect_delay(),
        }
    }
}

impl NotificationConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

/// Panel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Minimum time a manual refresh stays in the loading state, in milliseconds
    #[serde(default = "default_refresh_settle")]
    pub refresh_settle_ms: u64,
}

fn default_refresh_settle() -> u64 {
    275
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            refresh_settle_ms: default_refresh_settle(),
        }
    }
}

impl PanelConfig {
    pub fn refresh_settle(&self) -> Duration {
        Duration::from_millis(self.refresh_settle_ms)
    }
}

/// Settings store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsConfig {
    /// Path of the JSON settings file (platform data dir when unset)
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub panel: PanelConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
            Self::from_toml(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", config_path))
        } else {
            // Return default config if file doesn't exist
            Ok(Config::default())
        }
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid configuration")
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs = project_dirs()?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Resolve the JSON settings file path
    pub fn settings_path(&self) -> Result<PathBuf> {
        match &self.settings.path {
            Some(path) => Ok(path.clone()),
            None => Ok(project_dirs()?.data_dir().join("settings.json")),
        }
    }

    /// Get the default configuration embedded in the binary
    pub fn default_config_str() -> &'static str {
        include_str!("../../config/default.toml")
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("io.github", "controllertools", "ControllerTools")
        .context("Failed to determine config directory")
}
