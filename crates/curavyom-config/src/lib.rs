//! Configuration loading for CuraVyom.
//!
//! Precedence, lowest first: built-in defaults, the config file
//! (`curavyom.toml` or the path in `CURAVYOM_CONFIG`), then environment
//! overrides (`CURAVYOM_API_URL`, `CURAVYOM_WS_URL`, `CURAVYOM_BIND`).
//! A `.env` file is read first when present.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

mod endpoints;

pub use endpoints::Endpoints;

pub const CONFIG_PATH_VAR: &str = "CURAVYOM_CONFIG";
pub const API_URL_VAR: &str = "CURAVYOM_API_URL";
pub const WS_URL_VAR: &str = "CURAVYOM_WS_URL";
pub const BIND_VAR: &str = "CURAVYOM_BIND";
pub const DEFAULT_CONFIG_FILE: &str = "curavyom.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io { path: String, source: std::io::Error },

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid URL for {field}: {source}")]
    InvalidUrl { field: &'static str, source: url::ParseError },

    #[error("Unsupported scheme '{scheme}' for {field} (expected {expected})")]
    UnsupportedScheme { field: &'static str, scheme: String, expected: &'static str },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CuravyomConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub session: SessionSettings,
}

/// HTTP API of Agent Core (upload, contact, subscribe).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_url")]
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { base_url: default_api_url() }
    }
}

fn default_api_url() -> String { "http://localhost:8000".to_string() }

/// Streaming (WebSocket) side of Agent Core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    #[serde(default = "default_ws_url")]
    pub base_url: String,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self { base_url: default_ws_url() }
    }
}

fn default_ws_url() -> String { "ws://localhost:8000".to_string() }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self { bind: default_bind(), static_dir: default_static_dir() }
    }
}

fn default_bind()       -> String { "127.0.0.1:3000".to_string() }
fn default_static_dir() -> String { "static".to_string() }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// How long the orchestrator stays `Active` after a response.
    #[serde(default = "default_pulse_ms")]
    pub agent_pulse_ms: u64,
    /// Grace period for the socket close handshake on unmount.
    #[serde(default = "default_close_grace_ms")]
    pub close_grace_ms: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self { agent_pulse_ms: default_pulse_ms(), close_grace_ms: default_close_grace_ms() }
    }
}

fn default_pulse_ms()       -> u64 { 2_000 }
fn default_close_grace_ms() -> u64 { 1_000 }

impl CuravyomConfig {
    /// Load `.env`, the config file and environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }

        let mut config = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_path(&path)?,
            Err(_) if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_path(DEFAULT_CONFIG_FILE)?,
            Err(_) => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Read a config file; `.yaml`/`.yml` are parsed as YAML, anything else as TOML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            _ => Self::from_toml_str(&content),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply overrides from an environment-style lookup. Empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(API_URL_VAR) {
            self.api.base_url = v;
        }
        if let Some(v) = get(WS_URL_VAR) {
            self.stream.base_url = v;
        }
        if let Some(v) = get(BIND_VAR) {
            self.web.bind = v;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_scheme("api.base_url", &self.api.base_url, &["http", "https"], "http or https")?;
        check_scheme("stream.base_url", &self.stream.base_url, &["ws", "wss"], "ws or wss")?;
        Ok(())
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints::from_bases(&self.api.base_url, &self.stream.base_url)
    }

    pub fn agent_pulse(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.session.agent_pulse_ms)
    }

    pub fn close_grace(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.session.close_grace_ms)
    }
}

fn check_scheme(
    field: &'static str,
    value: &str,
    allowed: &[&str],
    expected: &'static str,
) -> Result<(), ConfigError> {
    let url = url::Url::parse(value).map_err(|source| ConfigError::InvalidUrl { field, source })?;
    if allowed.contains(&url.scheme()) {
        Ok(())
    } else {
        Err(ConfigError::UnsupportedScheme { field, scheme: url.scheme().to_string(), expected })
    }
}
