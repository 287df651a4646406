//! Configuration types for the gateway.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{GatewayError, Result};

/// Environment variable overriding the backend base URL.
pub const ENV_BASE_URL: &str = "LIGHTRAG_BASE_URL";
/// Environment variable carrying the backend API key.
pub const ENV_API_KEY: &str = "LIGHTRAG_API_KEY";
/// Environment variable overriding the request timeout, in seconds.
pub const ENV_TIMEOUT: &str = "LIGHTRAG_TIMEOUT";

/// Main configuration for the gateway.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Backend connection configuration.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Identity reported to MCP clients.
    #[serde(default)]
    pub server: ServerConfig,
}

/// Backend connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the LightRAG HTTP service.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key sent as `X-API-Key`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Whole-exchange timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl BackendConfig {
    /// Request timeout as a Duration.
    ///
    /// Fails for zero, negative, non-finite and out-of-range values.
    pub fn timeout(&self) -> Result<Duration> {
        let secs = self.timeout_secs;
        if secs <= 0.0 {
            return Err(GatewayError::config(format!(
                "backend timeout must be a positive number of seconds, got {}",
                secs
            )));
        }
        Duration::try_from_secs_f64(secs).map_err(|e| {
            GatewayError::config(format!("backend timeout of {} seconds is unusable: {}", secs, e))
        })
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server name reported on `initialize`.
    #[serde(default = "default_server_name")]
    pub name: String,

    /// Server version reported on `initialize`.
    #[serde(default = "default_server_version")]
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            version: default_server_version(),
        }
    }
}

// Default value functions

fn default_base_url() -> String {
    "http://localhost:9621".to_string()
}

fn default_timeout_secs() -> f64 {
    30.0
}

fn default_server_name() -> String {
    "lightrag-mcp".to_string()
}

fn default_server_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

impl GatewayConfig {
    /// Load configuration from file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| GatewayError::Config {
            message: format!("Failed to parse config {}: {}", path.display(), e),
        })?;
        Ok(config)
    }

    /// Load configuration from default paths.
    pub fn load_default() -> Result<Self> {
        // Try user config first
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("lightrag-mcp").join("config.toml");
            if user_config.exists() {
                return Self::load(&user_config);
            }
        }

        // Try local config
        let local_config = PathBuf::from("lightrag-mcp.toml");
        if local_config.exists() {
            return Self::load(&local_config);
        }

        Ok(Self::default())
    }

    /// Apply `LIGHTRAG_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.backend.base_url = url.trim().to_string();
        }
        if let Some(key) = lookup(ENV_API_KEY).filter(|v| !v.is_empty()) {
            self.backend.api_key = Some(key);
        }
        if let Some(raw) = lookup(ENV_TIMEOUT) {
            self.backend.timeout_secs = raw.trim().parse().map_err(|_| {
                GatewayError::config(format!("{} must be a number of seconds, got {:?}", ENV_TIMEOUT, raw))
            })?;
        }
        Ok(())
    }

    /// Check values the backend client relies on.
    pub fn validate(&self) -> Result<()> {
        let url = self.backend.base_url.as_str();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(GatewayError::config(format!(
                "backend base_url must be an http(s) URL, got {:?}",
                url
            )));
        }
        self.backend.timeout()?;
        Ok(())
    }
}
