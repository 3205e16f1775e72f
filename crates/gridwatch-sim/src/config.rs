//! Configuration loading

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the REST API
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Environment name reported by /health
    #[serde(default = "default_env")]
    pub env: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            env: default_env(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_env() -> String {
    "development".to_string()
}

/// Static tokens; the simulator does not issue or expire them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Operator bearer token
    #[serde(default = "default_api_token")]
    pub api_token: String,
    /// Admin token for /api/admin/*
    #[serde(default = "default_admin_token")]
    pub admin_token: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_token: default_api_token(),
            admin_token: default_admin_token(),
        }
    }
}

fn default_api_token() -> String {
    "changeme-operator-token".to_string()
}

fn default_admin_token() -> String {
    "changeme-admin-token".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Allow /api/simulate scenarios
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Telemetry pulse period in milliseconds
    #[serde(default = "default_pulse_interval_ms")]
    pub pulse_interval_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            pulse_interval_ms: default_pulse_interval_ms(),
        }
    }
}

impl SimulationConfig {
    pub fn pulse_interval(&self) -> Duration {
        Duration::from_millis(self.pulse_interval_ms.max(1))
    }
}

fn default_enabled() -> bool {
    true
}

fn default_pulse_interval_ms() -> u64 {
    2000
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}
