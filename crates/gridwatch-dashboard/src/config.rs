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
    pub backend: BackendConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the backend REST API
    #[serde(default = "default_backend_url")]
    pub url: String,
    /// Request timeout in seconds; unset keeps the transport default
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            timeout_secs: None,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

fn default_backend_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Snapshot poll interval in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

fn default_interval_ms() -> u64 {
    2500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Incident log entries kept in memory
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
        }
    }
}

fn default_max_entries() -> usize {
    200
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.poll.interval(), Duration::from_millis(2500));
        assert_eq!(config.backend.timeout(), None);
        assert_eq!(config.log.max_entries, 200);
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gridwatch.toml");
        std::fs::write(
            &path,
            "[backend]\nurl = \"http://10.0.0.5:8000\"\ntimeout_secs = 5\n\n[poll]\ninterval_ms = 1000\n",
        )
        .unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.backend.url, "http://10.0.0.5:8000");
        assert_eq!(config.backend.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.poll.interval_ms, 1000);
    }

    #[test]
    fn test_unknown_sections_are_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gridwatch.toml");
        std::fs::write(&path, "[notifications]\nexpiry_secs = 0\n\n[log]\nmax_entries = 50\n")
            .unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.log.max_entries, 50);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.backend.url, "http://127.0.0.1:8000");
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[poll]\ninterval_ms = \"fast\"\n").unwrap();
        assert!(load_config(&path).is_err());
    }
}
