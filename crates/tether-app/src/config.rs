//! TOML configuration loading.
//!
//! Loads `config.toml` from the OS config directory, creating a
//! commented default on first run. Missing fields use defaults so
//! partial configs work out of the box.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use tether_common::ConfigError;
use tether_sync::RetryPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub base_ms: u64,
    pub cap_ms: u64,
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_ms: 1000,
            cap_ms: 30_000,
            max_attempts: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TetherConfig {
    /// Base URL of the agent server.
    pub server_url: String,
    /// Session archive root; platform data dir when unset.
    pub data_dir: Option<PathBuf>,
    /// How many sessions the picker registry keeps.
    pub session_cap: usize,
    pub reconnect: ReconnectConfig,
}

impl Default for TetherConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".into(),
            data_dir: None,
            session_cap: 20,
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl TetherConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_millis(self.reconnect.base_ms),
            Duration::from_millis(self.reconnect.cap_ms),
            self.reconnect.max_attempts,
        )
    }
}

/// Load config from a specific TOML file path.
pub fn load_from_path(path: &Path) -> Result<TetherConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ParseError(format!("failed to read {}: {e}", path.display())))?;

    let config: TetherConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

    info!("loaded config from {}", path.display());
    Ok(config)
}

/// Load config from the platform default path, creating a default file
/// if none exists.
pub fn load_config() -> Result<TetherConfig, ConfigError> {
    let path = default_config_path()?;

    if !path.exists() {
        info!("no config found at {}, creating default", path.display());
        create_default_config(&path)?;
        return Ok(TetherConfig::default());
    }

    load_from_path(&path)
}

/// Platform default: `<config_dir>/tether/config.toml`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::ParseError("could not determine config directory".into()))?;
    Ok(config_dir.join("tether").join("config.toml"))
}

pub(crate) fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ConfigError::ParseError(format!(
                "failed to create config directory {}: {e}",
                parent.display()
            ))
        })?;
    }

    std::fs::write(path, default_config_toml()).map_err(|e| {
        ConfigError::ParseError(format!(
            "failed to write default config to {}: {e}",
            path.display()
        ))
    })?;

    info!("created default config at {}", path.display());
    Ok(())
}

fn default_config_toml() -> &'static str {
    r##"# Tether configuration
# Only override what you want to change -- missing fields use defaults.

# server_url = "http://127.0.0.1:8000"

# Session archive location (platform data dir when unset).
# data_dir = "/path/to/tether/sessions"

# How many sessions the picker registry keeps.
# session_cap = 20

[reconnect]
# base_ms = 1000
# cap_ms = 30000
# max_attempts = 5
"##
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = TetherConfig::default();
        assert_eq!(config.server_url, "http://127.0.0.1:8000");
        assert_eq!(config.session_cap, 20);

        let policy = config.retry_policy();
        assert_eq!(policy.base, Duration::from_millis(1000));
        assert_eq!(policy.cap, Duration::from_millis(30_000));
        assert_eq!(policy.max_attempts, 5);
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "server_url = \"http://example.com\"\n\n[reconnect]\nmax_attempts = 3\n",
        )
        .unwrap();

        let config = load_from_path(&path).unwrap();
        assert_eq!(config.server_url, "http://example.com");
        assert_eq!(config.reconnect.max_attempts, 3);
        assert_eq!(config.reconnect.base_ms, 1000);
        assert_eq!(config.session_cap, 20);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_from_path(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "server_url = [not toml").unwrap();

        let err = load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn default_template_parses_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        create_default_config(&path).unwrap();

        let config = load_from_path(&path).unwrap();
        assert_eq!(config.server_url, TetherConfig::default().server_url);
        assert_eq!(config.reconnect.max_attempts, 5);
    }
}
