//! Configuration loader and validator for the marketplace client.
//!
//! Read once at startup (a page load in the hosting shell) and fixed for the
//! lifetime of the session.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub api: Api,
    pub chat: Chat,
}

/// App-level settings: where persisted blobs live and how their keys are
/// prefixed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    pub namespace: String,
}

/// Backend REST API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Api {
    pub base_url: String,
    /// Generous by default; the backend cold-starts slowly.
    pub timeout_seconds: u64,
    pub page_size: u32,
}

/// Chat/notification transport settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chat {
    /// WebSocket origin, e.g. `ws://localhost:8000`. Empty means push mode
    /// is unavailable in this environment.
    pub ws_url: String,
    pub push_enabled: bool,
    pub poll_interval_ms: u64,
    pub reconnect_base_ms: u64,
    pub reconnect_max_secs: u64,
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.namespace.trim().is_empty() {
        return Err(ConfigError::Invalid("app.namespace must be non-empty"));
    }

    if cfg.api.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("api.base_url must be non-empty"));
    }
    if cfg.api.timeout_seconds == 0 {
        return Err(ConfigError::Invalid("api.timeout_seconds must be > 0"));
    }
    if cfg.api.page_size == 0 {
        return Err(ConfigError::Invalid("api.page_size must be > 0"));
    }

    if cfg.chat.poll_interval_ms == 0 {
        return Err(ConfigError::Invalid("chat.poll_interval_ms must be > 0"));
    }
    if cfg.chat.reconnect_base_ms == 0 {
        return Err(ConfigError::Invalid("chat.reconnect_base_ms must be > 0"));
    }
    if cfg.chat.push_enabled {
        let ws = cfg.chat.ws_url.trim();
        if ws.is_empty() {
            return Err(ConfigError::Invalid(
                "chat.ws_url must be non-empty when chat.push_enabled is true",
            ));
        }
        if !ws.starts_with("ws://") && !ws.starts_with("wss://") {
            return Err(ConfigError::Invalid(
                "chat.ws_url must start with ws:// or wss://",
            ));
        }
    }
    // reconnect_max_secs is u64; zero simply disables the backoff growth cap

    Ok(())
}

/// Example configuration, also used as a fixture by tests.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  namespace: "thriftgram"

api:
  base_url: "http://localhost:8000/api"
  timeout_seconds: 90
  page_size: 20

chat:
  ws_url: "ws://localhost:8000"
  push_enabled: true
  poll_interval_ms: 5000
  reconnect_base_ms: 1000
  reconnect_max_secs: 60
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_example_ok() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        validate(&cfg).unwrap();
    }

    #[test]
    fn invalid_namespace() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.namespace = "".into();
        let err = validate(&cfg).unwrap_err();
        match err { ConfigError::Invalid(msg) => assert!(msg.contains("app.namespace")), _ => panic!("wrong error") }
    }

    #[test]
    fn invalid_api_settings() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.api.base_url = "".into();
        let err = validate(&cfg).unwrap_err();
        match err { ConfigError::Invalid(msg) => assert!(msg.contains("api.base_url")), _ => panic!("wrong error") }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.api.page_size = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.api.timeout_seconds = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn push_mode_requires_ws_url() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.chat.ws_url = "".into();
        let err = validate(&cfg).unwrap_err();
        match err { ConfigError::Invalid(msg) => assert!(msg.contains("chat.ws_url")), _ => panic!("wrong error") }

        // Poll-only configuration is fine without a socket origin.
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.chat.ws_url = "".into();
        cfg.chat.push_enabled = false;
        validate(&cfg).unwrap();
    }

    #[test]
    fn ws_url_scheme_is_checked() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.chat.ws_url = "http://localhost:8000".into();
        let err = validate(&cfg).unwrap_err();
        match err { ConfigError::Invalid(msg) => assert!(msg.contains("ws://")), _ => panic!("wrong error") }
    }

    #[test]
    fn ensure_dirs_creates_data_dir() {
        let td = tempdir().unwrap();
        let data_path = td.path().join("data");
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.data_dir = data_path.to_string_lossy().to_string();
        cfg.ensure_dirs().unwrap();
        assert!(data_path.exists());
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, example()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.api.page_size, 20);
        assert_eq!(cfg.chat.poll_interval_ms, 5000);
    }
}
