//! CLI configuration file support
//!
//! Loads configuration from ~/.config/cartpilot/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use cartpilot_core::EngineSettings;

use crate::cli::ConnectionArgs;

/// CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Config service connection
    #[serde(default)]
    pub server: ServerConfig,
    /// Engine tuning
    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub url: Option<String>,
    pub client_id: Option<String>,
    pub key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub cache_ttl_seconds: Option<u64>,
    pub ack_timeout_ms: Option<u64>,
    pub diagnostics: Option<bool>,
    pub max_config_major: Option<u64>,
    pub clear_persisted_on_terminal: Option<bool>,
}

impl CliConfig {
    /// Load configuration from default path
    pub fn load() -> Self {
        Self::load_from_path(Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: Option<PathBuf>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Get the default configuration file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cartpilot").join("config.toml"))
    }

    /// Engine settings: flags and env first, then the file, then defaults.
    pub fn engine_settings(&self, overrides: &ConnectionArgs) -> EngineSettings {
        let mut settings = EngineSettings::default();

        if let Some(url) = overrides.server.as_ref().or(self.server.url.as_ref()) {
            settings.server_url = url.trim_end_matches('/').to_string();
        }
        if let Some(client_id) = overrides.client_id.as_ref().or(self.server.client_id.as_ref()) {
            settings.client_id = client_id.clone();
        }
        if let Some(key) = overrides.key.as_ref().or(self.server.key.as_ref()) {
            settings.shared_key = key.clone();
        }

        let engine = &self.engine;
        if let Some(ttl) = engine.cache_ttl_seconds {
            settings.cache_ttl_seconds = ttl;
        }
        if let Some(timeout) = engine.ack_timeout_ms {
            settings.ack_timeout_ms = timeout;
        }
        if let Some(diagnostics) = engine.diagnostics {
            settings.diagnostics = diagnostics;
        }
        if let Some(major) = engine.max_config_major {
            settings.max_config_major = major;
        }
        if let Some(clear) = engine.clear_persisted_on_terminal {
            settings.clear_persisted_on_terminal = clear;
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::load_from_path(Some(dir.path().join("absent.toml")));
        assert!(config.server.url.is_none());
        assert_eq!(
            config.engine_settings(&ConnectionArgs::default()),
            EngineSettings::default()
        );
    }

    #[test]
    fn test_invalid_toml_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "server = [not toml").unwrap();
        let config = CliConfig::load_from_path(Some(path));
        assert!(config.server.client_id.is_none());
    }

    #[test]
    fn test_file_values_reach_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[server]
url = "https://config.example/"
client_id = "ops"
key = "secret"

[engine]
cache_ttl_seconds = 60
diagnostics = true
"#,
        )
        .unwrap();

        let settings = CliConfig::load_from_path(Some(path)).engine_settings(&ConnectionArgs::default());
        assert_eq!(settings.server_url, "https://config.example");
        assert_eq!(settings.client_id, "ops");
        assert_eq!(settings.shared_key, "secret");
        assert_eq!(settings.cache_ttl_seconds, 60);
        assert!(settings.diagnostics);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_flags_override_file() {
        let config = CliConfig {
            server: ServerConfig {
                url: Some("https://file.example".into()),
                client_id: Some("from-file".into()),
                key: Some("file-key".into()),
            },
            engine: EngineConfig::default(),
        };
        let overrides = ConnectionArgs {
            server: None,
            client_id: Some("from-flag".into()),
            key: None,
        };

        let settings = config.engine_settings(&overrides);
        assert_eq!(settings.server_url, "https://file.example");
        assert_eq!(settings.client_id, "from-flag");
        assert_eq!(settings.shared_key, "file-key");
    }
}
