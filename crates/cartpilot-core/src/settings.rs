//! Engine settings.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// Default configuration constants
pub const DEFAULT_SERVER_URL: &str = "https://api.cartpilot.dev";
const DEFAULT_CACHE_TTL_SECONDS: u64 = 6 * 60 * 60; // 6 hours
const DEFAULT_ACK_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_MAX_CONFIG_MAJOR: u64 = 1;
const MIN_ACK_TIMEOUT_MS: u64 = 10;

/// Settings shared by the transport client, the config cache and the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Base URL of the config service, without a trailing slash.
    pub server_url: String,
    pub client_id: String,
    /// Pre-shared key the config service seals its bodies with.
    pub shared_key: String,
    pub cache_ttl_seconds: u64,
    /// Forward page `log` records to the telemetry sink.
    pub diagnostics: bool,
    pub ack_timeout_ms: u64,
    /// Highest config schema major this host understands.
    pub max_config_major: u64,
    /// Drop the persisted state when the page reports a terminal progress.
    pub clear_persisted_on_terminal: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            client_id: String::new(),
            shared_key: String::new(),
            cache_ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
            diagnostics: false,
            ack_timeout_ms: DEFAULT_ACK_TIMEOUT_MS,
            max_config_major: DEFAULT_MAX_CONFIG_MAJOR,
            clear_persisted_on_terminal: false,
        }
    }
}

impl EngineSettings {
    pub fn new(
        server_url: impl Into<String>,
        client_id: impl Into<String>,
        shared_key: impl Into<String>,
    ) -> Self {
        Self {
            server_url: server_url.into(),
            client_id: client_id.into(),
            shared_key: shared_key.into(),
            ..Self::default()
        }
    }

    pub fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl_seconds = ttl.as_secs();
        self
    }

    pub fn with_clear_persisted_on_terminal(mut self, enabled: bool) -> Self {
        self.clear_persisted_on_terminal = enabled;
        self
    }

    pub fn cache_ttl_millis(&self) -> i64 {
        i64::try_from(self.cache_ttl_seconds.saturating_mul(1_000)).unwrap_or(i64::MAX)
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let server = url::Url::parse(&self.server_url)
            .map_err(|err| anyhow::anyhow!("Invalid server URL '{}': {}", self.server_url, err))?;
        if !matches!(server.scheme(), "http" | "https") {
            return Err(anyhow::anyhow!(
                "Server URL must use http or https, got '{}'",
                server.scheme()
            ));
        }

        if self.client_id.trim().is_empty() {
            return Err(anyhow::anyhow!("Client id must not be empty"));
        }

        if self.shared_key.is_empty() {
            return Err(anyhow::anyhow!("Shared key must not be empty"));
        }

        if self.cache_ttl_seconds == 0 {
            return Err(anyhow::anyhow!("Cache TTL must be at least 1 second"));
        }

        if self.ack_timeout_ms < MIN_ACK_TIMEOUT_MS {
            return Err(anyhow::anyhow!(
                "Ack timeout must be at least {} ms",
                MIN_ACK_TIMEOUT_MS
            ));
        }

        Ok(())
    }
}
