//! Process wiring: logging, line input, and the stdout-backed collaborators
//! the commands plug into the engine.

use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use cartpilot_contracts::{AutomationConfig, DecodeError, EngineEvent, Merchant};
use cartpilot_core::bridge::dispatched_payload;
use cartpilot_storage::paths;
use cartpilot_traits::{ConfigSource, EngineObserver, EnginePhase, ScriptEnvironment};
use serde_json::json;
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::cli::OutputFormat;

/// Log to a daily file under the data dir, and to stderr when verbose.
///
/// The returned guard flushes the file writer on drop.
pub fn init_logging(verbose: bool) -> Result<WorkerGuard> {
    let log_dir = paths::logs_dir()?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "cartpilot.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .with_level(true);
    let stderr_layer = verbose.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();
    Ok(guard)
}

/// Non-blank lines from `file`, or from stdin when absent.
pub fn read_lines(file: Option<&Path>) -> Result<Vec<String>> {
    let lines = match file {
        Some(path) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            BufReader::new(file).lines().collect::<std::io::Result<Vec<_>>>()?
        }
        None => std::io::stdin()
            .lock()
            .lines()
            .collect::<std::io::Result<Vec<_>>>()
            .context("Failed to read stdin")?,
    };
    Ok(lines
        .into_iter()
        .filter(|line| !line.trim().is_empty())
        .collect())
}

/// Prints every outbound bridge message instead of evaluating it in a page.
pub struct StdoutEnvironment {
    format: OutputFormat,
}

impl StdoutEnvironment {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

#[async_trait]
impl ScriptEnvironment for StdoutEnvironment {
    async fn evaluate(&self, script: &str) -> Result<()> {
        let Some(payload) = dispatched_payload(script) else {
            debug!(bytes = script.len(), "Skipping stage script");
            return Ok(());
        };
        if self.format.is_json() {
            let message: serde_json::Value = serde_json::from_str(payload)?;
            println!("{}", json!({ "outbound": message }));
        } else {
            println!("outbound {payload}");
        }
        Ok(())
    }
}

/// Prints what the engine reports to its host.
pub struct StdoutObserver {
    format: OutputFormat,
}

impl StdoutObserver {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl EngineObserver for StdoutObserver {
    fn on_event(&self, event: &EngineEvent) {
        if self.format.is_json() {
            println!("{}", json!({ "event": event }));
        } else {
            println!("event {}", event.name());
        }
    }

    fn on_phase_change(&self, from: EnginePhase, to: EnginePhase) {
        if self.format.is_json() {
            println!("{}", json!({ "phase": { "from": from.as_str(), "to": to.as_str() } }));
        } else {
            println!("phase {from} -> {to}");
        }
    }

    fn on_decode_error(&self, error: &DecodeError) {
        if self.format.is_json() {
            println!("{}", json!({ "error": error.to_string() }));
        } else {
            println!("error {error}");
        }
    }
}

/// A config service that knows nothing; replays run without a network.
pub struct OfflineSource;

#[async_trait]
impl ConfigSource for OfflineSource {
    async fn fetch_merchants(&self) -> Vec<Merchant> {
        Vec::new()
    }

    async fn fetch_default_configs(&self) -> Vec<AutomationConfig> {
        Vec::new()
    }

    async fn fetch_shop_config(&self, _shop_id: &str) -> Option<AutomationConfig> {
        None
    }
}
