//! Fakes for exercising the engine without a page or a network.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use cartpilot_contracts::{
    AutomationConfig, DecodeError, EngineEvent, LogEvent, Merchant, Message, decode_str,
};
use cartpilot_traits::{
    ConfigSource, EngineObserver, EnginePhase, ScriptEnvironment, TelemetrySink,
};

use crate::bridge::dispatched_payload;

pub fn merchant(shop_id: &str, shop_url: &str, checkout_url: &str) -> Merchant {
    Merchant {
        shop_name: format!("Shop {shop_id}"),
        shop_id: shop_id.to_string(),
        shop_url: shop_url.to_string(),
        checkout_url: checkout_url.to_string(),
    }
}

pub fn config_for(shop_id: &str, shop_url: &str, checkout_url: &str) -> AutomationConfig {
    AutomationConfig {
        version: 1.0,
        task_id: format!("task-{shop_id}"),
        shop_id: shop_id.to_string(),
        shop_name: format!("Shop {shop_id}"),
        shop_url: shop_url.to_string(),
        checkout_url: checkout_url.to_string(),
        extended_logs: false,
        extended_reports: false,
        inspect: Vec::new(),
        detect: Vec::new(),
        apply: Vec::new(),
        apply_best: Vec::new(),
        selectors_to_check: Vec::new(),
    }
}

/// In-memory config service that counts shop config fetches.
#[derive(Default)]
pub struct FakeSource {
    pub merchants: Vec<Merchant>,
    pub default_configs: Vec<AutomationConfig>,
    shop_configs: Mutex<HashMap<String, AutomationConfig>>,
    fetches: AtomicUsize,
}

impl FakeSource {
    pub fn new(merchants: Vec<Merchant>, default_configs: Vec<AutomationConfig>) -> Self {
        Self {
            merchants,
            default_configs,
            ..Self::default()
        }
    }

    pub fn with_shop_config(self, config: AutomationConfig) -> Self {
        self.set_shop_config(config);
        self
    }

    pub fn set_shop_config(&self, config: AutomationConfig) {
        self.shop_configs
            .lock()
            .unwrap()
            .insert(config.shop_id.clone(), config);
    }

    pub fn remove_shop_config(&self, shop_id: &str) {
        self.shop_configs.lock().unwrap().remove(shop_id);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfigSource for FakeSource {
    async fn fetch_merchants(&self) -> Vec<Merchant> {
        self.merchants.clone()
    }

    async fn fetch_default_configs(&self) -> Vec<AutomationConfig> {
        self.default_configs.clone()
    }

    async fn fetch_shop_config(&self, shop_id: &str) -> Option<AutomationConfig> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.shop_configs.lock().unwrap().get(shop_id).cloned()
    }
}

/// Page stand-in that records every evaluated script.
#[derive(Default)]
pub struct RecordingEnvironment {
    scripts: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingEnvironment {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn scripts(&self) -> Vec<String> {
        self.scripts.lock().unwrap().clone()
    }

    /// Messages delivered through dispatch scripts, in order.
    pub fn sent_messages(&self) -> Vec<Message> {
        self.scripts()
            .iter()
            .filter_map(|script| dispatched_payload(script))
            .map(|payload| decode_str(payload).unwrap())
            .collect()
    }
}

#[async_trait]
impl ScriptEnvironment for RecordingEnvironment {
    async fn evaluate(&self, script: &str) -> Result<()> {
        if self.fail {
            anyhow::bail!("page is gone");
        }
        self.scripts.lock().unwrap().push(script.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    pub events: Mutex<Vec<EngineEvent>>,
    pub phases: Mutex<Vec<(EnginePhase, EnginePhase)>>,
    pub decode_errors: Mutex<Vec<String>>,
}

impl EngineObserver for RecordingObserver {
    fn on_event(&self, event: &EngineEvent) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn on_phase_change(&self, from: EnginePhase, to: EnginePhase) {
        self.phases.lock().unwrap().push((from, to));
    }

    fn on_decode_error(&self, error: &DecodeError) {
        self.decode_errors.lock().unwrap().push(error.to_string());
    }
}

#[derive(Default)]
pub struct RecordingTelemetry {
    pub events: Mutex<Vec<LogEvent>>,
}

#[async_trait]
impl TelemetrySink for RecordingTelemetry {
    async fn log(&self, event: LogEvent) {
        self.events.lock().unwrap().push(event);
    }
}
