//! Bridge orchestrator.
//!
//! One [`Engine`] drives one script environment. It resolves the merchant
//! config for a page, hands it to the page-side engine in an `init`
//! message, keeps the persisted execution state the page checkpoints
//! through `persist` / `clear-persist`, and forwards page events to the
//! host's [`EngineObserver`].

mod scripts;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use cartpilot_contracts::{
    AbortMessage, CheckMessage, EngineEvent, InitMessage, Message, PersistedState, ProgressEvent,
    decode_str,
};
use cartpilot_traits::{
    ConfigSource, EngineObserver, EnginePhase, NoopObserver, NoopTelemetry, ScriptEnvironment,
    TelemetrySink,
};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::bridge::{PendingRequests, dispatch_script};
use crate::cache::ConfigCache;
use crate::directory::{MerchantDirectory, is_checkout_page};
use crate::error::{EngineError, Result};
use crate::settings::EngineSettings;

pub use scripts::Stage;

/// What [`Engine::start_engine`] sent to the page.
#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    /// No merchant config matched; a `check` went out.
    NoConfig,
    /// An `init` went out for `shop_id`.
    Started { shop_id: String, checkout: bool },
}

pub struct Engine {
    settings: EngineSettings,
    environment: Arc<dyn ScriptEnvironment>,
    source: Arc<dyn ConfigSource>,
    cache: Arc<ConfigCache>,
    observer: Arc<dyn EngineObserver>,
    telemetry: Arc<dyn TelemetrySink>,
    directory: RwLock<MerchantDirectory>,
    promo_codes: RwLock<Vec<String>>,
    persisted: Mutex<Option<PersistedState>>,
    phase: Mutex<EnginePhase>,
    /// Set by [`Engine::abort`]; a page-reported failure leaves it clear.
    host_aborted: AtomicBool,
    pending: PendingRequests,
}

impl Engine {
    pub fn new(
        settings: EngineSettings,
        environment: Arc<dyn ScriptEnvironment>,
        source: Arc<dyn ConfigSource>,
        cache: Arc<ConfigCache>,
    ) -> Self {
        Self {
            settings,
            environment,
            source,
            cache,
            observer: Arc::new(NoopObserver),
            telemetry: Arc::new(NoopTelemetry),
            directory: RwLock::new(MerchantDirectory::default()),
            promo_codes: RwLock::new(Vec::new()),
            persisted: Mutex::new(None),
            phase: Mutex::new(EnginePhase::Idle),
            host_aborted: AtomicBool::new(false),
            pending: PendingRequests::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn EngineObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Use a prebuilt directory instead of fetching one in [`install`](Self::install).
    pub fn with_directory(mut self, directory: MerchantDirectory) -> Self {
        self.directory = RwLock::new(directory);
        self
    }

    /// Codes a page-selected default config starts with before any
    /// [`start_engine`](Self::start_engine) call.
    pub fn with_promo_codes(mut self, codes: Vec<String>) -> Self {
        self.promo_codes = RwLock::new(codes);
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub async fn phase(&self) -> EnginePhase {
        *self.phase.lock().await
    }

    pub async fn persisted_state(&self) -> Option<PersistedState> {
        self.persisted.lock().await.clone()
    }

    pub async fn promo_codes(&self) -> Vec<String> {
        self.promo_codes.read().await.clone()
    }

    pub async fn pending_acknowledgements(&self) -> usize {
        self.pending.len().await
    }

    /// Fetch the merchant list and default configs, then rebuild the
    /// default selector map.
    pub async fn install(&self) {
        self.cache.load().await;
        let merchants = self.source.fetch_merchants().await;
        let default_configs = self.source.fetch_default_configs().await;
        let directory = MerchantDirectory::new(merchants, default_configs);
        info!(
            merchants = directory.merchant_count(),
            default_configs = directory.default_config_count(),
            "Merchant directory installed"
        );
        *self.directory.write().await = directory;
    }

    /// Evaluate one stage script in the page.
    pub async fn run_stage(&self, stage: Stage) -> Result<()> {
        debug!(stage = stage.name(), "Running stage");
        self.host_aborted.store(false, Ordering::SeqCst);
        self.environment
            .evaluate(&stage.script())
            .await
            .map_err(EngineError::Environment)
    }

    pub async fn init_engine(&self) -> Result<()> {
        self.run_stage(Stage::InitEngine).await
    }

    pub async fn inspect(&self) -> Result<()> {
        self.run_stage(Stage::Inspect).await
    }

    pub async fn detect(&self) -> Result<()> {
        self.run_stage(Stage::Detect).await
    }

    pub async fn apply(&self) -> Result<()> {
        self.run_stage(Stage::Apply).await
    }

    pub async fn apply_best(&self) -> Result<()> {
        self.run_stage(Stage::ApplyBest).await
    }

    pub async fn full_cycle(&self) -> Result<()> {
        self.run_stage(Stage::FullCycle).await
    }

    pub async fn notify_show_modal(&self) -> Result<()> {
        self.run_stage(Stage::NotifyShowModal).await
    }

    pub async fn notify_close_modal(&self) -> Result<()> {
        self.run_stage(Stage::NotifyCloseModal).await
    }

    /// Resolve the config for `url` and hand it to the page.
    ///
    /// Sends exactly one message: `init` when a merchant config is found,
    /// otherwise `check` with the default selectors.
    pub async fn start_engine(&self, url: &str, codes: Vec<String>) -> Result<StartOutcome> {
        let (message, outcome) = self.prepare_start(url, codes).await?;
        self.send(&message).await?;
        Ok(outcome)
    }

    /// Like [`start_engine`](Self::start_engine), but waits for the page to
    /// echo the message's correlation id back in an `init` or `check`.
    pub async fn start_engine_acknowledged(
        &self,
        url: &str,
        codes: Vec<String>,
        timeout: Duration,
    ) -> Result<Message> {
        let (message, _) = self.prepare_start(url, codes).await?;
        let (correlation_id, ack) = self.pending.register().await;
        let message = message.with_correlation_id(correlation_id.clone());

        if let Err(err) = self.send(&message).await {
            self.pending.cancel(&correlation_id).await;
            return Err(err);
        }

        match tokio::time::timeout(timeout, ack).await {
            Ok(Ok(message)) => Ok(message),
            Ok(Err(_)) => Err(EngineError::AckDropped(correlation_id)),
            Err(_) => {
                self.pending.cancel(&correlation_id).await;
                warn!(correlation_id = %correlation_id, "Start was not acknowledged in time");
                Err(EngineError::AckTimeout {
                    correlation_id,
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                })
            }
        }
    }

    async fn prepare_start(&self, url: &str, codes: Vec<String>) -> Result<(Message, StartOutcome)> {
        self.host_aborted.store(false, Ordering::SeqCst);
        self.set_phase(EnginePhase::Resolving).await;
        *self.promo_codes.write().await = codes.clone();

        let (message, outcome) = match self.resolve(url, codes).await? {
            Some((init, shop_id)) => {
                let outcome = StartOutcome::Started {
                    shop_id,
                    checkout: init.checkout,
                };
                (Message::Init(init), outcome)
            }
            None => (self.check_message().await, StartOutcome::NoConfig),
        };

        let next = match outcome {
            StartOutcome::NoConfig => EnginePhase::NoConfig,
            StartOutcome::Started { .. } => EnginePhase::AwaitingAutomation,
        };
        self.set_phase(next).await;
        Ok((message, outcome))
    }

    async fn resolve(&self, url: &str, codes: Vec<String>) -> Result<Option<(InitMessage, String)>> {
        let shop_id = {
            let directory = self.directory.read().await;
            match directory.locate_shop(url) {
                Some(merchant) => merchant.shop_id.clone(),
                None => {
                    debug!(url = %url, "No merchant matches location");
                    return Ok(None);
                }
            }
        };

        let Some(config) = self.cache.get(&shop_id).await else {
            return Ok(None);
        };

        let checkout = is_checkout_page(url, &config);
        info!(shop_id = %shop_id, checkout, "Resolved merchant config");
        let init = InitMessage {
            config: Some(config.to_wire_string()?),
            checkout,
            promocodes: codes,
            persisted_state: self.persisted_state().await,
            correlation_id: None,
        };
        Ok(Some((init, shop_id)))
    }

    async fn check_message(&self) -> Message {
        let default_selectors = self.directory.read().await.default_selectors().clone();
        Message::Check(CheckMessage {
            default_selectors,
            correlation_id: None,
        })
    }

    /// Cancel the running automation. Fire-and-forget.
    ///
    /// Progress the page reports afterwards is dropped until the host
    /// starts a stage or a config again.
    pub async fn abort(&self) -> Result<()> {
        self.host_aborted.store(true, Ordering::SeqCst);
        self.set_phase(EnginePhase::Aborted).await;
        self.send(&Message::Abort(AbortMessage::default())).await
    }

    /// Decode and route one message posted by the page.
    ///
    /// Payloads that do not decode are reported to the observer and
    /// otherwise ignored.
    pub async fn handle_inbound(&self, text: &str) -> Result<()> {
        match decode_str(text) {
            Ok(message) => self.handle_message(message).await,
            Err(err) => {
                warn!(error = %err, "Dropping undecodable inbound message");
                self.observer.on_decode_error(&err);
                Ok(())
            }
        }
    }

    pub async fn handle_message(&self, message: Message) -> Result<()> {
        debug!(kind = message.name(), "Inbound message");
        match message {
            Message::ConfigSelected(shop_id) => return self.config_selected(&shop_id).await,
            Message::Persist(persist) => {
                *self.persisted.lock().await = Some(persist.persisted_state);
                debug!("Execution state persisted");
            }
            Message::ClearPersist(_) => {
                self.persisted.lock().await.take();
                debug!("Execution state cleared");
            }
            Message::Check(_) | Message::Init(_) => {
                if !self.pending.complete(&message).await {
                    debug!(kind = message.name(), "Unsolicited acknowledgement");
                }
            }
            Message::Abort(_) => debug!("Page echoed abort"),
            Message::Log(log) => {
                if self.settings.diagnostics {
                    self.telemetry.log(log.event).await;
                }
            }
            Message::Event(event) => self.handle_event(event).await,
        }
        Ok(())
    }

    async fn handle_event(&self, event: EngineEvent) {
        if let EngineEvent::Progress(ProgressEvent { value, .. }) = &event {
            let status = *value;
            if self.host_aborted.load(Ordering::SeqCst) {
                debug!(status = ?status, "Ignoring progress after abort");
                return;
            }
            self.observer.on_event(&event);
            if status.is_terminal() {
                let next = if status.is_success() {
                    EnginePhase::Completed
                } else {
                    EnginePhase::Aborted
                };
                self.set_phase(next).await;
                if self.settings.clear_persisted_on_terminal {
                    self.persisted.lock().await.take();
                }
            }
            return;
        }
        self.observer.on_event(&event);
    }

    /// The page picked a default config on its own: start it as a checkout.
    async fn config_selected(&self, shop_id: &str) -> Result<()> {
        let config = {
            let directory = self.directory.read().await;
            match directory.default_config(shop_id) {
                Some(config) => config.to_wire_string()?,
                None => {
                    warn!(shop_id = %shop_id, "Page selected an unknown default config");
                    return Ok(());
                }
            }
        };

        let init = InitMessage {
            config: Some(config),
            checkout: true,
            promocodes: self.promo_codes().await,
            persisted_state: None,
            correlation_id: None,
        };
        self.host_aborted.store(false, Ordering::SeqCst);
        self.set_phase(EnginePhase::AwaitingAutomation).await;
        self.send(&Message::Init(init)).await
    }

    async fn send(&self, message: &Message) -> Result<()> {
        debug!(kind = message.name(), "Outbound message");
        let script = dispatch_script(message)?;
        self.environment
            .evaluate(&script)
            .await
            .map_err(EngineError::Environment)
    }

    async fn set_phase(&self, to: EnginePhase) {
        let from = {
            let mut phase = self.phase.lock().await;
            std::mem::replace(&mut *phase, to)
        };
        if from != to {
            info!(from = %from, to = %to, "Engine phase changed");
            self.observer.on_phase_change(from, to);
        }
    }
}
