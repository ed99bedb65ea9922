//! Time-bounded cache of per-merchant automation configs.
//!
//! Entries are fresh while `now - timestamp < ttl`. A stale or missing entry
//! is refetched from the [`ConfigSource`]; a failed refetch yields `None`
//! rather than the stale copy. The whole map is written back to the
//! [`CacheFileStore`] after every change.

use std::sync::Arc;

use cartpilot_contracts::{AutomationConfig, CachedConfig};
use cartpilot_storage::{CacheEntries, CacheFileStore, StorageError};
use cartpilot_traits::{Clock, ConfigSource, SystemClock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::settings::EngineSettings;
use crate::version::check_version;

#[derive(Default)]
struct CacheState {
    loaded: bool,
    entries: CacheEntries,
}

pub struct ConfigCache {
    source: Arc<dyn ConfigSource>,
    store: Option<CacheFileStore>,
    clock: Arc<dyn Clock>,
    ttl_ms: i64,
    max_major: u64,
    state: Mutex<CacheState>,
}

impl ConfigCache {
    /// Cache backed by a durable file.
    pub fn new(
        source: Arc<dyn ConfigSource>,
        store: CacheFileStore,
        settings: &EngineSettings,
    ) -> Self {
        Self::build(source, Some(store), settings)
    }

    /// Cache that lives only as long as the process.
    pub fn in_memory(source: Arc<dyn ConfigSource>, settings: &EngineSettings) -> Self {
        Self::build(source, None, settings)
    }

    fn build(
        source: Arc<dyn ConfigSource>,
        store: Option<CacheFileStore>,
        settings: &EngineSettings,
    ) -> Self {
        Self {
            source,
            store,
            clock: Arc::new(SystemClock),
            ttl_ms: settings.cache_ttl_millis(),
            max_major: settings.max_config_major,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Read the durable map. Runs at most once; later calls are no-ops.
    ///
    /// A missing, empty or corrupt file resets the cache to an empty map,
    /// which is written back immediately.
    pub async fn load(&self) {
        let mut state = self.state.lock().await;
        self.ensure_loaded(&mut state);
    }

    fn ensure_loaded(&self, state: &mut CacheState) {
        if state.loaded {
            return;
        }
        state.loaded = true;

        let Some(store) = &self.store else {
            return;
        };
        match store.load() {
            Ok(Some(entries)) => {
                debug!(entries = entries.len(), "Config cache loaded");
                state.entries = entries;
            }
            Ok(None) => {
                debug!(path = %store.path().display(), "Config cache initialized");
                self.persist(&state.entries);
            }
            Err(err) => {
                warn!(error = %err, "Config cache unreadable, starting empty");
                state.entries.clear();
                self.persist(&state.entries);
            }
        }
    }

    fn persist(&self, entries: &CacheEntries) {
        if let Err(err) = self.try_persist(entries) {
            warn!(error = %err, "Failed to write config cache");
        }
    }

    fn try_persist(&self, entries: &CacheEntries) -> Result<(), StorageError> {
        match &self.store {
            Some(store) => store.save(entries),
            None => Ok(()),
        }
    }

    /// Config for `shop_id`, refetching when the cached copy is stale.
    pub async fn get(&self, shop_id: &str) -> Option<AutomationConfig> {
        let mut state = self.state.lock().await;
        self.ensure_loaded(&mut state);

        let now = self.clock.now_millis();
        if let Some(cached) = state.entries.get(shop_id)
            && cached.is_fresh(now, self.ttl_ms)
        {
            debug!(shop_id = %shop_id, "Config cache hit");
            return Some(cached.config.clone());
        }

        let Some(fetched) = self.source.fetch_shop_config(shop_id).await else {
            warn!(shop_id = %shop_id, "No config available");
            return None;
        };

        let previous = state.entries.get(shop_id).map(|cached| &cached.config);
        if let Err(rejection) = check_version(&fetched, previous, self.max_major) {
            warn!(shop_id = %shop_id, reason = %rejection, "Rejected fetched config");
            return None;
        }

        info!(shop_id = %shop_id, version = fetched.version, "Config refreshed");
        state.entries.insert(
            shop_id.to_string(),
            CachedConfig::new(self.clock.now_millis(), fetched.clone()),
        );
        self.persist(&state.entries);
        Some(fetched)
    }

    /// Drop one entry. Returns whether it was present.
    pub async fn invalidate(&self, shop_id: &str) -> Result<bool, StorageError> {
        let mut state = self.state.lock().await;
        self.ensure_loaded(&mut state);
        let removed = state.entries.remove(shop_id).is_some();
        if removed {
            self.try_persist(&state.entries)?;
        }
        Ok(removed)
    }

    pub async fn clear(&self) -> Result<(), StorageError> {
        let mut state = self.state.lock().await;
        self.ensure_loaded(&mut state);
        state.entries.clear();
        self.try_persist(&state.entries)
    }

    /// Snapshot of every cached entry, fresh or not.
    pub async fn entries(&self) -> CacheEntries {
        let mut state = self.state.lock().await;
        self.ensure_loaded(&mut state);
        state.entries.clone()
    }

    pub fn ttl_millis(&self) -> i64 {
        self.ttl_ms
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }
}
