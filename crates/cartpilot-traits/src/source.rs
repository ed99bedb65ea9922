//! Where merchant directories and automation configs come from.

use async_trait::async_trait;
use cartpilot_contracts::{AutomationConfig, Merchant};

/// Remote config service.
///
/// Lookups never fail loudly: transport, decrypt and decode problems are
/// logged by the implementation and surface as an empty list or `None`.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Every merchant the service knows about, in service order.
    async fn fetch_merchants(&self) -> Vec<Merchant>;

    /// Fallback configs used when the page picks a shop on its own.
    async fn fetch_default_configs(&self) -> Vec<AutomationConfig>;

    async fn fetch_shop_config(&self, shop_id: &str) -> Option<AutomationConfig>;
}
