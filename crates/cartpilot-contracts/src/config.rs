//! Merchant directory entries and per-merchant automation configs.

use serde::{Deserialize, Serialize};

use crate::command::Script;
use crate::selector::Selector;

/// A storefront known to the config service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Merchant {
    pub shop_name: String,
    pub shop_id: String,
    /// Regular expression matched against page locations of the storefront.
    pub shop_url: String,
    /// Regular expression matched against checkout page locations.
    pub checkout_url: String,
}

/// The automation bundle for one merchant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationConfig {
    /// Schema version; the integer part is the major.
    #[serde(serialize_with = "crate::state::finite::number")]
    pub version: f64,
    pub task_id: String,
    pub shop_id: String,
    pub shop_name: String,
    pub shop_url: String,
    pub checkout_url: String,
    #[serde(default)]
    pub extended_logs: bool,
    #[serde(default)]
    pub extended_reports: bool,
    #[serde(default)]
    pub inspect: Script,
    #[serde(default)]
    pub detect: Script,
    #[serde(default)]
    pub apply: Script,
    #[serde(default)]
    pub apply_best: Script,
    /// Lightweight presence checks used before a full config is loaded.
    #[serde(default)]
    pub selectors_to_check: Vec<Selector>,
}

impl AutomationConfig {
    /// Major component of [`version`](Self::version), or `None` when the
    /// version is not a finite non-negative number.
    pub fn major_version(&self) -> Option<u64> {
        if self.version.is_finite() && self.version >= 0.0 {
            Some(self.version.trunc() as u64)
        } else {
            None
        }
    }

    /// The four stage scripts, labelled with their stage names.
    pub fn stages(&self) -> [(&'static str, &Script); 4] {
        [
            ("inspect", &self.inspect),
            ("detect", &self.detect),
            ("apply", &self.apply),
            ("applyBest", &self.apply_best),
        ]
    }

    /// Serialized form embedded in `init` messages.
    pub fn to_wire_string(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// An [`AutomationConfig`] stamped with its fetch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedConfig {
    /// Fetch time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub config: AutomationConfig,
}

impl CachedConfig {
    pub fn new(timestamp: i64, config: AutomationConfig) -> Self {
        Self { timestamp, config }
    }

    /// Whether the entry is still inside its freshness window at `now_ms`.
    pub fn is_fresh(&self, now_ms: i64, ttl_ms: i64) -> bool {
        now_ms.saturating_sub(self.timestamp) < ttl_ms
    }
}
