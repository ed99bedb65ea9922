//! Execution state reported by, and handed back to, the page-side engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::AutomationConfig;

/// Resumable checkpoint of an in-flight script.
///
/// The host never interprets this value. Fields it does not know about are
/// kept in `extra` so the snapshot is handed back exactly as received.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContext {
    /// Last evaluated promo code.
    pub code: String,
    pub code_is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Pending `return` level.
    #[serde(rename = "return")]
    pub return_level: i64,
    pub critical_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_stage: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExecutionContext {
    /// Whether the script stopped at an anchor it can resume from.
    pub fn is_anchored(&self) -> bool {
        self.anchor.is_some()
    }
}

/// Per-code totals computed while applying codes, keyed by promo code.
pub type FinalCost = BTreeMap<String, f64>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CheckoutState {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "finite::optional"
    )]
    pub total: Option<f64>,
}

/// Serializers that refuse NaN and infinities.
///
/// JSON has no spelling for them and `serde_json` would write `null`,
/// which the numeric fields then refuse to decode.
pub(crate) mod finite {
    use serde::Serializer;
    use serde::ser::{Error, SerializeMap};

    use super::FinalCost;

    fn check<E: Error>(value: f64) -> Result<f64, E> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(E::custom(format!("non-finite number {value} has no JSON form")))
        }
    }

    pub fn number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(check::<S::Error>(*value)?)
    }

    pub fn optional<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.serialize_some(&check::<S::Error>(*value)?),
            None => serializer.serialize_none(),
        }
    }

    pub fn costs<S: Serializer>(costs: &FinalCost, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(costs.len()))?;
        for (code, cost) in costs {
            map.serialize_entry(code, &check::<S::Error>(*cost)?)?;
        }
        map.end()
    }
}

/// Everything the host keeps so an automation survives a page reset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    pub context: ExecutionContext,
    #[serde(serialize_with = "finite::costs")]
    pub final_cost: FinalCost,
    pub checkout_state: CheckoutState,
}

/// A code the shopper typed themselves, as observed by `detect`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectState {
    pub user_code: String,
    pub is_valid: bool,
}

/// Full engine snapshot attached to `progress` and `checkout` events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineState {
    pub checkout_state: CheckoutState,
    #[serde(serialize_with = "finite::costs")]
    pub final_cost: FinalCost,
    pub progress: String,
    pub config: AutomationConfig,
    pub promocodes: Vec<String>,
    pub detect_state: DetectState,
    pub best_code: String,
    pub current_code: String,
    pub checkout: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProgressStatus {
    #[serde(rename = "STARTED")]
    Started,
    #[serde(rename = "INSPECT_END")]
    InspectEnd,
    #[serde(rename = "DETECT")]
    Detect,
    #[serde(rename = "DETECT_END")]
    DetectEnd,
    #[serde(rename = "AWAIT")]
    Await,
    #[serde(rename = "INACTIVE")]
    Inactive,
    #[serde(rename = "APPLY")]
    Apply,
    #[serde(rename = "APPLY_END")]
    ApplyEnd,
    #[serde(rename = "APPLY-BEST")]
    ApplyBest,
    #[serde(rename = "APPLY-BEST_END")]
    ApplyBestEnd,
    #[serde(rename = "COUPON-EXTRACTED")]
    CouponExtracted,
    #[serde(rename = "SUCCESS")]
    Success,
    #[serde(rename = "FAIL")]
    Fail,
    #[serde(rename = "CANCEL")]
    Cancel,
    #[serde(rename = "ERROR")]
    Error,
}

impl ProgressStatus {
    /// `SUCCESS`, `FAIL`, `CANCEL` and `ERROR` end an automation cycle.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Fail | Self::Cancel | Self::Error)
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_context_wire_names() {
        let context: ExecutionContext = serde_json::from_value(json!({
            "code": "SAVE10",
            "codeIsValid": true,
            "return": 0,
            "criticalError": false,
            "anchor": "after-apply",
            "anchorCode": "SAVE10",
            "anchorStage": "apply"
        }))
        .unwrap();
        assert_eq!(context.code, "SAVE10");
        assert!(context.code_is_valid);
        assert!(context.is_anchored());
        assert_eq!(context.anchor_stage.as_deref(), Some("apply"));
        assert!(context.extra.is_empty());
    }

    #[test]
    fn test_context_preserves_unknown_fields() {
        let wire = json!({
            "code": "",
            "codeIsValid": false,
            "return": 1,
            "criticalError": false,
            "iteration": 3,
            "scratch": {"seen": ["A", "B"]}
        });
        let context: ExecutionContext = serde_json::from_value(wire.clone()).unwrap();
        assert_eq!(context.extra.len(), 2);
        assert_eq!(serde_json::to_value(&context).unwrap(), wire);
    }

    #[test]
    fn test_persisted_state_round_trip() {
        let state = PersistedState {
            context: ExecutionContext {
                code: "WELCOME".into(),
                code_is_valid: false,
                value: Some("12.50".into()),
                return_level: 0,
                critical_error: false,
                anchor: Some("codes".into()),
                anchor_code: Some("WELCOME".into()),
                anchor_stage: Some("apply".into()),
                extra: Map::new(),
            },
            final_cost: FinalCost::from([("WELCOME".to_string(), 42.0)]),
            checkout_state: CheckoutState { total: Some(50.0) },
        };
        let encoded = serde_json::to_string(&state).unwrap();
        let decoded: PersistedState = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn test_non_finite_amounts_are_rejected() {
        let state = PersistedState {
            final_cost: FinalCost::from([("A".to_string(), f64::NAN)]),
            ..PersistedState::default()
        };
        assert!(serde_json::to_string(&state).is_err());

        let checkout = CheckoutState {
            total: Some(f64::INFINITY),
        };
        assert!(serde_json::to_string(&checkout).is_err());
        assert_eq!(
            serde_json::to_value(CheckoutState { total: Some(-0.5) }).unwrap(),
            json!({"total": -0.5})
        );
    }

    #[test]
    fn test_progress_status_wire_values() {
        let status: ProgressStatus = serde_json::from_value(json!("APPLY-BEST_END")).unwrap();
        assert_eq!(status, ProgressStatus::ApplyBestEnd);
        assert_eq!(
            serde_json::to_value(ProgressStatus::CouponExtracted).unwrap(),
            json!("COUPON-EXTRACTED")
        );
    }

    #[test]
    fn test_terminal_statuses() {
        let terminal = [
            ProgressStatus::Success,
            ProgressStatus::Fail,
            ProgressStatus::Cancel,
            ProgressStatus::Error,
        ];
        for status in terminal {
            assert!(status.is_terminal(), "{status:?} should be terminal");
        }
        for status in [
            ProgressStatus::Started,
            ProgressStatus::Apply,
            ProgressStatus::ApplyEnd,
            ProgressStatus::Await,
        ] {
            assert!(!status.is_terminal(), "{status:?} should not be terminal");
        }
        assert!(ProgressStatus::Success.is_success());
        assert!(!ProgressStatus::Fail.is_success());
    }
}
