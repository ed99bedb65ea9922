//! Message envelopes exchanged over the bridge.
//!
//! Two wire shapes coexist:
//!
//! - lifecycle messages carry a `type` discriminator
//!   (`smartshopping_check`, `smartshopping_init`, ...; the short names
//!   `check`, `init`, `persist`, `clear-persist`, `abort`, `log` decode too)
//!   and may echo a `correlationId`;
//! - engine events are `{ "event": <name>, "message": <payload> }`.
//!
//! A bare JSON string is the id of the config the page selected.
//! Decoding goes through [`crate::codec`].

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::config::AutomationConfig;
use crate::selector::Selector;
use crate::state::{
    CheckoutState, DetectState, EngineState, FinalCost, PersistedState, ProgressStatus,
};

/// Default selectors keyed by shop id.
pub type DefaultSelectors = BTreeMap<String, Vec<Selector>>;

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Check(CheckMessage),
    Init(InitMessage),
    Persist(PersistMessage),
    ClearPersist(ClearPersistMessage),
    Abort(AbortMessage),
    Log(LogMessage),
    /// Shop id of a default config the page picked on its own.
    ConfigSelected(String),
    Event(EngineEvent),
}

/// Lifecycle messages identified by their `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Check,
    Init,
    Persist,
    ClearPersist,
    Abort,
    Log,
}

impl MessageKind {
    pub const ALL: [MessageKind; 6] = [
        Self::Check,
        Self::Init,
        Self::Persist,
        Self::ClearPersist,
        Self::Abort,
        Self::Log,
    ];

    /// Short name used in logs and diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Self::Check => "check",
            Self::Init => "init",
            Self::Persist => "persist",
            Self::ClearPersist => "clear-persist",
            Self::Abort => "abort",
            Self::Log => "log",
        }
    }

    /// `type` value written on encode. The page engine only listens for
    /// the `smartshopping_*` spelling.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Check => "smartshopping_check",
            Self::Init => "smartshopping_init",
            Self::Persist => "smartshopping_persist",
            Self::ClearPersist => "smartshopping_clear_persist",
            Self::Abort => "smartshopping_abort",
            Self::Log => "smartshopping_log",
        }
    }

    /// Resolve a `type` value, accepting the short names as well.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let kind = match tag {
            "check" | "smartshopping_check" => Self::Check,
            "init" | "smartshopping_init" => Self::Init,
            "persist" | "smartshopping_persist" => Self::Persist,
            "clear-persist" | "smartshopping_clear_persist" => Self::ClearPersist,
            "abort" | "smartshopping_abort" => Self::Abort,
            "log" | "smartshopping_log" => Self::Log,
            _ => return None,
        };
        Some(kind)
    }

    pub(crate) fn decode(self, value: Value) -> serde_json::Result<Message> {
        Ok(match self {
            Self::Check => Message::Check(serde_json::from_value(value)?),
            Self::Init => Message::Init(serde_json::from_value(value)?),
            Self::Persist => Message::Persist(serde_json::from_value(value)?),
            Self::ClearPersist => Message::ClearPersist(serde_json::from_value(value)?),
            Self::Abort => Message::Abort(serde_json::from_value(value)?),
            Self::Log => Message::Log(serde_json::from_value(value)?),
        })
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Host → page when no merchant matched: lets the page run a cheap
/// presence heuristic. Page → host as an acknowledgement.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckMessage {
    #[serde(default)]
    pub default_selectors: DefaultSelectors,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

/// Host → page to start an automation. Page → host as an acknowledgement.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitMessage {
    /// The resolved [`AutomationConfig`], serialized to a JSON string.
    #[serde(default)]
    pub config: Option<String>,
    #[serde(default)]
    pub checkout: bool,
    #[serde(default)]
    pub promocodes: Vec<String>,
    #[serde(default)]
    pub persisted_state: Option<PersistedState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl InitMessage {
    /// Parse the embedded config string, if any.
    pub fn decoded_config(&self) -> Option<serde_json::Result<AutomationConfig>> {
        self.config.as_deref().map(serde_json::from_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistMessage {
    pub persisted_state: PersistedState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearPersistMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

/// Host → page cancellation. Fire-and-forget.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbortMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMessage {
    pub event: LogEvent,
}

/// Diagnostic record emitted by the page engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub shop: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_page: Option<String>,
}

/// Page → host notifications, forwarded to the host observer verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "message", rename_all = "camelCase")]
pub enum EngineEvent {
    Config(AutomationConfig),
    CheckoutState(CheckoutState),
    #[serde(serialize_with = "crate::state::finite::costs")]
    FinalCost(FinalCost),
    Promocodes(Vec<String>),
    DetectState(DetectState),
    Checkout(CheckoutEvent),
    Progress(ProgressEvent),
    CurrentCode(String),
    BestCode(String),
}

impl EngineEvent {
    pub const NAMES: [&'static str; 9] = [
        "config",
        "checkoutState",
        "finalCost",
        "promocodes",
        "detectState",
        "checkout",
        "progress",
        "currentCode",
        "bestCode",
    ];

    pub fn is_known(name: &str) -> bool {
        Self::NAMES.contains(&name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::CheckoutState(_) => "checkoutState",
            Self::FinalCost(_) => "finalCost",
            Self::Promocodes(_) => "promocodes",
            Self::DetectState(_) => "detectState",
            Self::Checkout(_) => "checkout",
            Self::Progress(_) => "progress",
            Self::CurrentCode(_) => "currentCode",
            Self::BestCode(_) => "bestCode",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutEvent {
    pub value: bool,
    pub state: EngineState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub value: ProgressStatus,
    pub state: EngineState,
}

impl Message {
    /// Short label used in logs and diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Check(_) => MessageKind::Check.name(),
            Self::Init(_) => MessageKind::Init.name(),
            Self::Persist(_) => MessageKind::Persist.name(),
            Self::ClearPersist(_) => MessageKind::ClearPersist.name(),
            Self::Abort(_) => MessageKind::Abort.name(),
            Self::Log(_) => MessageKind::Log.name(),
            Self::ConfigSelected(_) => "config-selected",
            Self::Event(event) => event.name(),
        }
    }

    pub fn correlation_id(&self) -> Option<&str> {
        match self {
            Self::Check(m) => m.correlation_id.as_deref(),
            Self::Init(m) => m.correlation_id.as_deref(),
            Self::Persist(m) => m.correlation_id.as_deref(),
            Self::ClearPersist(m) => m.correlation_id.as_deref(),
            Self::Abort(m) => m.correlation_id.as_deref(),
            Self::Log(_) | Self::ConfigSelected(_) | Self::Event(_) => None,
        }
    }

    /// Attach a correlation id. Messages without the field are returned
    /// unchanged.
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        let id = Some(id.into());
        match &mut self {
            Self::Check(m) => m.correlation_id = id,
            Self::Init(m) => m.correlation_id = id,
            Self::Persist(m) => m.correlation_id = id,
            Self::ClearPersist(m) => m.correlation_id = id,
            Self::Abort(m) => m.correlation_id = id,
            Self::Log(_) | Self::ConfigSelected(_) | Self::Event(_) => {}
        }
        self
    }
}

#[derive(Serialize)]
struct Tagged<'a, T: Serialize> {
    #[serde(rename = "type")]
    tag: &'static str,
    #[serde(flatten)]
    body: &'a T,
}

fn tagged<'a, T: Serialize>(kind: MessageKind, body: &'a T) -> Tagged<'a, T> {
    Tagged {
        tag: kind.tag(),
        body,
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Check(m) => tagged(MessageKind::Check, m).serialize(serializer),
            Self::Init(m) => tagged(MessageKind::Init, m).serialize(serializer),
            Self::Persist(m) => tagged(MessageKind::Persist, m).serialize(serializer),
            Self::ClearPersist(m) => tagged(MessageKind::ClearPersist, m).serialize(serializer),
            Self::Abort(m) => tagged(MessageKind::Abort, m).serialize(serializer),
            Self::Log(m) => tagged(MessageKind::Log, m).serialize(serializer),
            Self::ConfigSelected(id) => serializer.serialize_str(id),
            Self::Event(event) => event.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        crate::codec::decode_value(value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_tags_resolve_both_ways() {
        for kind in MessageKind::ALL {
            assert_eq!(MessageKind::from_tag(kind.tag()), Some(kind));
            assert_eq!(MessageKind::from_tag(kind.name()), Some(kind));
        }
        assert_eq!(MessageKind::Init.tag(), "smartshopping_init");
        assert_eq!(MessageKind::Init.to_string(), "init");
        assert_eq!(MessageKind::from_tag("bogus"), None);
    }

    #[test]
    fn test_check_message_shape() {
        let message = Message::Check(CheckMessage {
            default_selectors: DefaultSelectors::from([(
                "A".to_string(),
                vec![Selector::css("#promo")],
            )]),
            correlation_id: None,
        });
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"type": "smartshopping_check", "defaultSelectors": {"A": ["#promo"]}})
        );
    }

    #[test]
    fn test_init_message_emits_null_persisted_state() {
        let message = Message::Init(InitMessage {
            config: Some("{}".into()),
            checkout: true,
            promocodes: vec!["SAVE".into()],
            persisted_state: None,
            correlation_id: Some("c-1".into()),
        });
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "type": "smartshopping_init",
                "config": "{}",
                "checkout": true,
                "promocodes": ["SAVE"],
                "persistedState": null,
                "correlationId": "c-1"
            })
        );
    }

    #[test]
    fn test_event_envelope_shape() {
        let message = Message::Event(EngineEvent::Promocodes(vec!["A".into(), "B".into()]));
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"event": "promocodes", "message": ["A", "B"]})
        );
        assert_eq!(message.name(), "promocodes");
    }

    #[test]
    fn test_config_selected_is_bare_string() {
        let message = Message::ConfigSelected("shop-9".into());
        assert_eq!(serde_json::to_value(&message).unwrap(), json!("shop-9"));
    }

    #[test]
    fn test_correlation_id_helpers() {
        let message = Message::Abort(AbortMessage::default()).with_correlation_id("x");
        assert_eq!(message.correlation_id(), Some("x"));

        let event = Message::Event(EngineEvent::BestCode("B".into())).with_correlation_id("x");
        assert_eq!(event.correlation_id(), None);
    }

    #[test]
    fn test_event_names_cover_every_variant() {
        let events = [
            EngineEvent::CheckoutState(CheckoutState::default()),
            EngineEvent::FinalCost(FinalCost::new()),
            EngineEvent::Promocodes(Vec::new()),
            EngineEvent::DetectState(DetectState {
                user_code: String::new(),
                is_valid: false,
            }),
            EngineEvent::CurrentCode(String::new()),
            EngineEvent::BestCode(String::new()),
        ];
        for event in events {
            assert!(EngineEvent::is_known(event.name()));
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["event"], json!(event.name()));
        }
    }
}
