//! Bridge codec.
//!
//! Decoding never guesses between variants that declare a discriminator:
//!
//! 1. a known `type` value selects exactly one lifecycle message;
//! 2. otherwise a known `event` value selects exactly one engine event;
//! 3. otherwise the structural candidates are tried in declared order.
//!
//! A payload that fails under its declared discriminator is an
//! [`DecodeError::InvalidPayload`]; it is never re-read as another variant.
//! Unknown discriminators fall through to [`DecodeError::Unrecognized`].

use serde_json::Value;
use thiserror::Error;

use crate::message::{EngineEvent, Message, MessageKind};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unrecognized message: {raw}")]
    Unrecognized { raw: String },

    #[error("invalid {kind} payload: {source}")]
    InvalidPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

impl DecodeError {
    /// Raw text of an unrecognized payload.
    pub fn raw(&self) -> Option<&str> {
        match self {
            Self::Unrecognized { raw } => Some(raw),
            Self::InvalidPayload { .. } => None,
        }
    }

    fn unrecognized(value: &Value) -> Self {
        Self::Unrecognized {
            raw: value.to_string(),
        }
    }
}

type StructuralProbe = fn(&Value) -> Option<Message>;

/// Variants without a discriminator, in the order they are tried.
const STRUCTURAL_CANDIDATES: &[(&str, StructuralProbe)] =
    &[("config-selected", probe_config_selected)];

fn probe_config_selected(value: &Value) -> Option<Message> {
    value
        .as_str()
        .map(|shop_id| Message::ConfigSelected(shop_id.to_string()))
}

/// Encode a message to UTF-8 JSON bytes.
pub fn encode(message: &Message) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(message)
}

/// Encode a message to JSON text.
///
/// Fails only for NaN or infinite amounts and versions, which JSON cannot
/// carry. Everything that encodes decodes back to an equal message.
pub fn encode_to_string(message: &Message) -> serde_json::Result<String> {
    serde_json::to_string(message)
}

/// Decode a message from UTF-8 JSON bytes.
pub fn decode(bytes: &[u8]) -> Result<Message, DecodeError> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(value) => decode_value(value),
        Err(_) => Err(DecodeError::Unrecognized {
            raw: String::from_utf8_lossy(bytes).into_owned(),
        }),
    }
}

/// Decode a message from JSON text.
pub fn decode_str(text: &str) -> Result<Message, DecodeError> {
    decode(text.as_bytes())
}

/// Decode a message from an already-parsed JSON value.
pub fn decode_value(value: Value) -> Result<Message, DecodeError> {
    if let Some(kind) = value
        .get("type")
        .and_then(Value::as_str)
        .and_then(MessageKind::from_tag)
    {
        return kind
            .decode(value)
            .map_err(|source| DecodeError::InvalidPayload {
                kind: kind.name().to_string(),
                source,
            });
    }

    if let Some(name) = value.get("event").and_then(Value::as_str)
        && EngineEvent::is_known(name)
    {
        let name = name.to_string();
        return serde_json::from_value::<EngineEvent>(value)
            .map(Message::Event)
            .map_err(|source| DecodeError::InvalidPayload { kind: name, source });
    }

    for (_, probe) in STRUCTURAL_CANDIDATES {
        if let Some(message) = probe(&value) {
            return Ok(message);
        }
    }

    Err(DecodeError::unrecognized(&value))
}
