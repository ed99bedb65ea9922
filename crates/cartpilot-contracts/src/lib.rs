//! CartPilot Contracts - Wire types shared by the host and the page engine.
//!
//! This crate is pure data plus the bridge codec:
//! - Selector, Condition and the Command AST
//! - Merchant, AutomationConfig and CachedConfig
//! - ExecutionContext and PersistedState
//! - Message envelopes and the discriminator-driven codec

pub mod codec;
pub mod command;
pub mod condition;
pub mod config;
pub mod message;
pub mod selector;
pub mod state;

// ── Top-level re-exports ─────────────────────────────────────────────

pub use codec::{DecodeError, decode, decode_str, decode_value, encode, encode_to_string};
pub use command::{
    Command, ExtractCut, InteractAction, InteractResponse, Script, anchors, script_depth,
};
pub use condition::{Condition, ElementVisible, LogicCondition, LogicOperator};
pub use config::{AutomationConfig, CachedConfig, Merchant};
pub use message::{
    AbortMessage, CheckMessage, CheckoutEvent, ClearPersistMessage, DefaultSelectors, EngineEvent,
    InitMessage, LogEvent, LogMessage, Message, MessageKind, PersistMessage, ProgressEvent,
};
pub use selector::{Selector, ShadowSelector};
pub use state::{
    CheckoutState, DetectState, EngineState, ExecutionContext, FinalCost, PersistedState,
    ProgressStatus,
};
