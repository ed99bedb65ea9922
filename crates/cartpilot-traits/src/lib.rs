//! CartPilot Traits - Seams between the orchestrator and its collaborators.
//!
//! - ScriptEnvironment: the embedded page the host evaluates scripts in
//! - EngineObserver and EnginePhase: host-side delegate callbacks
//! - TelemetrySink: diagnostic record delivery
//! - ConfigSource: merchant directory and config lookups
//! - Clock: injectable time for cache freshness

pub mod clock;
pub mod environment;
pub mod observer;
pub mod source;
pub mod telemetry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use environment::ScriptEnvironment;
pub use observer::{EngineObserver, EnginePhase, NoopObserver};
pub use source::ConfigSource;
pub use telemetry::{NoopTelemetry, TelemetrySink};
