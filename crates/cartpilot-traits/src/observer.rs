//! Host-side delegate notified about engine activity.

use std::fmt;

use cartpilot_contracts::{DecodeError, EngineEvent};

/// Lifecycle of one automation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnginePhase {
    Idle,
    Resolving,
    /// No merchant config matched; the page was sent a `check`.
    NoConfig,
    /// An `init` went out and the page is running the scripts.
    AwaitingAutomation,
    Completed,
    Aborted,
}

impl EnginePhase {
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Resolving => "resolving",
            Self::NoConfig => "no-config",
            Self::AwaitingAutomation => "awaiting-automation",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for EnginePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives forwarded engine events. Every method defaults to a no-op.
pub trait EngineObserver: Send + Sync {
    /// A page event, exactly as decoded.
    fn on_event(&self, _event: &EngineEvent) {}

    fn on_phase_change(&self, _from: EnginePhase, _to: EnginePhase) {}

    /// An inbound payload that could not be decoded.
    fn on_decode_error(&self, _error: &DecodeError) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl EngineObserver for NoopObserver {}
