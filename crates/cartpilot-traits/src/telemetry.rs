use async_trait::async_trait;
use cartpilot_contracts::LogEvent;

/// Destination for diagnostic records emitted by the page engine.
///
/// Delivery is best effort: implementations swallow their own failures.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn log(&self, event: LogEvent);
}

/// Sink that drops every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

#[async_trait]
impl TelemetrySink for NoopTelemetry {
    async fn log(&self, _event: LogEvent) {}
}
