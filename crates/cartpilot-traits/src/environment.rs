//! The page-rendering surface, seen from the host.

use anyhow::Result;
use async_trait::async_trait;

/// An embedded page the host can run scripts in.
///
/// Implementations wrap whatever web view the host embeds. Inbound traffic
/// flows the other way: the embedding forwards every message the page posts
/// to `Engine::handle_inbound` in `cartpilot-core`.
#[async_trait]
pub trait ScriptEnvironment: Send + Sync {
    /// Evaluate `script` in the page and wait for it to finish.
    async fn evaluate(&self, script: &str) -> Result<()>;
}
