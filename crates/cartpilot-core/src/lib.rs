//! CartPilot Core - Config resolution and page orchestration.
//!
//! - `transport`: sealed HTTP client for the config service
//! - `cache`: time-bounded, file-backed config cache with a version gate
//! - `directory`: merchant lookup by page location
//! - `bridge`: dispatch scripts and acknowledgement correlation
//! - `engine`: the orchestrator driving one script environment

pub mod bridge;
pub mod cache;
pub mod directory;
pub mod engine;
pub mod error;
pub mod settings;
pub mod transport;
pub mod version;

#[cfg(any(test, feature = "test-utils"))]
pub mod testkit;

pub use cache::ConfigCache;
pub use directory::{MerchantDirectory, is_checkout_page, pattern_matches};
pub use engine::{Engine, Stage, StartOutcome};
pub use error::{EngineError, TransportError};
pub use settings::EngineSettings;
pub use transport::HttpConfigClient;
pub use version::{VersionRejection, check_version};
