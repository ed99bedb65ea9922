//! CartPilot Storage - Local persistence and payload crypto.
//!
//! - `encryption`: CryptoJS-compatible passphrase cipher for config service bodies
//! - `cache_file`: the durable `{shopId → CachedConfig}` map
//! - `paths`: data directory layout (`CARTPILOT_DIR` or `~/.cartpilot`)

pub mod cache_file;
pub mod encryption;
pub mod paths;

pub use cache_file::{CacheEntries, CacheFileStore, StorageError};
pub use encryption::{CipherError, PayloadCipher};
