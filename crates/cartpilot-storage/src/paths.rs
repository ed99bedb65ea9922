use anyhow::Result;
use std::path::PathBuf;

const CARTPILOT_DIR: &str = ".cartpilot";
const CACHE_FILE: &str = "config-cache.json";
const LOGS_DIR: &str = "logs";

/// Environment variable to override the CartPilot data directory.
pub const CARTPILOT_DIR_ENV: &str = "CARTPILOT_DIR";

/// Resolve the CartPilot data directory.
/// Priority: CARTPILOT_DIR env var > ~/.cartpilot/
pub fn resolve_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(CARTPILOT_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|h| h.join(CARTPILOT_DIR))
        .ok_or_else(|| anyhow::anyhow!("Failed to determine home directory"))
}

/// Ensure the data directory exists and return its path.
pub fn ensure_data_dir() -> Result<PathBuf> {
    let dir = resolve_data_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Get the config cache path: ~/.cartpilot/config-cache.json
pub fn cache_file_path() -> Result<PathBuf> {
    Ok(resolve_data_dir()?.join(CACHE_FILE))
}

/// Get the logs directory: ~/.cartpilot/logs/
pub fn logs_dir() -> Result<PathBuf> {
    let dir = resolve_data_dir()?.join(LOGS_DIR);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
