//! Durable copy of the config cache.
//!
//! The file holds one JSON object keyed by shop id. It is always rewritten
//! wholesale through a temp file in the same directory, so readers see either
//! the previous map or the new one.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use cartpilot_contracts::CachedConfig;
use tempfile::NamedTempFile;
use thiserror::Error;

/// Cached configs keyed by shop id.
pub type CacheEntries = BTreeMap<String, CachedConfig>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("cache file {path} is not accessible: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cache file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct CacheFileStore {
    path: PathBuf,
}

impl CacheFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored map. A missing or empty file yields `None`.
    pub fn load(&self) -> Result<Option<CacheEntries>, StorageError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(self.io_error(source)),
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|source| StorageError::Corrupt {
                path: self.path.clone(),
                source,
            })
    }

    /// Replace the stored map with `entries`.
    pub fn save(&self, entries: &CacheEntries) -> Result<(), StorageError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|source| self.io_error(source))?;

        let encoded = serde_json::to_vec_pretty(entries)
            .map_err(|err| self.io_error(io::Error::other(err)))?;

        let mut temp = NamedTempFile::new_in(dir).map_err(|source| self.io_error(source))?;
        temp.write_all(&encoded)
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|source| self.io_error(source))?;
        temp.persist(&self.path)
            .map_err(|err| self.io_error(err.error))?;

        tracing::debug!(path = %self.path.display(), entries = entries.len(), "Cache file written");
        Ok(())
    }

    fn io_error(&self, source: io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartpilot_contracts::AutomationConfig;
    use tempfile::tempdir;

    fn config(shop_id: &str, version: f64) -> AutomationConfig {
        AutomationConfig {
            version,
            task_id: format!("task-{shop_id}"),
            shop_id: shop_id.to_string(),
            shop_name: format!("Shop {shop_id}"),
            shop_url: format!("{shop_id}\\.example"),
            checkout_url: "/checkout".to_string(),
            extended_logs: false,
            extended_reports: false,
            inspect: Vec::new(),
            detect: Vec::new(),
            apply: Vec::new(),
            apply_best: Vec::new(),
            selectors_to_check: Vec::new(),
        }
    }

    #[test]
    fn test_missing_file_loads_as_none() {
        let dir = tempdir().unwrap();
        let store = CacheFileStore::new(dir.path().join("config-cache.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let store = CacheFileStore::new(dir.path().join("nested/config-cache.json"));
        let entries = CacheEntries::from([
            ("A".to_string(), CachedConfig::new(10, config("A", 1.0))),
            ("B".to_string(), CachedConfig::new(20, config("B", 1.1))),
        ]);

        store.save(&entries).unwrap();
        assert_eq!(store.load().unwrap(), Some(entries));
    }

    #[test]
    fn test_save_overwrites_wholesale() {
        let dir = tempdir().unwrap();
        let store = CacheFileStore::new(dir.path().join("config-cache.json"));
        store
            .save(&CacheEntries::from([(
                "A".to_string(),
                CachedConfig::new(1, config("A", 1.0)),
            )]))
            .unwrap();
        store.save(&CacheEntries::new()).unwrap();

        assert_eq!(store.load().unwrap(), Some(CacheEntries::new()));
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1, "temp files must not linger");
    }

    #[test]
    fn test_empty_file_loads_as_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config-cache.json");
        fs::write(&path, "  \n").unwrap();
        assert!(CacheFileStore::new(path).load().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config-cache.json");
        fs::write(&path, "{\"A\": 12").unwrap();
        let err = CacheFileStore::new(&path).load().unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }
}
