use std::sync::Arc;

use anyhow::Result;
use cartpilot_core::{ConfigCache, EngineSettings};
use cartpilot_storage::{CacheFileStore, paths};
use chrono::{TimeZone, Utc};
use serde_json::json;

use crate::cli::{CacheCommands, OutputFormat};
use crate::output::print_json;
use crate::setup::OfflineSource;

pub async fn run(command: CacheCommands, settings: EngineSettings, format: OutputFormat) -> Result<()> {
    let store = CacheFileStore::new(paths::cache_file_path()?);
    match command {
        CacheCommands::List => list(&store, &settings, format),
        CacheCommands::Clear => {
            cache_over(store, &settings).clear().await?;
            println!("Cache cleared");
            Ok(())
        }
        CacheCommands::Invalidate { shop_id } => {
            if cache_over(store, &settings).invalidate(&shop_id).await? {
                println!("Invalidated {shop_id}");
            } else {
                println!("{shop_id} was not cached");
            }
            Ok(())
        }
    }
}

fn cache_over(store: CacheFileStore, settings: &EngineSettings) -> ConfigCache {
    ConfigCache::new(Arc::new(OfflineSource), store, settings)
}

fn list(store: &CacheFileStore, settings: &EngineSettings, format: OutputFormat) -> Result<()> {
    let entries = store.load()?.unwrap_or_default();
    let now = Utc::now().timestamp_millis();
    let ttl_ms = settings.cache_ttl_millis();

    if format.is_json() {
        let rows: Vec<_> = entries
            .iter()
            .map(|(shop_id, entry)| {
                json!({
                    "shopId": shop_id,
                    "version": entry.config.version,
                    "timestamp": entry.timestamp,
                    "fresh": now - entry.timestamp < ttl_ms,
                })
            })
            .collect();
        return print_json(&rows);
    }

    if entries.is_empty() {
        println!("No cached configs in {}", store.path().display());
        return Ok(());
    }
    for (shop_id, entry) in &entries {
        let fetched = Utc
            .timestamp_millis_opt(entry.timestamp)
            .single()
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| entry.timestamp.to_string());
        let freshness = if now - entry.timestamp < ttl_ms {
            "fresh"
        } else {
            "stale"
        };
        println!(
            "{shop_id}\tv{}\t{fetched}\t{freshness}",
            entry.config.version
        );
    }
    Ok(())
}
