use std::sync::Arc;

use anyhow::{Context, Result};
use cartpilot_core::{ConfigCache, Engine, EngineSettings, HttpConfigClient, StartOutcome};
use cartpilot_storage::{CacheFileStore, paths};
use serde_json::json;

use crate::cli::{OutputFormat, ResolveArgs};
use crate::output::print_json;
use crate::setup::StdoutEnvironment;

/// Install from the config service and start the engine for one location.
pub async fn run(args: ResolveArgs, settings: EngineSettings, format: OutputFormat) -> Result<()> {
    settings.validate()?;

    let client = Arc::new(HttpConfigClient::new(&settings).context("Failed to build HTTP client")?);
    let store = CacheFileStore::new(paths::cache_file_path()?);
    let cache = Arc::new(ConfigCache::new(client.clone(), store, &settings));
    let environment = Arc::new(StdoutEnvironment::new(format));

    let engine = Engine::new(settings, environment, client.clone(), cache).with_telemetry(client);
    engine.install().await;
    let outcome = engine.start_engine(&args.url, args.codes).await?;

    match outcome {
        StartOutcome::NoConfig if format.is_json() => {
            print_json(&json!({ "outcome": "no-config" }))?
        }
        StartOutcome::NoConfig => println!("No merchant config for {}", args.url),
        StartOutcome::Started { shop_id, checkout } if format.is_json() => print_json(&json!({
            "outcome": "started",
            "shopId": shop_id,
            "checkout": checkout,
        }))?,
        StartOutcome::Started { shop_id, checkout } => {
            println!("Started {shop_id} (checkout: {checkout})")
        }
    }
    Ok(())
}
