use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use cartpilot_contracts::AutomationConfig;
use cartpilot_core::{ConfigCache, Engine, EngineSettings, MerchantDirectory};
use serde_json::json;

use crate::cli::{OutputFormat, ReplayArgs};
use crate::output::{print_json, print_json_pretty};
use crate::setup::{OfflineSource, StdoutEnvironment, StdoutObserver, read_lines};

fn load_defaults(path: &Path) -> Result<Vec<AutomationConfig>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON array of configs", path.display()))
}

/// Route recorded page messages through an engine with no network.
pub async fn run(args: ReplayArgs, settings: EngineSettings, format: OutputFormat) -> Result<()> {
    let defaults = match &args.defaults {
        Some(path) => load_defaults(path)?,
        None => Vec::new(),
    };

    let source = Arc::new(OfflineSource);
    let cache = Arc::new(ConfigCache::in_memory(source.clone(), &settings));
    let engine = Engine::new(
        settings,
        Arc::new(StdoutEnvironment::new(format)),
        source,
        cache,
    )
    .with_observer(Arc::new(StdoutObserver::new(format)))
    .with_directory(MerchantDirectory::new(Vec::new(), defaults))
    .with_promo_codes(args.codes);

    for line in read_lines(args.file.as_deref())? {
        engine.handle_inbound(&line).await?;
    }

    let phase = engine.phase().await;
    let persisted = engine.persisted_state().await;
    if format.is_json() {
        print_json(&json!({ "finalPhase": phase.as_str(), "persistedState": persisted }))?;
    } else {
        println!("final phase: {phase}");
        match persisted {
            Some(state) => {
                println!("persisted state:");
                print_json_pretty(&state)?;
            }
            None => println!("persisted state: none"),
        }
    }
    Ok(())
}
