mod cli;
mod commands;
mod config;
mod output;
mod setup;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use config::CliConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = CliConfig::load();

    // Keep the guard alive so buffered log lines reach the file.
    let _guard = setup::init_logging(cli.verbose)?;

    let settings = config.engine_settings(&cli.connection);
    let format = cli.format;

    match cli.command {
        Commands::Decode { file } => commands::decode::run(file.as_deref(), format),
        Commands::Resolve(args) => commands::resolve::run(args, settings, format).await,
        Commands::Replay(args) => commands::replay::run(args, settings, format).await,
        Commands::Cache { command } => commands::cache::run(command, settings, format).await,
    }
}
