use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Output format for CLI commands
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn is_json(self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

#[derive(Parser)]
#[command(name = "cartpilot")]
#[command(version, about = "CartPilot - promo code checkout automation bridge")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

/// Config service connection; each flag overrides config.toml.
#[derive(Args, Debug, Default, Clone)]
pub struct ConnectionArgs {
    /// Config service base URL
    #[arg(long, global = true, env = "CARTPILOT_SERVER")]
    pub server: Option<String>,

    /// Client id sent with every request
    #[arg(long, global = true, env = "CARTPILOT_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Pre-shared key for sealed payloads
    #[arg(long, global = true, env = "CARTPILOT_KEY", hide_env_values = true)]
    pub key: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decode JSON-lines bridge messages (stdin by default)
    Decode {
        /// File with one message per line
        file: Option<PathBuf>,
    },

    /// Resolve the config for a page and print the message sent to it
    Resolve(ResolveArgs),

    /// Feed inbound page messages to an offline engine
    Replay(ReplayArgs),

    /// Inspect the durable config cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Args)]
pub struct ResolveArgs {
    /// Page location
    #[arg(long)]
    pub url: String,

    /// Promo code to try (repeatable)
    #[arg(long = "code")]
    pub codes: Vec<String>,
}

#[derive(Args)]
pub struct ReplayArgs {
    /// File with one inbound message per line (stdin by default)
    pub file: Option<PathBuf>,

    /// JSON array of default configs the page may select
    #[arg(long)]
    pub defaults: Option<PathBuf>,

    /// Promo codes handed to a selected default config
    #[arg(long = "code")]
    pub codes: Vec<String>,
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// List cached configs
    List,

    /// Remove every cached config
    Clear,

    /// Remove one shop's cached config
    Invalidate {
        /// Shop id
        shop_id: String,
    },
}
