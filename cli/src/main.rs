//! CLI for tsbench
//!
//! Commands:
//! - render: print the SQL generated for every query shape
//! - smoke: run a short insert/query cycle against a live node over REST
//! - config: print the effective adapter configuration

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "tsbench")]
#[command(about = "tsbench - IoTDB benchmark adapter", long_about = None)]
#[command(version)]
struct Cli {
    /// Adapter configuration file (TOML)
    #[arg(short, long, global = true, env = "TSBENCH_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the statements and queries generated for a device
    Render(commands::render::RenderArgs),

    /// Register, insert and query a few synthetic devices over REST
    Smoke(commands::smoke::SmokeArgs),

    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    let config = tsbench_iotdb::AdapterConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Render(args) => commands::render::run(config, args),
        Commands::Smoke(args) => commands::smoke::run(config, args).await,
        Commands::Config => commands::config::run(&config),
    }
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init();
    }
}
