use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use country_atlas::config::Config;

mod commands;

#[derive(Parser)]
#[command(
    name = "country-atlas",
    version,
    about = "Country data cache with exchange-rate based GDP estimates",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file (environment variables are used otherwise)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the configured format
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Address to bind, e.g. 127.0.0.1:8000
        #[arg(short, long)]
        bind: Option<std::net::SocketAddr>,
    },

    /// Run a single refresh and exit
    Refresh,

    /// Print the number of cached countries and the last refresh time
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    let format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&format, &config.logging.level, cli.verbose)?;

    tracing::info!("country-atlas starting");

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(addr) = bind {
                config.server.bind_address = addr;
            }
            tracing::info!(bind = %config.server.bind_address, "Starting serve command");
            commands::serve(config).await?;
        }

        Commands::Refresh => {
            tracing::info!("Starting refresh command");
            commands::refresh(config).await?;
        }

        Commands::Status => {
            commands::status(config)?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { level };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "country_atlas={level},tower_http={level},warn"
        ))
    });

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
