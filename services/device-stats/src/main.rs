//! Device Stats CLI
//!
//! Command-line interface for the sensor reading statistics service.

use std::path::PathBuf;

use clap::Parser;
use device_stats::{load_config, Config, ServerBuilder};
use tracing::Level;

#[derive(Parser)]
#[command(name = "device-stats")]
#[command(about = "Sensor reading ingestion and statistics service")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server port (overrides config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Bind address (overrides config file)
    #[arg(long)]
    bind_address: Option<String>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    tracing::debug!(
        "Parsed command line arguments: config={:?}, port={:?}, bind_address={:?}, log_level={:?}",
        args.config,
        args.port,
        args.bind_address,
        args.log_level
    );

    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(bind_address) = args.bind_address {
        config.server.bind_address = bind_address;
    }

    tracing::info!("Starting device stats service");
    tracing::debug!(
        "API prefix: {}, max page size: {}",
        config.api.prefix,
        config.api.max_page_size
    );

    ServerBuilder::new(config).build().await?.start().await?;

    Ok(())
}
