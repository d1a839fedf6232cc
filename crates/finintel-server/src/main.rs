//! FinIntel gateway entry point.

use anyhow::Result;
use clap::Parser;
use finintel_server::{AppConfig, Application};
use tracing::info;

/// Compliance-gated financial data gateway
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via FININTEL_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logging needs the telemetry section, so the config is parsed first.
    let config = AppConfig::load(args.config.as_deref())?;
    finintel_telemetry::init_logging(&config.telemetry.logging())?;

    info!("Starting FinIntel gateway v{}", env!("CARGO_PKG_VERSION"));
    info!(
        port = config.server.port,
        max_calls = config.rate_limit.max_calls,
        cache_ttl_secs = config.cache.ttl_secs,
        "Configuration loaded"
    );

    let app = Application::new(config)?;
    app.run().await?;

    Ok(())
}
