//! intake-gate
//!
//! Lead capture API for the marketing site: newsletter, artist, listener and
//! investor submissions, each throttled per client.
//!
//! ```text
//!   Client ──▶ request id ──▶ trace ──▶ rate limit ──▶ handler ──▶ Notifier ──▶ log / webhook
//!                                        (per route)    (sanitize)
//! ```

use std::path::PathBuf;

use clap::Parser;

use intake_gate::config::{load_config, IntakeConfig};
use intake_gate::lifecycle::startup;
use intake_gate::observability::logging::init_logging;

#[derive(Parser, Debug)]
#[command(name = "intake-gate")]
#[command(about = "Rate-limited lead intake service", long_about = None)]
struct Args {
    /// Path to a TOML config file. Watched for changes when given.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => IntakeConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "intake-gate starting");

    startup::start(config, args.config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
