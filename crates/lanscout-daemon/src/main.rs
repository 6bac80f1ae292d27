//! lanscout Daemon - Main entry point
//!
//! Runs one discovery scan and prints the found address on stdout.

mod config;
mod sink;

use anyhow::Result;
use clap::Parser;
use lanscout_discovery::{HttpProber, ScanOrchestrator, ScanPhase, SystemInterfaces};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "lanscout")]
#[command(about = "Discovers the service-bearing host on the local network")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "lanscout.toml")]
    config: PathBuf,

    /// Service port to probe (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Global scan timeout in milliseconds (overrides the config file)
    #[arg(long)]
    scan_timeout_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Write a default configuration file and exit
    #[arg(long)]
    write_config: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("lanscout v{}", env!("CARGO_PKG_VERSION"));

    if args.write_config {
        config::save_default_config(&args.config)?;
        info!(path = %args.config.display(), "Wrote default configuration");
        return Ok(ExitCode::SUCCESS);
    }

    // Load configuration, then apply CLI overrides
    let mut config = config::load_config(&args.config)?;
    if let Some(port) = args.port {
        config.scan.port = port;
    }
    if let Some(timeout) = args.scan_timeout_ms {
        config.scan.scan_timeout_ms = timeout;
    }
    config.scan.validate()?;

    info!(
        port = config.scan.port,
        interfaces = ?config.scan.interfaces,
        "Starting network scan"
    );

    let orchestrator = ScanOrchestrator::new(
        config.scan,
        Arc::new(SystemInterfaces),
        Arc::new(HttpProber::new()),
        Arc::new(sink::ConsoleSink),
    );

    let mut phase = orchestrator.start_scan().await;
    let terminal = phase.wait_for(|p| p.is_terminal()).await?.clone();

    match terminal {
        ScanPhase::Found(address) => {
            println!("{}", address);
            Ok(ExitCode::SUCCESS)
        }
        _ => Ok(ExitCode::FAILURE),
    }
}
