//! Command-line runner for the iZZi ERV 300 bus controller.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use izzifast::{init_logging, list_ports, Config, IzzifastBridge, Role};

/// Connect to an iZZi ERV 300 and log every value it reports.
#[derive(Parser, Debug)]
#[command(name = "izzifast")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (.toml or .json); defaults to the platform config dir.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Only listen to another controller, never transmit.
    #[arg(long)]
    slave: bool,

    /// List serial ports that could carry the bus and exit.
    #[arg(long)]
    list_ports: bool,

    /// Verbose output.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    if args.list_ports {
        for port in list_ports()? {
            println!("{}\t{}", port.port_name, port.description);
        }
        return Ok(());
    }

    let path = match args.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let mut config = Config::load_from_file(&path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;
    if args.slave {
        config.role = Role::Slave;
    }

    tracing::info!(
        "Starting {} ({}) as {}",
        config.name,
        izzifast::VERSION,
        config.role
    );

    let mut bridge = IzzifastBridge::from_config(&config)?;
    let mut events = bridge.subscribe();
    bridge.connect().await?;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => tracing::info!("{}", event),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!("Dropped {} events", missed);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("waiting for Ctrl-C")?;
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    bridge.disconnect().await?;
    Ok(())
}
