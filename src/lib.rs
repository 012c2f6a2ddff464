//! # izzifast
//!
//! Bus controller for the iZZi ERV 300 heat recovery ventilation unit.
//!
//! ## Architecture
//!
//! izzifast is organized as a workspace with multiple crates:
//!
//! 1. **izzifast-core** - Errors, sensor ids and values, listeners, events
//! 2. **izzifast-communication** - TCP and serial transports, frame codec,
//!    value tables and the controller loop
//! 3. **izzifast-settings** - Configuration files
//! 4. **izzifast** - Host bridge and the command-line binary
//!
//! The controller either drives the bus (master) or mirrors another
//! controller's commands (slave). Every changed value is republished on a
//! broadcast channel by [`IzzifastBridge`].

pub mod bridge;

pub use bridge::{connection_params, split_fan_speed, IzzifastBridge, UNIQUE_ID};

pub use izzifast_communication::{
    list_ports, open_transport, ConnectionDriver, ConnectionParams, ControllerTiming,
    IzziController, SerialPortInfo, Transport,
};

pub use izzifast_core::{
    BypassMode, ConnectionError, ConnectionState, ControllerError, Error, EventDispatcher,
    Result, Role, SensorEvent, SensorId, SensorKind, SensorListener, SensorValue,
    ValidationError, VentMode,
};

pub use izzifast_settings::{Config, ConnectionSettings, ConnectionType, SettingsError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output with pretty formatting
/// - RUST_LOG environment variable support
///
/// `verbose` raises the default level from INFO to DEBUG.
pub fn init_logging(verbose: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let env_filter = EnvFilter::from_default_env().add_directive(level.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_level(true)
        .with_thread_names(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
