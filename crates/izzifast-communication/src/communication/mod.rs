//! Byte-stream transports
//!
//! A [`Transport`] carries whole frames between the controller and the bus.
//! Two implementations are interchangeable:
//! - [`tcp::TcpTransport`] for serial-to-Ethernet bridges
//! - [`serial::SerialTransport`] for a direct RS-485 adapter
//!
//! Both share the resynchronizing frame reader in [`framing`].

pub mod framing;
pub mod serial;
pub mod tcp;

use crate::firmware::izzi::constants::DEFAULT_TCP_PORT;
use crate::firmware::izzi::Frame;
use izzifast_core::ConnectionError;
use std::time::Duration;

pub use serial::SerialTransport;
pub use tcp::TcpTransport;

/// Result type for transport operations
pub type TransportResult<T> = std::result::Result<T, ConnectionError>;

/// Frame-level byte-stream endpoint
///
/// Owned by the controller loop for the lifetime of a connection.
pub trait Transport: Send {
    /// Open the endpoint and discard anything the peer already buffered
    fn connect(&mut self) -> TransportResult<()>;

    /// Close the endpoint; closing a closed transport is a no-op
    fn disconnect(&mut self);

    /// Whether the endpoint is open
    fn is_connected(&self) -> bool;

    /// Read one complete frame
    ///
    /// `Ok(None)` means no full frame arrived within `timeout`. Errors mean
    /// the connection is gone.
    fn read_frame(&mut self, timeout: Duration) -> TransportResult<Option<Frame>>;

    /// Send one frame
    fn write_frame(&mut self, frame: &Frame) -> TransportResult<()>;

    /// Human-readable endpoint (host:port or device path)
    fn endpoint(&self) -> String;
}

/// Transport selected by the configuration's `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionDriver {
    /// TCP stream socket
    Tcp,
    /// Serial line
    Serial,
}

/// Endpoint parameters for [`open_transport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    /// Which transport to build
    pub driver: ConnectionDriver,
    /// TCP host name or address
    pub host: String,
    /// TCP port
    pub tcp_port: u16,
    /// Serial device path
    pub device: String,
}

impl ConnectionParams {
    /// Parameters for a TCP bridge
    pub fn tcp(host: impl Into<String>, tcp_port: u16) -> Self {
        Self {
            driver: ConnectionDriver::Tcp,
            host: host.into(),
            tcp_port,
            device: String::new(),
        }
    }

    /// Parameters for a serial device
    pub fn serial(device: impl Into<String>) -> Self {
        Self {
            driver: ConnectionDriver::Serial,
            host: String::new(),
            tcp_port: DEFAULT_TCP_PORT,
            device: device.into(),
        }
    }

    /// Check the fields the selected driver needs
    pub fn validate(&self) -> TransportResult<()> {
        match self.driver {
            ConnectionDriver::Tcp if self.host.trim().is_empty() => {
                Err(ConnectionError::InvalidParameters {
                    reason: "TCP host must not be empty".to_string(),
                })
            }
            ConnectionDriver::Tcp if self.tcp_port == 0 => Err(ConnectionError::InvalidParameters {
                reason: "TCP port must be > 0".to_string(),
            }),
            ConnectionDriver::Serial if self.device.trim().is_empty() => {
                Err(ConnectionError::InvalidParameters {
                    reason: "serial device must not be empty".to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self::tcp("localhost", DEFAULT_TCP_PORT)
    }
}

/// Build the transport the parameters describe
///
/// The transport is returned unconnected; the controller loop connects it.
pub fn open_transport(params: &ConnectionParams) -> TransportResult<Box<dyn Transport>> {
    params.validate()?;
    let transport: Box<dyn Transport> = match params.driver {
        ConnectionDriver::Tcp => Box::new(TcpTransport::new(&params.host, params.tcp_port)),
        ConnectionDriver::Serial => Box::new(SerialTransport::new(&params.device)),
    };
    tracing::debug!("Built {:?} transport for {}", params.driver, transport.endpoint());
    Ok(transport)
}
