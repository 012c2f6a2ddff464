//! TCP transport
//!
//! Connects to a serial-to-Ethernet bridge that relays the unit's bus
//! verbatim. Reads use the socket read timeout; writes go out in one
//! `write_all` per frame.

use super::{framing, Transport, TransportResult};
use crate::firmware::izzi::Frame;
use izzifast_core::ConnectionError;
use std::io::Write;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Upper bound for establishing the TCP connection
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Read timeout while draining stale input after connecting
const DRAIN_TIMEOUT: Duration = Duration::from_millis(10);

/// Information about a TCP bridge endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpConnectionInfo {
    /// Host name or address
    pub host: String,
    /// Port number
    pub port: u16,
}

impl std::fmt::Display for TcpConnectionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Transport over a TCP stream socket
pub struct TcpTransport {
    info: TcpConnectionInfo,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    /// Create an unconnected transport for `host:port`
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            info: TcpConnectionInfo {
                host: host.into(),
                port,
            },
            stream: None,
        }
    }

    pub fn info(&self) -> &TcpConnectionInfo {
        &self.info
    }

    fn open_stream(&self) -> TransportResult<TcpStream> {
        let endpoint = self.info.to_string();
        let addrs = (self.info.host.as_str(), self.info.port)
            .to_socket_addrs()
            .map_err(|e| ConnectionError::FailedToOpen {
                endpoint: endpoint.clone(),
                reason: format!("address resolution failed: {}", e),
            })?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_error = Some(e),
            }
        }

        Err(ConnectionError::FailedToOpen {
            endpoint,
            reason: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no addresses resolved".to_string()),
        })
    }

    fn stream_mut(&mut self) -> TransportResult<&mut TcpStream> {
        self.stream.as_mut().ok_or(ConnectionError::NotConnected)
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self) -> TransportResult<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let mut stream = self.open_stream()?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(DRAIN_TIMEOUT))?;
        framing::drain(&mut stream)?;

        tracing::info!("TCP connection to {} established", self.info);
        self.stream = Some(stream);
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                tracing::debug!("Shutdown of {} failed: {}", self.info, e);
            }
            tracing::info!("TCP connection to {} closed", self.info);
        }
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn read_frame(&mut self, timeout: Duration) -> TransportResult<Option<Frame>> {
        let stream = self.stream_mut()?;
        // A zero timeout would mean "block forever"
        stream.set_read_timeout(Some(timeout.max(Duration::from_millis(1))))?;
        framing::read_frame(stream)
    }

    fn write_frame(&mut self, frame: &Frame) -> TransportResult<()> {
        let stream = self.stream_mut()?;
        tracing::debug!("TX {}", frame.to_hex());
        stream
            .write_all(frame.as_bytes())
            .and_then(|_| stream.flush())
            .map_err(|e| ConnectionError::WriteFailed {
                reason: e.to_string(),
            })
    }

    fn endpoint(&self) -> String {
        self.info.to_string()
    }
}
