//! Error handling for izzifast
//!
//! Provides the error types used across the workspace:
//! - Connection errors (transport connect/read/write failures)
//! - Validation errors (setter arguments out of range)
//! - Controller errors (background loop lifecycle)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Connection error type
///
/// Represents failures of the byte-stream transport. None of these are fatal
/// to the controller loop; they trigger the reconnect backoff.
#[derive(Error, Debug, Clone)]
pub enum ConnectionError {
    /// Transport used before `connect` succeeded
    #[error("Transport not connected")]
    NotConnected,

    /// Failed to open the endpoint
    #[error("Failed to open {endpoint}: {reason}")]
    FailedToOpen {
        /// The endpoint that failed to open (host:port or device path).
        endpoint: String,
        /// The reason the endpoint failed to open.
        reason: String,
    },

    /// Peer closed the stream or the device went away
    #[error("Connection lost: {reason}")]
    ConnectionLost {
        /// The reason the connection was lost.
        reason: String,
    },

    /// Frame could not be written
    #[error("Write failed: {reason}")]
    WriteFailed {
        /// The reason the write failed.
        reason: String,
    },

    /// Invalid connection parameters
    #[error("Invalid connection parameters: {reason}")]
    InvalidParameters {
        /// The reason the parameters are invalid.
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {reason}")]
    IoError {
        /// The reason for the I/O error.
        reason: String,
    },
}

impl From<std::io::Error> for ConnectionError {
    fn from(e: std::io::Error) -> Self {
        ConnectionError::IoError {
            reason: e.to_string(),
        }
    }
}

/// Validation error type
///
/// Returned by setters when an argument is out of range. The rejected call
/// never mutates controller state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Bypass mode outside auto/open/closed
    #[error("Invalid bypass mode {0} (expected 0..=2)")]
    BypassMode(i32),

    /// Bypass temperature outside the accepted window
    #[error("Invalid bypass temperature {0} (expected 18..=26)")]
    BypassTemperature(i32),

    /// Fan speed pair rejected
    #[error("Invalid fan speed supply={supply} extract={extract}")]
    FanSpeed {
        /// Requested supply fan speed.
        supply: i32,
        /// Requested extract fan speed.
        extract: i32,
    },

    /// Fan percentage outside the host-facing window
    #[error("Invalid fan percentage {0} (expected 20..=100)")]
    FanPercentage(i32),

    /// Vent mode outside the known set
    #[error("Invalid vent mode {0}")]
    VentMode(i32),

    /// Mode name not recognised
    #[error("Unknown {kind} name '{name}'")]
    UnknownName {
        /// Which kind of name was parsed (bypass mode, vent mode, ...).
        kind: &'static str,
        /// The rejected name.
        name: String,
    },
}

/// Controller error type
///
/// Lifecycle failures of the background loop. These are the only errors
/// reported as hard errors to the caller.
#[derive(Error, Debug, Clone)]
pub enum ControllerError {
    /// `connect` called while the loop is already running
    #[error("Controller loop already running")]
    AlreadyRunning,

    /// `disconnect` called without a running loop
    #[error("Controller loop not running")]
    NotRunning,

    /// The background task could not be started
    #[error("Could not start controller task: {reason}")]
    StartFailed {
        /// The reason the task could not be started.
        reason: String,
    },

    /// The background task panicked or was cancelled
    #[error("Controller task failed: {reason}")]
    TaskFailed {
        /// The reason reported by the runtime.
        reason: String,
    },
}

/// Main error type for izzifast
///
/// A unified error type that can represent any error from all layers.
#[derive(Error, Debug)]
pub enum Error {
    /// Connection error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Validation error
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Controller error
    #[error(transparent)]
    Controller(#[from] ControllerError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Connection(_) | Error::Io(_))
    }

    /// Check if this is a validation error
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// Check if this is a controller error
    pub fn is_controller_error(&self) -> bool {
        matches!(self, Error::Controller(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
