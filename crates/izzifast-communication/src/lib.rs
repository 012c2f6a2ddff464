//! # izzifast Communication
//!
//! Transports and the bus protocol for the iZZi ERV 300 ventilation unit.
//! Supports TCP bridges and direct serial lines. The `firmware::izzi` module
//! holds the frame layout, the sensor/actuator/virtual tables and the
//! controller loop that drives them.

pub mod communication;
pub mod firmware;

pub use communication::{
    open_transport, serial::list_ports, serial::SerialPortInfo, serial::SerialTransport,
    tcp::TcpTransport, ConnectionDriver, ConnectionParams, Transport, TransportResult,
};

pub use firmware::izzi::{
    ActuatorCommand, ControllerTiming, Frame, FrameKind, IzziController, DEFAULT_TCP_PORT,
    FRAME_LEN,
};
