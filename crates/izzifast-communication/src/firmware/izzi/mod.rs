//! iZZi ERV 300 protocol
//!
//! Frame layout, the three value tables (sensors, actuators, virtual values)
//! and the controller that runs them against a transport.

pub mod actuators;
pub mod constants;
pub mod controller;
pub mod frame;
pub mod sensors;
pub mod virtuals;

pub use actuators::{ActuatorCommand, ActuatorEntry, ActuatorTable};
pub use constants::{DEFAULT_COMMAND_FRAME, DEFAULT_TCP_PORT, FRAME_LEN, SERIAL_BAUD_RATE};
pub use controller::{ControllerTiming, IzziController};
pub use frame::{Frame, FrameKind};
pub use sensors::{Decode, SensorEntry, SensorTable};
pub use virtuals::{efficiency, ComputationError, VirtualEntry, VirtualTable};
