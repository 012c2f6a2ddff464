//! # izzifast Core
//!
//! Core types shared by every izzifast crate: the error taxonomy, the
//! identifiers and values published for the ventilation unit, the listener
//! interface the controller notifies, and the broadcast dispatcher hosts
//! subscribe to.

pub mod core;
pub mod data;
pub mod error;

pub use core::{
    event::{EventDispatcher, SensorEvent},
    ListenerRegistry, SensorListener, SensorListenerHandle,
};

pub use data::{BypassMode, ConnectionState, Role, SensorId, SensorKind, SensorValue, VentMode};

pub use error::{ConnectionError, ControllerError, Error, Result, ValidationError};
