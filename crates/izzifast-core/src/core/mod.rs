//! Controller-facing abstractions
//!
//! - [`listener`]: the synchronous change-notification interface
//! - [`event`]: broadcast dispatch of change events to host subscribers

pub mod event;
pub mod listener;

pub use listener::{ListenerRegistry, SensorListener, SensorListenerHandle};
