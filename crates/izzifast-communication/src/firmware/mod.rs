//! Firmware protocol implementations
//!
//! Supported units:
//! - iZZi ERV 300: heat recovery ventilation unit on a shared RS-485 bus

pub mod izzi;
