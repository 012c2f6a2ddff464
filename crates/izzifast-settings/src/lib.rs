//! izzifast Settings Crate
//!
//! Loads, validates and saves the configuration that tells the controller how
//! to reach the unit and which defaults to apply on startup.

pub mod config;
pub mod error;

pub use config::{Config, ConnectionSettings, ConnectionType};
pub use error::{ConfigError, Result, SettingsError};
