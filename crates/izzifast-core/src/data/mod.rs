//! Data models for published values and controller modes
//!
//! This module provides:
//! - The identifier space shared by physical sensors, actuator echoes,
//!   virtual values and host-side values
//! - The value type carried by change notifications
//! - Connection state and bus role
//! - Bypass and vent mode enumerations with their wire codes and names

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which table a [`SensorId`] belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorKind {
    /// Decoded from status frames
    Sensor,
    /// Echo of a byte in the outgoing command frame
    Actuator,
    /// Derived value with no wire representation
    Virtual,
    /// Published by the host bridge, never by the controller
    Host,
}

/// Identifier of every value published to listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorId {
    /// Supply air temperature (°C)
    SupplyTemperature,
    /// Extract air temperature (°C)
    ExtractTemperature,
    /// Exhaust air temperature (°C)
    ExhaustTemperature,
    /// Outdoor air temperature (°C)
    OutdoorTemperature,
    /// Bypass damper state
    BypassState,
    /// Service cover state
    CoverState,
    /// Defrost cycle state
    DefrostState,
    /// Supply fan speed (%)
    SupplyFanSpeed,
    /// Extract fan speed (%)
    ExtractFanSpeed,
    /// Unit on/off code
    UnitState,
    /// Bypass opening temperature (°C)
    BypassTemperature,
    /// Bypass mode code
    BypassMode,
    /// Vent mode code
    VentMode,
    /// Heat recovery efficiency (%)
    Efficiency,
    /// Fan percentage last accepted by the host
    FanMode,
    /// Configured extract correction (%)
    ExtractCorrection,
}

impl SensorId {
    /// All identifiers, in publication order
    pub const ALL: [SensorId; 16] = [
        SensorId::SupplyTemperature,
        SensorId::ExtractTemperature,
        SensorId::ExhaustTemperature,
        SensorId::OutdoorTemperature,
        SensorId::BypassState,
        SensorId::CoverState,
        SensorId::DefrostState,
        SensorId::SupplyFanSpeed,
        SensorId::ExtractFanSpeed,
        SensorId::UnitState,
        SensorId::BypassTemperature,
        SensorId::BypassMode,
        SensorId::VentMode,
        SensorId::Efficiency,
        SensorId::FanMode,
        SensorId::ExtractCorrection,
    ];

    /// Table the identifier lives in
    pub fn kind(&self) -> SensorKind {
        match self {
            SensorId::SupplyTemperature
            | SensorId::ExtractTemperature
            | SensorId::ExhaustTemperature
            | SensorId::OutdoorTemperature
            | SensorId::BypassState
            | SensorId::CoverState
            | SensorId::DefrostState => SensorKind::Sensor,
            SensorId::SupplyFanSpeed
            | SensorId::ExtractFanSpeed
            | SensorId::UnitState
            | SensorId::BypassTemperature
            | SensorId::BypassMode => SensorKind::Actuator,
            SensorId::VentMode | SensorId::Efficiency => SensorKind::Virtual,
            SensorId::FanMode | SensorId::ExtractCorrection => SensorKind::Host,
        }
    }

    /// Stable snake_case key, used in logs and event topics
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorId::SupplyTemperature => "supply_temperature",
            SensorId::ExtractTemperature => "extract_temperature",
            SensorId::ExhaustTemperature => "exhaust_temperature",
            SensorId::OutdoorTemperature => "outdoor_temperature",
            SensorId::BypassState => "bypass_state",
            SensorId::CoverState => "cover_state",
            SensorId::DefrostState => "defrost_state",
            SensorId::SupplyFanSpeed => "supply_fan_speed",
            SensorId::ExtractFanSpeed => "extract_fan_speed",
            SensorId::UnitState => "unit_state",
            SensorId::BypassTemperature => "bypass_temperature",
            SensorId::BypassMode => "bypass_mode",
            SensorId::VentMode => "vent_mode",
            SensorId::Efficiency => "efficiency",
            SensorId::FanMode => "fan_mode",
            SensorId::ExtractCorrection => "extract_correction",
        }
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value carried by a change notification
///
/// Efficiency degrades to `Unavailable` when one of its inputs has not been
/// observed yet; every other id always carries a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorValue {
    /// A decoded or computed reading
    Value(i32),
    /// No valid reading
    Unavailable,
}

impl SensorValue {
    /// Numeric reading, if any
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            SensorValue::Value(v) => Some(*v),
            SensorValue::Unavailable => None,
        }
    }

    /// True when the value carries a reading
    pub fn is_available(&self) -> bool {
        matches!(self, SensorValue::Value(_))
    }
}

impl From<i32> for SensorValue {
    fn from(v: i32) -> Self {
        SensorValue::Value(v)
    }
}

impl From<Option<i32>> for SensorValue {
    fn from(v: Option<i32>) -> Self {
        v.map_or(SensorValue::Unavailable, SensorValue::Value)
    }
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorValue::Value(v) => write!(f, "{}", v),
            SensorValue::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Connection state of the controller loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ConnectionState {
    /// No transport connection
    #[default]
    Disconnected,
    /// Transport connect in progress
    Connecting,
    /// Connected and reading frames
    Synchronized,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Synchronized => write!(f, "Synchronized"),
        }
    }
}

/// Bus role of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Originates command frames
    #[default]
    Master,
    /// Only observes another controller's command frames
    Slave,
}

impl Role {
    /// Whether this role ever writes to the bus
    pub fn transmits(&self) -> bool {
        matches!(self, Role::Master)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Master => write!(f, "master"),
            Role::Slave => write!(f, "slave"),
        }
    }
}

/// Bypass damper mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BypassMode {
    /// Unit decides based on the bypass temperature
    #[default]
    Auto = 0,
    /// Always open
    Open = 1,
    /// Always closed
    Closed = 2,
}

impl BypassMode {
    /// Wire code of the mode
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Host-facing name
    pub fn name(&self) -> &'static str {
        match self {
            BypassMode::Auto => "auto",
            BypassMode::Open => "open",
            BypassMode::Closed => "closed",
        }
    }
}

impl TryFrom<i32> for BypassMode {
    type Error = ValidationError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(BypassMode::Auto),
            1 => Ok(BypassMode::Open),
            2 => Ok(BypassMode::Closed),
            other => Err(ValidationError::BypassMode(other)),
        }
    }
}

impl FromStr for BypassMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(BypassMode::Auto),
            "open" => Ok(BypassMode::Open),
            "closed" => Ok(BypassMode::Closed),
            other => Err(ValidationError::UnknownName {
                kind: "bypass mode",
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for BypassMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ventilation override mode
///
/// Modes scale the fan targets rather than replacing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VentMode {
    /// No override
    #[default]
    None = 0,
    /// Reduced extract so a fireplace can draw
    Fireplace = 1,
    /// Supply fan stopped while windows are open
    OpenWindow = 2,
    /// Reduced extract while a cooker hood runs
    CookerHood = 3,
}

impl VentMode {
    /// Numeric code published for the mode
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Host-facing name
    pub fn name(&self) -> &'static str {
        match self {
            VentMode::None => "none",
            VentMode::Fireplace => "fireplace",
            VentMode::OpenWindow => "open windows",
            VentMode::CookerHood => "cooker hood",
        }
    }
}

impl TryFrom<i32> for VentMode {
    type Error = ValidationError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(VentMode::None),
            1 => Ok(VentMode::Fireplace),
            2 => Ok(VentMode::OpenWindow),
            3 => Ok(VentMode::CookerHood),
            other => Err(ValidationError::VentMode(other)),
        }
    }
}

impl FromStr for VentMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(VentMode::None),
            "fireplace" => Ok(VentMode::Fireplace),
            "open windows" => Ok(VentMode::OpenWindow),
            "cooker hood" => Ok(VentMode::CookerHood),
            other => Err(ValidationError::UnknownName {
                kind: "vent mode",
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for VentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_kinds() {
        assert_eq!(SensorId::OutdoorTemperature.kind(), SensorKind::Sensor);
        assert_eq!(SensorId::BypassMode.kind(), SensorKind::Actuator);
        assert_eq!(SensorId::Efficiency.kind(), SensorKind::Virtual);
        assert_eq!(SensorId::FanMode.kind(), SensorKind::Host);
    }

    #[test]
    fn test_sensor_id_keys_are_unique() {
        let mut keys: Vec<&str> = SensorId::ALL.iter().map(|id| id.as_str()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), SensorId::ALL.len());
    }

    #[test]
    fn test_bypass_mode_codes() {
        assert_eq!(BypassMode::try_from(2), Ok(BypassMode::Closed));
        assert_eq!(BypassMode::try_from(3), Err(ValidationError::BypassMode(3)));
        assert_eq!(BypassMode::try_from(-1), Err(ValidationError::BypassMode(-1)));
        assert_eq!("open".parse::<BypassMode>(), Ok(BypassMode::Open));
        assert!("sometimes".parse::<BypassMode>().is_err());
    }

    #[test]
    fn test_vent_mode_names_round_trip() {
        for code in 0..=3 {
            let mode = VentMode::try_from(code).unwrap();
            assert_eq!(mode.name().parse::<VentMode>(), Ok(mode));
            assert_eq!(i32::from(mode.code()), code);
        }
        assert_eq!(VentMode::try_from(4), Err(ValidationError::VentMode(4)));
    }

    #[test]
    fn test_sensor_value_conversions() {
        assert_eq!(SensorValue::from(Some(12)), SensorValue::Value(12));
        assert_eq!(SensorValue::from(None), SensorValue::Unavailable);
        assert_eq!(SensorValue::Unavailable.to_string(), "unavailable");
        assert_eq!(SensorValue::Value(-4).as_i32(), Some(-4));
    }
}
