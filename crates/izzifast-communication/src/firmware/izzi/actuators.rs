//! Actuator table
//!
//! Encode rules for the host-controlled bytes of the command frame. Each
//! entry holds a target, the byte it lands in and an optional scale applied
//! by the active vent mode. What gets published is the on-wire byte, not the
//! unscaled target.

use super::constants::*;
use super::frame::Frame;
use izzifast_core::{BypassMode, SensorId, ValidationError, VentMode};

/// One host-controlled command field
#[derive(Debug, Clone, PartialEq)]
pub struct ActuatorEntry {
    pub id: SensorId,
    /// `None` adopts whatever the command buffer currently carries
    pub target: Option<i32>,
    pub byte_offset: usize,
    /// Fraction applied to the target before it is written
    pub scale: Option<f32>,
    /// Report the id on the next reconcile even if the buffer is unchanged
    pub republish: bool,
    /// Buffer byte last reported for this id
    pub last_published: Option<u8>,
}

impl ActuatorEntry {
    fn new(id: SensorId, byte_offset: usize) -> Self {
        Self {
            id,
            target: None,
            byte_offset,
            scale: None,
            republish: false,
            last_published: None,
        }
    }

    /// Byte this entry wants in the command frame
    pub fn expected(&self) -> Option<u8> {
        let target = self.target?;
        let value = match self.scale {
            Some(scale) => (target as f32 * scale).round() as i32,
            None => target,
        };
        Some(value.clamp(0, i32::from(u8::MAX)) as u8)
    }
}

/// Validated change to one or more actuator targets
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActuatorCommand {
    BypassMode(BypassMode),
    BypassTemp(u8),
    FanSpeed { supply: u8, extract: u8 },
    VentMode(VentMode),
    UnitOn(bool),
}

impl ActuatorCommand {
    /// Bypass mode code in 0..=2
    pub fn bypass_mode(mode: i32) -> Result<Self, ValidationError> {
        Ok(ActuatorCommand::BypassMode(BypassMode::try_from(mode)?))
    }

    /// Bypass temperature in 18..=26 °C
    pub fn bypass_temp(temp: i32) -> Result<Self, ValidationError> {
        if !(BYPASS_TEMP_MIN..=BYPASS_TEMP_MAX).contains(&temp) {
            return Err(ValidationError::BypassTemperature(temp));
        }
        Ok(ActuatorCommand::BypassTemp(temp as u8))
    }

    /// Supply and extract fan speeds
    ///
    /// Rejected only when both are negative or either exceeds 100. A single
    /// negative speed is accepted and stored as 0.
    pub fn fan_speed(supply: i32, extract: i32) -> Result<Self, ValidationError> {
        if (supply < 0 && extract < 0) || supply > FAN_SPEED_MAX || extract > FAN_SPEED_MAX {
            return Err(ValidationError::FanSpeed { supply, extract });
        }
        Ok(ActuatorCommand::FanSpeed {
            supply: supply.max(0) as u8,
            extract: extract.max(0) as u8,
        })
    }

    /// Vent mode code in 0..=3
    pub fn vent_mode(mode: i32) -> Result<Self, ValidationError> {
        Ok(ActuatorCommand::VentMode(VentMode::try_from(mode)?))
    }

    pub fn unit_on(on: bool) -> Self {
        ActuatorCommand::UnitOn(on)
    }
}

/// Command-frame encode table
#[derive(Debug, Clone)]
pub struct ActuatorTable {
    entries: Vec<ActuatorEntry>,
}

impl Default for ActuatorTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ActuatorTable {
    /// Table for the iZZi ERV 300 command layout, every target unset
    pub fn new() -> Self {
        Self {
            entries: vec![
                ActuatorEntry::new(SensorId::SupplyFanSpeed, CMD_SUPPLY_FAN_SPEED_INDEX),
                ActuatorEntry::new(SensorId::ExtractFanSpeed, CMD_EXTRACT_FAN_SPEED_INDEX),
                ActuatorEntry::new(SensorId::UnitState, CMD_UNIT_STATE_INDEX),
                ActuatorEntry::new(SensorId::BypassTemperature, CMD_BYPASS_TEMP_INDEX),
                ActuatorEntry::new(SensorId::BypassMode, CMD_BYPASS_MODE_INDEX),
            ],
        }
    }

    /// Mirror a foreign controller's command frame into the targets
    pub fn observe_command_frame(&mut self, frame: &Frame) {
        for entry in &mut self.entries {
            Self::retarget(entry, i32::from(frame.u8_at(entry.byte_offset)));
        }
    }

    /// Bring the command buffer in line with the targets
    ///
    /// Unset targets adopt the buffer byte as their baseline. Returns every id
    /// whose on-wire byte differs from the last one reported, whose target
    /// changed, or that was reset, once each.
    pub fn reconcile(&mut self, buffer: &mut Frame) -> Vec<SensorId> {
        let mut changed = Vec::new();
        for entry in &mut self.entries {
            let current = buffer.u8_at(entry.byte_offset);
            if entry.target.is_none() {
                entry.target = Some(i32::from(current));
            }

            if let Some(expected) = entry.expected() {
                if expected != current {
                    buffer.set(entry.byte_offset, expected);
                }
            }

            let on_wire = buffer.u8_at(entry.byte_offset);
            if entry.republish || entry.last_published != Some(on_wire) {
                entry.last_published = Some(on_wire);
                changed.push(entry.id);
            }
            entry.republish = false;
        }
        changed
    }

    /// Apply a validated command
    pub fn apply(&mut self, command: ActuatorCommand) {
        match command {
            ActuatorCommand::BypassMode(mode) => {
                self.set_target(SensorId::BypassMode, i32::from(mode.code()))
            }
            ActuatorCommand::BypassTemp(temp) => {
                self.set_target(SensorId::BypassTemperature, i32::from(temp))
            }
            ActuatorCommand::FanSpeed { supply, extract } => {
                self.set_target(SensorId::SupplyFanSpeed, i32::from(supply));
                self.set_target(SensorId::ExtractFanSpeed, i32::from(extract));
            }
            ActuatorCommand::VentMode(mode) => self.apply_vent_scales(mode),
            ActuatorCommand::UnitOn(on) => {
                let code = if on { CMD_UNIT_STATE_ON } else { CMD_UNIT_STATE_OFF };
                self.set_target(SensorId::UnitState, i32::from(code));
            }
        }
    }

    pub fn set_bypass_mode(&mut self, mode: i32) -> Result<(), ValidationError> {
        self.apply(ActuatorCommand::bypass_mode(mode)?);
        Ok(())
    }

    pub fn set_bypass_temp(&mut self, temp: i32) -> Result<(), ValidationError> {
        self.apply(ActuatorCommand::bypass_temp(temp)?);
        Ok(())
    }

    pub fn set_fan_speed(&mut self, supply: i32, extract: i32) -> Result<(), ValidationError> {
        self.apply(ActuatorCommand::fan_speed(supply, extract)?);
        Ok(())
    }

    pub fn set_unit_on(&mut self, on: bool) {
        self.apply(ActuatorCommand::unit_on(on));
    }

    /// Install the fan scales a vent mode implies
    pub fn apply_vent_scales(&mut self, mode: VentMode) {
        let (supply, extract) = match mode {
            VentMode::None => (None, None),
            VentMode::Fireplace => (None, Some(FIREPLACE_EXTRACT_SCALE)),
            VentMode::OpenWindow => (Some(OPEN_WINDOW_SUPPLY_SCALE), None),
            VentMode::CookerHood => (None, Some(COOKER_HOOD_EXTRACT_SCALE)),
        };
        self.set_scale(SensorId::SupplyFanSpeed, supply);
        self.set_scale(SensorId::ExtractFanSpeed, extract);
    }

    pub fn target(&self, id: SensorId) -> Option<i32> {
        self.entry(id).and_then(|e| e.target)
    }

    pub fn scale(&self, id: SensorId) -> Option<f32> {
        self.entry(id).and_then(|e| e.scale)
    }

    /// On-wire byte last reported for `id`
    pub fn published(&self, id: SensorId) -> Option<i32> {
        self.entry(id).and_then(|e| e.last_published).map(i32::from)
    }

    /// Make the next reconcile report `id` again
    ///
    /// The target is kept: dropping it would adopt a scaled buffer byte as the
    /// new unscaled target. Returns false if `id` is not an actuator.
    pub fn reset(&mut self, id: SensorId) -> bool {
        match self.entry_mut(id) {
            Some(entry) => {
                entry.republish = true;
                true
            }
            None => false,
        }
    }

    /// Command-frame byte offset of an actuator id
    pub fn offset(&self, id: SensorId) -> Option<usize> {
        self.entry(id).map(|e| e.byte_offset)
    }

    pub fn entries(&self) -> &[ActuatorEntry] {
        &self.entries
    }

    fn set_target(&mut self, id: SensorId, value: i32) {
        if let Some(entry) = self.entry_mut(id) {
            Self::retarget(entry, value);
        }
    }

    /// A new target is reported even when its scaled byte is already on the wire
    fn retarget(entry: &mut ActuatorEntry, value: i32) {
        if entry.target.is_some_and(|t| t != value) {
            entry.republish = true;
        }
        entry.target = Some(value);
    }

    fn set_scale(&mut self, id: SensorId, scale: Option<f32>) {
        if let Some(entry) = self.entry_mut(id) {
            entry.scale = scale;
        }
    }

    fn entry(&self, id: SensorId) -> Option<&ActuatorEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    fn entry_mut(&mut self, id: SensorId) -> Option<&mut ActuatorEntry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }
}
