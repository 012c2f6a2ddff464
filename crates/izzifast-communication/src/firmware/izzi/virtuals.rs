//! Virtual table
//!
//! Published values with no wire representation: the vent mode selector and
//! the heat recovery efficiency computed from the temperature sensors.

use super::sensors::SensorTable;
use izzifast_core::{SensorId, SensorValue, VentMode};

/// Why an efficiency reading could not be produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ComputationError {
    #[error("efficiency input {0} not observed yet")]
    MissingInput(SensorId),
}

/// Heat recovery efficiency in percent, truncated toward zero
///
/// `outdoor` is t1, `supply` t2 and `extract` t3. Equal outdoor and extract
/// temperatures yield 0.
pub fn efficiency(outdoor: i32, supply: i32, extract: i32) -> i32 {
    if extract == outdoor {
        return 0;
    }
    let t1 = f64::from(outdoor);
    let t2 = f64::from(supply);
    let t3 = f64::from(extract);
    (((t2 - t1) / (t3 - t1)) * 100.0) as i32
}

/// One derived value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualEntry {
    pub id: SensorId,
    pub target: SensorValue,
    /// Last value handed to listeners; `None` forces the next publish
    pub last_published: Option<SensorValue>,
}

impl VirtualEntry {
    fn new(id: SensorId, target: SensorValue) -> Self {
        Self {
            id,
            target,
            last_published: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VirtualTable {
    entries: Vec<VirtualEntry>,
}

impl Default for VirtualTable {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualTable {
    pub fn new() -> Self {
        Self {
            entries: vec![
                VirtualEntry::new(
                    SensorId::VentMode,
                    SensorValue::Value(i32::from(VentMode::None.code())),
                ),
                VirtualEntry::new(SensorId::Efficiency, SensorValue::Value(0)),
            ],
        }
    }

    /// Recompute efficiency from the latest temperatures
    ///
    /// A missing input degrades efficiency to unavailable and is returned as
    /// an error for the caller to log.
    pub fn update_efficiency(&mut self, sensors: &SensorTable) -> Result<i32, ComputationError> {
        let result = Self::compute_efficiency(sensors);
        let target = match result {
            Ok(value) => SensorValue::Value(value),
            Err(_) => SensorValue::Unavailable,
        };
        self.set_target(SensorId::Efficiency, target);
        result
    }

    fn compute_efficiency(sensors: &SensorTable) -> Result<i32, ComputationError> {
        let read = |id| sensors.value(id).ok_or(ComputationError::MissingInput(id));
        let t1 = read(SensorId::OutdoorTemperature)?;
        let t2 = read(SensorId::SupplyTemperature)?;
        let t3 = read(SensorId::ExtractTemperature)?;
        Ok(efficiency(t1, t2, t3))
    }

    pub fn set_vent_mode(&mut self, mode: VentMode) {
        self.set_target(SensorId::VentMode, SensorValue::Value(i32::from(mode.code())));
    }

    /// Current vent mode selector
    pub fn vent_mode(&self) -> VentMode {
        self.target(SensorId::VentMode)
            .and_then(|v| v.as_i32())
            .and_then(|code| VentMode::try_from(code).ok())
            .unwrap_or_default()
    }

    /// Ids whose target differs from what was last published
    pub fn reconcile(&mut self) -> Vec<SensorId> {
        let mut changed = Vec::new();
        for entry in &mut self.entries {
            if entry.last_published != Some(entry.target) {
                entry.last_published = Some(entry.target);
                changed.push(entry.id);
            }
        }
        changed
    }

    pub fn target(&self, id: SensorId) -> Option<SensorValue> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.target)
    }

    /// Forget what was published so the next reconcile repeats it
    pub fn reset(&mut self, id: SensorId) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.last_published = None;
                true
            }
            None => false,
        }
    }

    pub fn entries(&self) -> &[VirtualEntry] {
        &self.entries
    }

    fn set_target(&mut self, id: SensorId, target: SensorValue) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) {
            entry.target = target;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firmware::izzi::constants::*;
    use crate::firmware::izzi::frame::Frame;

    fn sensors_with(outdoor: i8, supply: i8, extract: i8) -> SensorTable {
        let mut bytes = [0u8; FRAME_LEN];
        bytes[FRAME_ID_INDEX] = STATUS_FRAME_ID;
        bytes[STATUS_OUTDOOR_TEMP_INDEX] = outdoor as u8;
        bytes[STATUS_SUPPLY_TEMP_INDEX] = supply as u8;
        bytes[STATUS_EXTRACT_TEMP_INDEX] = extract as u8;
        let mut table = SensorTable::new();
        table.apply_status_frame(&Frame::new(bytes));
        table
    }

    #[test]
    fn test_efficiency_formula() {
        assert_eq!(efficiency(10, 20, 15), 200);
        assert_eq!(efficiency(10, 10, 10), 0);
        assert_eq!(efficiency(0, 18, 21), 85);
        // Truncation goes toward zero, not down
        assert_eq!(efficiency(10, 7, 17), -42);
    }

    #[test]
    fn test_update_efficiency_from_sensors() {
        let mut table = VirtualTable::new();
        assert_eq!(table.update_efficiency(&sensors_with(10, 20, 15)), Ok(200));
        assert_eq!(
            table.target(SensorId::Efficiency),
            Some(SensorValue::Value(200))
        );
    }

    #[test]
    fn test_missing_input_makes_efficiency_unavailable() {
        let mut table = VirtualTable::new();
        let mut sensors = sensors_with(10, 20, 15);
        sensors.reset(SensorId::ExtractTemperature);

        assert_eq!(
            table.update_efficiency(&sensors),
            Err(ComputationError::MissingInput(SensorId::ExtractTemperature))
        );
        assert_eq!(
            table.target(SensorId::Efficiency),
            Some(SensorValue::Unavailable)
        );
    }

    #[test]
    fn test_reconcile_publishes_once() {
        let mut table = VirtualTable::new();
        let first = table.reconcile();
        assert_eq!(first, vec![SensorId::VentMode, SensorId::Efficiency]);
        assert!(table.reconcile().is_empty());

        table.set_vent_mode(VentMode::CookerHood);
        assert_eq!(table.reconcile(), vec![SensorId::VentMode]);
        assert_eq!(table.vent_mode(), VentMode::CookerHood);
    }

    #[test]
    fn test_unavailable_is_published_once() {
        let mut table = VirtualTable::new();
        table.reconcile();
        let _ = table.update_efficiency(&SensorTable::new());
        assert_eq!(table.reconcile(), vec![SensorId::Efficiency]);
        let _ = table.update_efficiency(&SensorTable::new());
        assert!(table.reconcile().is_empty());
    }

    #[test]
    fn test_reset_forces_republish() {
        let mut table = VirtualTable::new();
        table.reconcile();
        assert!(table.reset(SensorId::Efficiency));
        assert!(!table.reset(SensorId::SupplyTemperature));
        assert_eq!(table.reconcile(), vec![SensorId::Efficiency]);
    }
}
