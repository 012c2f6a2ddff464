//! Sensor table
//!
//! Decode rules for values the unit reports in status frames, with the last
//! value seen for change detection.

use super::constants::*;
use super::frame::Frame;
use izzifast_core::SensorId;

/// How a status byte is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decode {
    /// Two's-complement byte (temperatures)
    Signed8,
    /// Plain unsigned byte (states and flags)
    Unsigned8,
}

impl Decode {
    /// Decode the byte at `offset`
    pub fn read(&self, frame: &Frame, offset: usize) -> i32 {
        match self {
            Decode::Signed8 => i32::from(frame.i8_at(offset)),
            Decode::Unsigned8 => i32::from(frame.u8_at(offset)),
        }
    }
}

/// One decoded status field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorEntry {
    pub id: SensorId,
    /// `None` until the first observation, and again after a forced update
    pub last_value: Option<i32>,
    pub byte_offset: usize,
    pub decode: Decode,
}

impl SensorEntry {
    fn new(id: SensorId, byte_offset: usize, decode: Decode) -> Self {
        Self {
            id,
            last_value: None,
            byte_offset,
            decode,
        }
    }
}

/// Status-frame decode table
#[derive(Debug, Clone)]
pub struct SensorTable {
    entries: Vec<SensorEntry>,
}

impl Default for SensorTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorTable {
    /// Table for the iZZi ERV 300 status layout
    pub fn new() -> Self {
        Self {
            entries: vec![
                SensorEntry::new(SensorId::SupplyTemperature, STATUS_SUPPLY_TEMP_INDEX, Decode::Signed8),
                SensorEntry::new(SensorId::ExtractTemperature, STATUS_EXTRACT_TEMP_INDEX, Decode::Signed8),
                SensorEntry::new(SensorId::ExhaustTemperature, STATUS_EXHAUST_TEMP_INDEX, Decode::Signed8),
                SensorEntry::new(SensorId::OutdoorTemperature, STATUS_OUTDOOR_TEMP_INDEX, Decode::Signed8),
                SensorEntry::new(SensorId::BypassState, STATUS_BYPASS_STATE_INDEX, Decode::Unsigned8),
                SensorEntry::new(SensorId::CoverState, STATUS_COVER_STATE_INDEX, Decode::Unsigned8),
                SensorEntry::new(SensorId::DefrostState, STATUS_DEFROST_STATE_INDEX, Decode::Unsigned8),
            ],
        }
    }

    /// Decode every field of a status frame
    ///
    /// Returns the ids whose value differs from the last one seen, including
    /// ids observed for the first time.
    pub fn apply_status_frame(&mut self, frame: &Frame) -> Vec<SensorId> {
        let mut changed = Vec::new();
        for entry in &mut self.entries {
            let current = entry.decode.read(frame, entry.byte_offset);
            if entry.last_value != Some(current) {
                entry.last_value = Some(current);
                changed.push(entry.id);
            }
        }
        changed
    }

    /// Last decoded value of `id`
    pub fn value(&self, id: SensorId) -> Option<i32> {
        self.entry(id).and_then(|e| e.last_value)
    }

    /// Forget the cached value so the next frame republishes it
    ///
    /// Returns false if `id` is not a status field.
    pub fn reset(&mut self, id: SensorId) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.last_value = None;
                true
            }
            None => false,
        }
    }

    pub fn entries(&self) -> &[SensorEntry] {
        &self.entries
    }

    fn entry(&self, id: SensorId) -> Option<&SensorEntry> {
        self.entries.iter().find(|e| e.id == id)
    }
}
