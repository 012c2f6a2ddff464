//! iZZi ERV 300 wire constants
//!
//! Frame layout for the firmware revision this crate speaks. Offsets are
//! byte indices into the 15-byte frame; byte 0 is always the discriminator.

use std::time::Duration;

/// Length of every frame on the bus
pub const FRAME_LEN: usize = 15;

/// Discriminator of unit-originated status frames
pub const STATUS_FRAME_ID: u8 = 0x33;
/// Discriminator of controller-originated command frames
pub const COMMAND_FRAME_ID: u8 = 0x64;

/// Offset of the discriminator byte
pub const FRAME_ID_INDEX: usize = 0;

// Status frame offsets
pub const STATUS_OUTDOOR_TEMP_INDEX: usize = 1;
pub const STATUS_SUPPLY_TEMP_INDEX: usize = 2;
pub const STATUS_EXTRACT_TEMP_INDEX: usize = 3;
pub const STATUS_EXHAUST_TEMP_INDEX: usize = 4;
pub const STATUS_BYPASS_STATE_INDEX: usize = 5;
pub const STATUS_COVER_STATE_INDEX: usize = 6;
pub const STATUS_DEFROST_STATE_INDEX: usize = 7;

/// Bypass state value reported while the damper is open
pub const STATUS_BYPASS_STATE_OPEN: u8 = 1;
/// Cover state value reported while the service cover is open
pub const STATUS_COVER_STATE_OPEN: u8 = 1;
/// Defrost state value reported while a defrost cycle runs
pub const STATUS_DEFROST_STATE_ACTIVE: u8 = 1;

// Command frame offsets
pub const CMD_BYPASS_TEMP_INDEX: usize = 8;
pub const CMD_BYPASS_MODE_INDEX: usize = 9;
pub const CMD_SUPPLY_FAN_SPEED_INDEX: usize = 10;
pub const CMD_EXTRACT_FAN_SPEED_INDEX: usize = 11;
pub const CMD_UNIT_STATE_INDEX: usize = 12;

/// Unit state code: running
pub const CMD_UNIT_STATE_ON: u8 = 0x01;
/// Unit state code: stopped
pub const CMD_UNIT_STATE_OFF: u8 = 0x00;

/// Accepted bypass temperature window (°C)
pub const BYPASS_TEMP_MIN: i32 = 18;
pub const BYPASS_TEMP_MAX: i32 = 26;

/// Upper bound of a fan speed (%)
pub const FAN_SPEED_MAX: i32 = 100;

/// Extract scale applied in fireplace mode
pub const FIREPLACE_EXTRACT_SCALE: f32 = 0.8;
/// Supply scale applied in open-window mode
pub const OPEN_WINDOW_SUPPLY_SCALE: f32 = 0.0;
/// Extract scale applied in cooker-hood mode
pub const COOKER_HOOD_EXTRACT_SCALE: f32 = 0.3;

/// Command frame the controller starts from
///
/// Bypass at 23 °C and closed, both fans at 40 %, unit off.
pub const DEFAULT_COMMAND_FRAME: [u8; FRAME_LEN] = [
    COMMAND_FRAME_ID,
    0x19,
    0x00,
    0x14,
    0x00,
    0x16,
    0x05,
    0x00,
    0x17,
    0x02,
    0x28,
    0x28,
    CMD_UNIT_STATE_OFF,
    0x00,
    0x00,
];

/// Default TCP port of the serial-to-Ethernet bridge
pub const DEFAULT_TCP_PORT: u16 = 8234;
/// Serial line speed
pub const SERIAL_BAUD_RATE: u32 = 9600;

/// How long a frame read may wait before it counts as a timeout
pub const READ_TIMEOUT: Duration = Duration::from_secs(3);
/// Wait between a lost connection and the next connect attempt
pub const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);
/// Gap left after the second status frame before transmitting
pub const WRITE_PACING: Duration = Duration::from_millis(50);
/// Status frames that must be seen between two transmissions
pub const STATUS_FRAMES_PER_WRITE: u32 = 2;
