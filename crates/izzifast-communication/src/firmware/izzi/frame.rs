//! Frame codec
//!
//! Fixed-length frames and their classification by discriminator byte.

use super::constants::{COMMAND_FRAME_ID, FRAME_ID_INDEX, FRAME_LEN, STATUS_FRAME_ID};
use std::fmt;

/// Kind of a frame, read from its discriminator byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Unit-originated sensor report
    Status,
    /// Controller-originated actuator command
    Command,
    /// Discriminator not recognised; the stream is out of sync
    Unknown,
}

impl FrameKind {
    /// Classify a single discriminator byte
    pub fn from_discriminator(byte: u8) -> Self {
        match byte {
            STATUS_FRAME_ID => FrameKind::Status,
            COMMAND_FRAME_ID => FrameKind::Command,
            _ => FrameKind::Unknown,
        }
    }

    /// True for Status and Command
    pub fn is_known(&self) -> bool {
        !matches!(self, FrameKind::Unknown)
    }
}

/// One complete frame
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame([u8; FRAME_LEN]);

impl Frame {
    /// Wrap raw frame bytes
    pub const fn new(bytes: [u8; FRAME_LEN]) -> Self {
        Self(bytes)
    }

    /// Build a frame from a slice of exactly [`FRAME_LEN`] bytes
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; FRAME_LEN] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }

    /// Classify the frame by its discriminator
    pub fn kind(&self) -> FrameKind {
        FrameKind::from_discriminator(self.0[FRAME_ID_INDEX])
    }

    /// Byte at `index` as unsigned
    pub fn u8_at(&self, index: usize) -> u8 {
        self.0[index]
    }

    /// Byte at `index` as two's-complement signed
    pub fn i8_at(&self, index: usize) -> i8 {
        self.0[index] as i8
    }

    /// Overwrite the byte at `index`
    pub fn set(&mut self, index: usize, value: u8) {
        self.0[index] = value;
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    /// Lower-case hex dump used by RX/TX logging
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({:?}, {})", self.kind(), self.to_hex())
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firmware::izzi::constants::DEFAULT_COMMAND_FRAME;

    #[test]
    fn test_classify_discriminators() {
        assert_eq!(FrameKind::from_discriminator(STATUS_FRAME_ID), FrameKind::Status);
        assert_eq!(FrameKind::from_discriminator(COMMAND_FRAME_ID), FrameKind::Command);
        assert_eq!(FrameKind::from_discriminator(0x00), FrameKind::Unknown);
        assert!(!FrameKind::Unknown.is_known());
    }

    #[test]
    fn test_default_command_frame_is_command() {
        assert_eq!(Frame::new(DEFAULT_COMMAND_FRAME).kind(), FrameKind::Command);
    }

    #[test]
    fn test_signed_and_unsigned_reads() {
        let mut frame = Frame::new([0; FRAME_LEN]);
        frame.set(3, 0xF6);
        assert_eq!(frame.u8_at(3), 246);
        assert_eq!(frame.i8_at(3), -10);
    }

    #[test]
    fn test_from_slice_requires_exact_length() {
        assert!(Frame::from_slice(&[0u8; FRAME_LEN - 1]).is_none());
        assert!(Frame::from_slice(&[0u8; FRAME_LEN + 1]).is_none());
        assert!(Frame::from_slice(&[0u8; FRAME_LEN]).is_some());
    }

    #[test]
    fn test_hex_dump() {
        let mut bytes = [0u8; FRAME_LEN];
        bytes[0] = STATUS_FRAME_ID;
        bytes[14] = 0xAB;
        let hex = Frame::new(bytes).to_hex();
        assert_eq!(hex.len(), FRAME_LEN * 2);
        assert!(hex.starts_with("33"));
        assert!(hex.ends_with("ab"));
    }
}
