//! Serial port transport
//!
//! Direct connection to the unit's RS-485 bus through a USB adapter. The line
//! runs at 9600 baud, 8 data bits, no parity, one stop bit, no flow control.

use super::{framing, Transport, TransportResult};
use crate::firmware::izzi::constants::SERIAL_BAUD_RATE;
use crate::firmware::izzi::Frame;
use izzifast_core::{ConnectionError, Error, Result};
use std::io::Write;
use std::time::Duration;

/// Port timeout used while draining stale input after opening
const DRAIN_TIMEOUT: Duration = Duration::from_millis(10);

/// Information about an available serial port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialPortInfo {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    pub port_name: String,

    /// Port description (e.g., "USB FTDI RS485 Adapter")
    pub description: String,

    /// Manufacturer name if available
    pub manufacturer: Option<String>,

    /// Serial number if available
    pub serial_number: Option<String>,

    /// USB vendor ID if applicable
    pub vid: Option<u16>,

    /// USB product ID if applicable
    pub pid: Option<u16>,
}

impl SerialPortInfo {
    pub fn new(port_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            description: description.into(),
            manufacturer: None,
            serial_number: None,
            vid: None,
            pid: None,
        }
    }

    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    pub fn with_serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }

    pub fn with_usb_ids(mut self, vid: u16, pid: u16) -> Self {
        self.vid = Some(vid);
        self.pid = Some(pid);
        self
    }
}

/// List serial ports that could carry an RS-485 adapter
///
/// Filters to the usual adapter names:
/// - Windows: COM* (e.g., COM1, COM3)
/// - Linux: /dev/ttyUSB*, /dev/ttyACM*, /dev/ttyAMA*
/// - macOS: /dev/cu.usbserial-*, /dev/cu.usbmodem*
pub fn list_ports() -> Result<Vec<SerialPortInfo>> {
    match serialport::available_ports() {
        Ok(ports) => Ok(ports
            .iter()
            .filter(|port| is_valid_port(&port.port_name))
            .map(|port| {
                let info = SerialPortInfo::new(&port.port_name, get_port_description(port));
                match &port.port_type {
                    serialport::SerialPortType::UsbPort(usb_info) => {
                        let mut info = info.with_usb_ids(usb_info.vid, usb_info.pid);
                        if let Some(ref mfg) = usb_info.manufacturer {
                            info = info.with_manufacturer(mfg);
                        }
                        if let Some(ref serial) = usb_info.serial_number {
                            info = info.with_serial_number(serial);
                        }
                        info
                    }
                    _ => info,
                }
            })
            .collect()),
        Err(e) => {
            tracing::error!("Failed to enumerate serial ports: {}", e);
            Err(Error::other(format!("Failed to enumerate ports: {}", e)))
        }
    }
}

fn is_valid_port(port_name: &str) -> bool {
    if let Some(number) = port_name.strip_prefix("COM") {
        return !number.is_empty() && number.chars().all(|c| c.is_ascii_digit());
    }

    const PREFIXES: [&str; 5] = [
        "/dev/ttyUSB",
        "/dev/ttyACM",
        "/dev/ttyAMA",
        "/dev/cu.usbserial-",
        "/dev/cu.usbmodem",
    ];
    PREFIXES.iter().any(|prefix| port_name.starts_with(prefix))
}

fn get_port_description(port: &serialport::SerialPortInfo) -> String {
    match &port.port_type {
        serialport::SerialPortType::UsbPort(usb_info) => {
            format!(
                "USB {} {}",
                usb_info.manufacturer.as_deref().unwrap_or("Device"),
                usb_info.product.as_deref().unwrap_or("Serial Port")
            )
        }
        serialport::SerialPortType::BluetoothPort => "Bluetooth Serial".to_string(),
        serialport::SerialPortType::PciPort => "PCI Serial".to_string(),
        _ => "Serial Port".to_string(),
    }
}

/// Transport over a local serial device
pub struct SerialTransport {
    device: String,
    port: Option<Box<dyn serialport::SerialPort>>,
}

impl SerialTransport {
    /// Create an unconnected transport for `device`
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            port: None,
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    fn port_mut(&mut self) -> TransportResult<&mut Box<dyn serialport::SerialPort>> {
        self.port.as_mut().ok_or(ConnectionError::NotConnected)
    }
}

fn port_error(e: serialport::Error) -> ConnectionError {
    ConnectionError::IoError {
        reason: e.to_string(),
    }
}

impl Transport for SerialTransport {
    fn connect(&mut self) -> TransportResult<()> {
        if self.port.is_some() {
            return Ok(());
        }

        let mut port = serialport::new(&self.device, SERIAL_BAUD_RATE)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(DRAIN_TIMEOUT)
            .open()
            .map_err(|e| {
                tracing::warn!("Failed to open serial port {}: {}", self.device, e);
                ConnectionError::FailedToOpen {
                    endpoint: self.device.clone(),
                    reason: e.to_string(),
                }
            })?;

        framing::drain(&mut port)?;

        tracing::info!(
            "Serial port {} opened at {} baud",
            self.device,
            SERIAL_BAUD_RATE
        );
        self.port = Some(port);
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.port.take().is_some() {
            tracing::info!("Serial port {} closed", self.device);
        }
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    fn read_frame(&mut self, timeout: Duration) -> TransportResult<Option<Frame>> {
        let port = self.port_mut()?;
        port.set_timeout(timeout).map_err(port_error)?;
        framing::read_frame(port)
    }

    fn write_frame(&mut self, frame: &Frame) -> TransportResult<()> {
        let port = self.port_mut()?;
        tracing::debug!("TX {}", frame.to_hex());
        port.write_all(frame.as_bytes())
            .and_then(|_| port.flush())
            .map_err(|e| ConnectionError::WriteFailed {
                reason: e.to_string(),
            })
    }

    fn endpoint(&self) -> String {
        self.device.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_filter() {
        assert!(is_valid_port("COM3"));
        assert!(is_valid_port("/dev/ttyUSB0"));
        assert!(is_valid_port("/dev/ttyACM1"));
        assert!(is_valid_port("/dev/ttyAMA0"));
        assert!(is_valid_port("/dev/cu.usbserial-A10K"));
        assert!(!is_valid_port("COM"));
        assert!(!is_valid_port("COMX"));
        assert!(!is_valid_port("/dev/ttyS0"));
        assert!(!is_valid_port("/dev/null"));
    }

    #[test]
    fn test_port_info_builder() {
        let info = SerialPortInfo::new("/dev/ttyUSB0", "USB FTDI RS485")
            .with_manufacturer("FTDI")
            .with_serial_number("A10K")
            .with_usb_ids(0x0403, 0x6001);
        assert_eq!(info.manufacturer.as_deref(), Some("FTDI"));
        assert_eq!(info.vid, Some(0x0403));
        assert_eq!(info.pid, Some(0x6001));
    }

    #[test]
    fn test_unconnected_transport() {
        let mut transport = SerialTransport::new("/dev/ttyUSB0");
        assert_eq!(transport.endpoint(), "/dev/ttyUSB0");
        assert!(!transport.is_connected());
        assert!(matches!(
            transport.read_frame(Duration::from_millis(5)),
            Err(ConnectionError::NotConnected)
        ));
    }

    #[test]
    fn test_missing_device_fails_to_open() {
        let mut transport = SerialTransport::new("/dev/izzifast-does-not-exist");
        assert!(matches!(
            transport.connect(),
            Err(ConnectionError::FailedToOpen { .. })
        ));
        assert!(!transport.is_connected());
    }
}
