//! Serial port byte source
//!
//! Provides the [`ByteSource`] backed by a real serial port, plus port
//! enumeration for picking the controller's interface.
//!
//! Supports:
//! - Port enumeration and discovery
//! - Baud rate, data bits, parity and stop bit configuration
//! - Blocking single-byte reads with a per-call timeout

use crate::{ByteSource, SerialParity, SerialSettings};
use std::io::{self, Read, Write};
use std::time::Duration;
use zwlink_core::{Error, LinkError, Result};

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct SerialPortInfo {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    pub port_name: String,

    /// Port description (e.g., "USB Serial Port")
    pub description: String,

    /// Manufacturer name if available
    pub manufacturer: Option<String>,

    /// USB vendor ID if applicable
    pub vid: Option<u16>,

    /// USB product ID if applicable
    pub pid: Option<u16>,
}

impl SerialPortInfo {
    /// Create a new port info
    pub fn new(port_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            description: description.into(),
            manufacturer: None,
            vid: None,
            pid: None,
        }
    }

    /// Set manufacturer
    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    /// Set USB IDs
    pub fn with_usb_ids(mut self, vid: u16, pid: u16) -> Self {
        self.vid = Some(vid);
        self.pid = Some(pid);
        self
    }
}

/// List serial ports that could carry a SerialAPI controller.
///
/// Filters to the usual patterns:
/// - Windows: COM* (e.g., COM1, COM7)
/// - Linux: /dev/ttyUSB*, /dev/ttyACM*, /dev/ttyAMA*
/// - macOS: /dev/cu.usbserial-*, /dev/cu.usbmodem*
pub fn list_ports() -> Result<Vec<SerialPortInfo>> {
    match serialport::available_ports() {
        Ok(ports) => Ok(ports
            .iter()
            .filter(|port| is_candidate_port(&port.port_name))
            .map(|port| {
                let info = SerialPortInfo::new(&port.port_name, get_port_description(port));
                match &port.port_type {
                    serialport::SerialPortType::UsbPort(usb_info) => {
                        let info = info.with_usb_ids(usb_info.vid, usb_info.pid);
                        match usb_info.manufacturer {
                            Some(ref mfg) => info.with_manufacturer(mfg),
                            None => info,
                        }
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

fn is_candidate_port(port_name: &str) -> bool {
    if let Some(num) = port_name.strip_prefix("COM") {
        return !num.is_empty() && num.chars().all(|c| c.is_ascii_digit());
    }

    [
        "/dev/ttyUSB",
        "/dev/ttyACM",
        "/dev/ttyAMA",
        "/dev/cu.usbserial-",
        "/dev/cu.usbmodem",
    ]
    .iter()
    .any(|prefix| port_name.starts_with(prefix))
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

fn to_serialport_parity(parity: SerialParity) -> serialport::Parity {
    match parity {
        SerialParity::None => serialport::Parity::None,
        SerialParity::Even => serialport::Parity::Even,
        SerialParity::Odd => serialport::Parity::Odd,
    }
}

/// Serial port implementation of [`ByteSource`]
///
/// The port is closed when the value is dropped.
pub struct SerialByteSource {
    port: Box<dyn serialport::SerialPort>,
    name: String,
    current_timeout: Duration,
}

impl std::fmt::Debug for SerialByteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialByteSource")
            .field("name", &self.name)
            .finish()
    }
}

impl SerialByteSource {
    /// Open a serial port with the given settings
    pub fn open(settings: &SerialSettings) -> Result<Self> {
        let unavailable = |reason: String| -> Error {
            LinkError::TransportUnavailable {
                port: settings.port.clone(),
                reason,
            }
            .into()
        };

        let data_bits = match settings.data_bits {
            5 => serialport::DataBits::Five,
            6 => serialport::DataBits::Six,
            7 => serialport::DataBits::Seven,
            8 => serialport::DataBits::Eight,
            n => return Err(unavailable(format!("Invalid data bits: {}", n))),
        };
        let stop_bits = match settings.stop_bits {
            1 => serialport::StopBits::One,
            2 => serialport::StopBits::Two,
            n => return Err(unavailable(format!("Invalid stop bits: {}", n))),
        };

        let initial_timeout = Duration::from_millis(100);
        let builder = serialport::new(&settings.port, settings.baud_rate)
            .timeout(initial_timeout)
            .data_bits(data_bits)
            .stop_bits(stop_bits)
            .parity(to_serialport_parity(settings.parity))
            .flow_control(if settings.flow_control {
                serialport::FlowControl::Hardware
            } else {
                serialport::FlowControl::None
            });

        match builder.open() {
            Ok(port) => {
                tracing::info!(
                    "Opened {} at {} baud",
                    settings.port,
                    settings.baud_rate
                );
                Ok(Self {
                    port,
                    name: settings.port.clone(),
                    current_timeout: initial_timeout,
                })
            }
            Err(e) => {
                tracing::warn!("Failed to open serial port {}: {}", settings.port, e);
                Err(unavailable(e.to_string()))
            }
        }
    }

    /// Get the port name
    pub fn name(&self) -> &str {
        &self.name
    }
}

fn io_error(err: impl std::fmt::Display) -> Error {
    LinkError::Io {
        reason: err.to_string(),
    }
    .into()
}

impl ByteSource for SerialByteSource {
    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>> {
        if timeout != self.current_timeout {
            self.port.set_timeout(timeout).map_err(io_error)?;
            self.current_timeout = timeout;
        }

        let mut buf = [0u8; 1];
        match self.port.read(&mut buf) {
            Ok(1) => Ok(Some(buf[0])),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(io_error(e)),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.port.write_all(data).map_err(io_error)?;
        self.port.flush().map_err(io_error)
    }

    fn bytes_pending(&mut self) -> Result<usize> {
        self.port
            .bytes_to_read()
            .map(|n| n as usize)
            .map_err(io_error)
    }

    fn purge_input(&mut self) -> Result<()> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(io_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_ports() {
        assert!(is_candidate_port("COM7"));
        assert!(is_candidate_port("COM12"));
        assert!(!is_candidate_port("COM"));
        assert!(!is_candidate_port("COMX"));
        assert!(is_candidate_port("/dev/ttyACM0"));
        assert!(is_candidate_port("/dev/ttyUSB1"));
        assert!(is_candidate_port("/dev/ttyAMA0"));
        assert!(is_candidate_port("/dev/cu.usbmodem14101"));
        assert!(!is_candidate_port("/dev/ttyS0"));
    }

    #[test]
    fn test_open_missing_port_is_transport_unavailable() {
        let settings = SerialSettings::new("/dev/zwlink-does-not-exist");
        match SerialByteSource::open(&settings) {
            Err(Error::Link(LinkError::TransportUnavailable { port, .. })) => {
                assert_eq!(port, "/dev/zwlink-does-not-exist");
            }
            other => panic!("expected TransportUnavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_data_bits_rejected_before_open() {
        let settings = SerialSettings {
            data_bits: 9,
            ..SerialSettings::new("COM7")
        };
        assert!(matches!(
            SerialByteSource::open(&settings),
            Err(Error::Link(LinkError::TransportUnavailable { .. }))
        ));
    }
}
