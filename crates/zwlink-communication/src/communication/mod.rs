//! Physical channel abstraction
//!
//! The protocol engine never touches a serial port directly. It talks to a
//! [`ByteSource`], which the embedding application supplies: normally a
//! [`serial::SerialByteSource`], in tests a scripted mock.

pub mod serial;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use zwlink_core::Result;

/// Byte-oriented channel to the device.
///
/// A source is owned exclusively by one session for its whole lifetime;
/// implementations do not need interior locking.
pub trait ByteSource: Send {
    /// Read a single byte, waiting at most `timeout`.
    ///
    /// Returns `Ok(None)` if nothing arrived in time.
    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>>;

    /// Write all of `data` to the channel
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Number of received bytes waiting to be read
    fn bytes_pending(&mut self) -> Result<usize>;

    /// Discard everything in the receive buffer
    fn purge_input(&mut self) -> Result<()>;
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>> {
        (**self).read_byte(timeout)
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn bytes_pending(&mut self) -> Result<usize> {
        (**self).bytes_pending()
    }

    fn purge_input(&mut self) -> Result<()> {
        (**self).purge_input()
    }
}

/// Serial parity setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerialParity {
    /// No parity bit
    #[default]
    None,
    /// Even parity
    Even,
    /// Odd parity
    Odd,
}

/// Parameters used to open a serial port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    /// Port name (e.g., "/dev/ttyACM0", "COM7")
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Data bits (5-8)
    pub data_bits: u8,
    /// Stop bits (1-2)
    pub stop_bits: u8,
    /// Parity
    pub parity: SerialParity,
    /// Hardware flow control
    pub flow_control: bool,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: default_port().to_string(),
            baud_rate: 115200,
            data_bits: 8,
            stop_bits: 1,
            parity: SerialParity::None,
            flow_control: false,
        }
    }
}

impl SerialSettings {
    /// Settings for `port` with the SerialAPI defaults (115200 8N1)
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Self::default()
        }
    }
}

fn default_port() -> &'static str {
    if cfg!(windows) {
        "COM7"
    } else {
        "/dev/ttyACM0"
    }
}
