//! # zwlink Communication
//!
//! The serial link protocol engine.
//! Turns the unreliable byte stream of a serial port into checksummed
//! frames, ACK/NAK/CAN handshakes with bounded retries, and strictly
//! sequential request/reply transactions.

pub mod communication;
pub mod protocol;

pub use communication::{
    serial::{list_ports, SerialByteSource, SerialPortInfo},
    ByteSource, SerialParity, SerialSettings,
};

pub use protocol::{
    checksum, encode_frame, read_frame, Frame, FrameKind, InboundFrame, LinkSession, LinkStats,
    SessionConfig, TransactionOutcome,
};
