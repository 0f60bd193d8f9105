//! Wire-level constants of the SerialAPI link.

/// Start of frame
pub const SOF: u8 = 0x01;
/// Positive handshake
pub const ACK: u8 = 0x06;
/// Negative handshake
pub const NAK: u8 = 0x15;
/// Cancel, sent by the peer when a frame collided with one of its own
pub const CAN: u8 = 0x18;

/// Frame kind byte of a host request
pub const REQUEST: u8 = 0x00;
/// Frame kind byte of a device response
pub const RESPONSE: u8 = 0x01;

/// Seed of the XOR checksum fold
pub const CHECKSUM_SEED: u8 = 0xFF;

/// Largest payload that still fits the one-byte length field
/// (LEN counts the kind and checksum bytes as well).
pub const MAX_PAYLOAD_LEN: usize = 253;

/// Number of bytes in a node bitmap as returned by the controller
pub const NODE_BITMAP_LEN: usize = 29;
