//! SerialAPI link protocol
//!
//! Framing, checksumming and the handshake/reply transaction engine.

pub mod checksum;
pub mod frame;
pub mod transaction;

pub use checksum::checksum;
pub use frame::{encode_frame, read_frame, Frame, FrameKind, InboundFrame};
pub use transaction::{LinkSession, LinkStats, SessionConfig, TransactionOutcome};
