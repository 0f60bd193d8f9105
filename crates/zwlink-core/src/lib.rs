//! # zwlink Core
//!
//! Core types shared by every zwlink crate.
//! Provides the error taxonomy of the serial link, the wire-level
//! constants of the SerialAPI framing, and the stateless decoders used to
//! interpret reply payloads.

pub mod constants;
pub mod decoders;
pub mod error;

pub use decoders::{decode_bitmap, decode_bitmap_at, map_signed_reading, read_u16_be, SignedReading};

pub use error::{ConfigError, Error, LinkError, Result};
