//! # zwlink
//!
//! Reliable request/response exchange with a Z-Wave SerialAPI controller
//! over a serial link.
//!
//! ## Architecture
//!
//! zwlink is organized as a workspace with multiple crates:
//!
//! 1. **zwlink-core** - Error taxonomy, wire constants, payload decoders
//! 2. **zwlink-communication** - Byte sources, framing, the transaction engine
//! 3. **zwlink-settings** - Link configuration files
//! 4. **zwlink** - Logging setup, thin consumers, and the command-line tool
//!
//! ## Example
//!
//! ```ignore
//! use zwlink::{open_session, tools, LinkConfig};
//!
//! let config = LinkConfig::default();
//! let mut session = open_session(&config)?;
//! let nodes = tools::node_ids(&mut session)?;
//! ```

pub mod tools;

pub use zwlink_communication::{
    checksum, encode_frame, list_ports, read_frame, ByteSource, Frame, FrameKind, InboundFrame,
    LinkSession, LinkStats, SerialByteSource, SerialPortInfo, SerialSettings, SessionConfig,
    TransactionOutcome,
};

pub use zwlink_core::{
    decode_bitmap, map_signed_reading, ConfigError, Error, LinkError, Result, SignedReading,
};

pub use zwlink_settings::LinkConfig;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Open the configured serial port and wrap it in a link session.
///
/// The port is closed when the session is dropped.
pub fn open_session(config: &LinkConfig) -> Result<LinkSession<SerialByteSource>> {
    config.validate()?;
    let source = SerialByteSource::open(&config.serial)?;
    Ok(LinkSession::new(source, config.session_config()))
}

/// Initialize logging
///
/// Sets up structured logging to stderr with:
/// - RUST_LOG environment variable support
/// - A base level raised by `verbosity` (0 = info, 1 = debug, 2+ = trace)
pub fn init_logging(verbosity: u8) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let level = match verbosity {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    let env_filter = EnvFilter::from_default_env().add_directive(level.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {}", e))?;

    Ok(())
}
