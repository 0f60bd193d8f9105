//! zwlink Settings Crate
//!
//! Handles link configuration: serial port parameters, protocol timeouts
//! and retry bounds, loaded from JSON or TOML files.

pub mod config;

pub use config::{LinkConfig, RetrySettings, TimingSettings, MAX_RETRIES};
