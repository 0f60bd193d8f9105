//! Configuration management for zwlink
//!
//! Provides configuration file handling and validation.
//! Supports JSON and TOML file formats stored in platform-specific directories.
//!
//! Configuration is organized into logical sections:
//! - Serial settings (port, baud rate, framing)
//! - Timing (byte, handshake and reply timeouts, settle delay)
//! - Retry policy (retransmissions, ACK probes)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use zwlink_communication::{SerialSettings, SessionConfig};
use zwlink_core::{ConfigError, Result};

/// Protocol timing settings, all in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    /// Maximum gap between bytes inside a frame
    pub byte_timeout_ms: u64,
    /// Wait for ACK/NAK/CAN after a frame is written
    pub handshake_timeout_ms: u64,
    /// Wait for the reply frame after the handshake
    pub reply_timeout_ms: u64,
    /// Pause before each transaction and after a rejection
    pub settle_delay_ms: u64,
    /// Stop-flag polling interval while listening
    pub listen_poll_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            byte_timeout_ms: 100,
            handshake_timeout_ms: 500,
            reply_timeout_ms: 5000,
            settle_delay_ms: 100,
            listen_poll_ms: 250,
        }
    }
}

/// Upper bound accepted for `retry.max_retries`
pub const MAX_RETRIES: u32 = 255;

/// Retry policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Retransmissions after the first attempt
    pub max_retries: u32,
    /// ACK bytes sent after a handshake timeout
    pub ack_probes: u32,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            ack_probes: 32,
        }
    }
}

/// Complete link configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Serial port settings
    pub serial: SerialSettings,
    /// Protocol timing
    pub timing: TimingSettings,
    /// Retry policy
    pub retry: RetrySettings,
}

impl LinkConfig {
    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        let config: Self = match Format::of(path)? {
            Format::Json => serde_json::from_str(&content)
                .map_err(|e| ConfigError::Parse(format!("Invalid JSON config: {}", e)))?,
            Format::Toml => toml::from_str(&content)
                .map_err(|e| ConfigError::Parse(format!("Invalid TOML config: {}", e)))?,
        };

        config.validate()?;
        tracing::debug!("Loaded link config from {}", path.display());
        Ok(config)
    }

    /// Load config from `path`, falling back to defaults if it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        self.validate()?;

        let content = match Format::of(path)? {
            Format::Json => serde_json::to_string_pretty(self)
                .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))?,
            Format::Toml => toml::to_string_pretty(self)
                .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))?,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Default config location: `<config_dir>/zwlink/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().ok_or_else(|| {
            ConfigError::ConfigDirectory("no configuration directory on this platform".to_string())
        })?;
        Ok(dir.join("zwlink").join("config.toml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.trim().is_empty() {
            return Err(invalid("serial.port", "must not be empty"));
        }

        if self.serial.baud_rate == 0 {
            return Err(invalid("serial.baud_rate", "must be > 0"));
        }

        if self.retry.max_retries > MAX_RETRIES {
            return Err(invalid("retry.max_retries", "must be <= 255"));
        }

        let timeouts = [
            ("timing.byte_timeout_ms", self.timing.byte_timeout_ms),
            ("timing.handshake_timeout_ms", self.timing.handshake_timeout_ms),
            ("timing.reply_timeout_ms", self.timing.reply_timeout_ms),
            ("timing.listen_poll_ms", self.timing.listen_poll_ms),
        ];
        if let Some((key, _)) = timeouts.iter().find(|(_, ms)| *ms == 0) {
            return Err(invalid(key, "must be > 0"));
        }

        Ok(())
    }

    /// Timing and retry parameters for a link session
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            byte_timeout: Duration::from_millis(self.timing.byte_timeout_ms),
            handshake_timeout: Duration::from_millis(self.timing.handshake_timeout_ms),
            reply_timeout: Duration::from_millis(self.timing.reply_timeout_ms),
            settle_delay: Duration::from_millis(self.timing.settle_delay_ms),
            max_retries: self.retry.max_retries,
            ack_probes: self.retry.ack_probes,
            listen_poll: Duration::from_millis(self.timing.listen_poll_ms),
        }
    }
}

enum Format {
    Json,
    Toml,
}

impl Format {
    fn of(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )
            .into()),
        }
    }
}

fn invalid(key: &str, reason: &str) -> zwlink_core::Error {
    ConfigError::Invalid {
        key: key.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_protocol_timing() {
        let config = LinkConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.session_config(), SessionConfig::default());
    }

    #[test]
    fn test_validate_rejects_zero_timeouts() {
        let mut config = LinkConfig::default();
        config.timing.handshake_timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid setting 'timing.handshake_timeout_ms': must be > 0"
        );
    }

    #[test]
    fn test_validate_bounds_retries() {
        let mut config = LinkConfig::default();
        config.retry.max_retries = MAX_RETRIES;
        assert!(config.validate().is_ok());

        config.retry.max_retries = u32::MAX;
        assert_eq!(
            config.validate().unwrap_err().to_string(),
            "Invalid setting 'retry.max_retries': must be <= 255"
        );
    }

    #[test]
    fn test_validate_rejects_empty_port() {
        let mut config = LinkConfig::default();
        config.serial.port = "  ".to_string();
        assert!(config.validate().unwrap_err().is_config_error());
    }

    #[test]
    fn test_zero_settle_delay_allowed() {
        let mut config = LinkConfig::default();
        config.timing.settle_delay_ms = 0;
        assert!(config.validate().is_ok());
        assert!(config.session_config().settle_delay.is_zero());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: LinkConfig = toml::from_str(
            r#"
            [serial]
            port = "COM25"

            [retry]
            max_retries = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.serial.port, "COM25");
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.ack_probes, 32);
        assert_eq!(config.timing.reply_timeout_ms, 5000);
    }
}
