//! Client configuration.
//!
//! Every field has a default, so an empty YAML document is a valid
//! configuration:
//!
//! ```yaml
//! address: 192.168.0.1:5000
//! command_timeout_secs: 10
//! update:
//!   base_url: https://olsontek.dev/EConBadge/updates/
//!   checksum: sha1
//!   version_comparison: lexicographic
//! ```

use std::path::Path;
use std::time::Duration;

use ecb_image::NibbleOrder;
use ecb_protocol::{ResyncMode, MAX_FIRMWARE_SIZE, RAW_PACKET_SIZE};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid configuration YAML.
    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

// ============================================================================
// Update configuration
// ============================================================================

/// Digest used to verify downloaded firmware.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecksumAlgorithm {
    #[default]
    Sha1,
    Sha256,
}

impl ChecksumAlgorithm {
    /// Lowercase hex digest of `data`.
    pub fn digest_hex(self, data: &[u8]) -> String {
        match self {
            ChecksumAlgorithm::Sha1 => hex::encode(Sha1::digest(data)),
            ChecksumAlgorithm::Sha256 => hex::encode(Sha256::digest(data)),
        }
    }
}

/// How firmware versions are ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionComparison {
    /// Major, then minor, then build.
    #[default]
    Lexicographic,
    /// Newer when any component is greater, regardless of position. Matches
    /// the first-generation mobile app.
    AnyComponent,
}

/// Where and how firmware updates are fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Directory URL holding the update files, with trailing slash.
    pub base_url: String,
    /// Two-line metadata file: version, then checksum.
    pub info_file: String,
    /// Firmware image file.
    pub binary_file: String,
    /// Largest firmware accepted, in bytes.
    pub max_firmware_size: usize,
    /// Digest the published checksum was computed with.
    pub checksum: ChecksumAlgorithm,
    /// Version ordering.
    pub version_comparison: VersionComparison,
    /// HTTP request timeout in seconds.
    pub http_timeout_secs: u64,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        UpdateConfig {
            base_url: "https://olsontek.dev/EConBadge/updates/".to_string(),
            info_file: "update.txt".to_string(),
            binary_file: "firmware.bin".to_string(),
            max_firmware_size: MAX_FIRMWARE_SIZE,
            checksum: ChecksumAlgorithm::Sha1,
            version_comparison: VersionComparison::Lexicographic,
            http_timeout_secs: 30,
        }
    }
}

impl UpdateConfig {
    /// URL of the metadata file.
    pub fn info_url(&self) -> String {
        format!("{}{}", self.base_url, self.info_file)
    }

    /// URL of the firmware binary.
    pub fn binary_url(&self) -> String {
        format!("{}{}", self.base_url, self.binary_file)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

// ============================================================================
// Client configuration
// ============================================================================

/// Connection and protocol settings for a badge client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Badge socket address (`host:port`).
    pub address: String,
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// How long to wait for the `PONG` handshake, in seconds.
    pub connection_timeout_secs: u64,
    /// Timeout for ordinary commands, in seconds.
    pub command_timeout_secs: u64,
    /// Timeout for image transfers and other slow commands, in seconds.
    pub long_timeout_secs: u64,
    /// How long a received response may wait for the caller to take the
    /// previous one before it is dropped, in seconds.
    pub turnstile_timeout_secs: u64,
    /// Chunk size for image and firmware streaming.
    pub raw_packet_size: usize,
    /// Pause before acknowledging a raw transfer chunk, in milliseconds.
    pub raw_ack_delay_ms: u64,
    /// Response magic resynchronisation.
    pub resync: ResyncMode,
    /// Nibble order used when previewing images fetched from the badge.
    pub nibble_order: NibbleOrder,
    /// Firmware update settings.
    pub update: UpdateConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            address: "192.168.0.1:5000".to_string(),
            connect_timeout_secs: 10,
            connection_timeout_secs: 10,
            command_timeout_secs: 10,
            long_timeout_secs: 60,
            turnstile_timeout_secs: 10,
            raw_packet_size: RAW_PACKET_SIZE,
            raw_ack_delay_ms: 10,
            resync: ResyncMode::Rescan,
            nibble_order: NibbleOrder::HighFirst,
            update: UpdateConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Parse a YAML document.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Load a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn long_timeout(&self) -> Duration {
        Duration::from_secs(self.long_timeout_secs)
    }

    pub fn turnstile_timeout(&self) -> Duration {
        Duration::from_secs(self.turnstile_timeout_secs)
    }

    pub fn raw_ack_delay(&self) -> Duration {
        Duration::from_millis(self.raw_ack_delay_ms)
    }
}
