//! Error types for the badge client.

use std::time::Duration;

use ecb_image::ImageError;
use ecb_protocol::ProtocolError;
use thiserror::Error;

/// Failures of the byte transport underneath a session.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Socket I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport was already closed.
    #[error("transport closed")]
    Closed,
}

/// Failures talking to the firmware update server.
#[derive(Debug, Error)]
pub enum UpdateServerError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Reading the response body failed.
    #[error("error reading response body: {0}")]
    Body(#[from] std::io::Error),

    /// Server answered with a non-success status.
    #[error("HTTP {status} fetching {url}")]
    Status {
        /// Requested URL.
        url: String,
        /// Response status code.
        status: u16,
    },

    /// Firmware binary exceeds the accepted size.
    #[error("firmware too large: {actual} bytes, limit {max}")]
    TooLarge {
        /// Size limit in bytes.
        max: usize,
        /// Size reported, or bytes received before the download was cut off.
        actual: usize,
    },
}

/// Closed set of outcomes reported to users, with stable numeric codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NoError,
    TransportUnavailable,
    CannotFetchUpdateMetadata,
    CannotReachDevice,
    CannotParseUpdateVersion,
    CannotFetchUpdateChecksum,
    ChecksumMismatch,
    CannotFetchBinary,
    UpdateNotNewer,
    DeviceNotReady,
}

impl ErrorKind {
    /// Numeric code shared with the badge's mobile app.
    pub fn code(self) -> u8 {
        match self {
            ErrorKind::NoError => 0,
            ErrorKind::TransportUnavailable => 1,
            ErrorKind::CannotFetchUpdateMetadata => 2,
            ErrorKind::CannotReachDevice => 3,
            ErrorKind::CannotParseUpdateVersion => 4,
            ErrorKind::CannotFetchUpdateChecksum => 5,
            ErrorKind::ChecksumMismatch => 6,
            ErrorKind::CannotFetchBinary => 7,
            ErrorKind::UpdateNotNewer => 8,
            ErrorKind::DeviceNotReady => 9,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ErrorKind::NoError => "no error",
            ErrorKind::TransportUnavailable => "transport unavailable",
            ErrorKind::CannotFetchUpdateMetadata => "cannot fetch update metadata",
            ErrorKind::CannotReachDevice => "cannot reach device",
            ErrorKind::CannotParseUpdateVersion => "cannot parse update version",
            ErrorKind::CannotFetchUpdateChecksum => "cannot fetch update checksum",
            ErrorKind::ChecksumMismatch => "checksum mismatch",
            ErrorKind::CannotFetchBinary => "cannot fetch firmware binary",
            ErrorKind::UpdateNotNewer => "update is not newer",
            ErrorKind::DeviceNotReady => "device not ready",
        };
        f.write_str(text)
    }
}

/// Errors returned by sessions, device operations and the updater.
#[derive(Debug, Error)]
pub enum BadgeError {
    /// No handshake has completed on the current connection.
    #[error("not connected to a badge")]
    NotConnected,

    /// The badge did not answer in time.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// The connection was torn down while waiting.
    #[error("connection cancelled")]
    Cancelled,

    /// Sending on the transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The badge answered with something unexpected.
    #[error("unexpected reply: {0}")]
    Protocol(#[from] ProtocolError),

    /// Image data from the badge could not be decoded.
    #[error("bad image data: {0}")]
    Image(#[from] ImageError),

    /// Update metadata could not be downloaded.
    #[error("cannot fetch update metadata: {0}")]
    UpdateMetadata(#[source] UpdateServerError),

    /// Update metadata had no version line.
    #[error("update metadata has no version")]
    MissingVersion,

    /// Update metadata had no checksum line.
    #[error("update metadata has no checksum")]
    MissingChecksum,

    /// The firmware binary could not be downloaded.
    #[error("cannot fetch firmware binary: {0}")]
    UpdateBinary(#[source] UpdateServerError),

    /// Downloaded firmware does not match the published checksum.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Published checksum.
        expected: String,
        /// Checksum of the downloaded binary.
        actual: String,
    },

    /// The server's firmware is not newer than the badge's.
    #[error("update {available} is not newer than {current}")]
    NotNewer {
        /// Version running on the badge.
        current: String,
        /// Version offered by the server.
        available: String,
    },
}

impl BadgeError {
    /// Classify into the user-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BadgeError::NotConnected | BadgeError::Timeout(_) | BadgeError::Cancelled => {
                ErrorKind::CannotReachDevice
            }
            BadgeError::Transport(_) => ErrorKind::TransportUnavailable,
            BadgeError::Protocol(_) | BadgeError::Image(_) => ErrorKind::DeviceNotReady,
            BadgeError::UpdateMetadata(_) => ErrorKind::CannotFetchUpdateMetadata,
            BadgeError::MissingVersion => ErrorKind::CannotParseUpdateVersion,
            BadgeError::MissingChecksum => ErrorKind::CannotFetchUpdateChecksum,
            BadgeError::UpdateBinary(_) => ErrorKind::CannotFetchBinary,
            BadgeError::ChecksumMismatch { .. } => ErrorKind::ChecksumMismatch,
            BadgeError::NotNewer { .. } => ErrorKind::UpdateNotNewer,
        }
    }
}
