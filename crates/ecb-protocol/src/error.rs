//! Protocol error types.

use thiserror::Error;

/// Errors that can occur when working with the badge protocol.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame is too short to be valid.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Expected minimum length.
        expected: usize,
        /// Actual length received.
        actual: usize,
    },

    /// Payload does not fit in the frame.
    #[error("payload too large: maximum {max} bytes, got {actual}")]
    PayloadTooLarge {
        /// Maximum allowed length.
        max: usize,
        /// Actual length supplied.
        actual: usize,
    },

    /// Request frame did not start with the request magic.
    #[error("bad magic: 0x{0:08X}")]
    BadMagic(u32),

    /// Unknown command code.
    #[error("unknown command code: {0}")]
    UnknownCommand(u8),

    /// A delimited reply carried the wrong number of fields.
    #[error("wrong field count: expected {expected}, got {actual}")]
    FieldCount {
        /// Expected number of fields.
        expected: usize,
        /// Number of fields found.
        actual: usize,
    },

    /// The badge answered with something other than the expected text.
    #[error("unexpected reply: expected {expected:?}, got {actual:?}")]
    UnexpectedReply {
        /// Acknowledgement text that was expected.
        expected: &'static str,
        /// Reply received, lossily decoded.
        actual: String,
    },

    /// Invalid data in frame.
    #[error("invalid frame data: {0}")]
    InvalidData(String),
}
