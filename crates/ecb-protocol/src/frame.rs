//! Frame encoding/decoding utilities.
//!
//! Requests travel host → badge as fixed 68-byte frames:
//!
//! ```text
//! +----------------------+-----+------------------+-----------------+
//! | 0xC0 0xDE 0x1E 0xCB  | cmd | payload (<= 63)  | zero padding    |
//! +----------------------+-----+------------------+-----------------+
//! ```
//!
//! Responses travel badge → host as a magic, a one byte length and the
//! payload. The transport delivers them in arbitrary chunks, so the
//! [`FrameCodec`] reassembles them with a small state machine:
//!
//! ```text
//! WaitMagic --magic--> WaitSize --len--> Recompose --len bytes--> (message)
//!     ^                                                                |
//!     +----------------------------------------------------------------+
//! ```

use std::collections::VecDeque;

use bytes::{BufMut, BytesMut};

use crate::constants::*;
use crate::error::ProtocolError;

/// A fixed-size request frame.
#[derive(Clone, PartialEq, Eq)]
pub struct RequestFrame {
    bytes: [u8; REQUEST_FRAME_SIZE],
}

impl RequestFrame {
    /// Build a frame for `command` carrying `payload`.
    ///
    /// Bytes after the payload are always zero.
    pub fn new(command: u8, payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() > MAX_REQUEST_PAYLOAD {
            return Err(ProtocolError::PayloadTooLarge {
                max: MAX_REQUEST_PAYLOAD,
                actual: payload.len(),
            });
        }

        let mut bytes = [0u8; REQUEST_FRAME_SIZE];
        bytes[..MAGIC_SIZE].copy_from_slice(&REQUEST_MAGIC.to_be_bytes());
        bytes[MAGIC_SIZE] = command;
        bytes[REQUEST_HEADER_SIZE..REQUEST_HEADER_SIZE + payload.len()].copy_from_slice(payload);
        Ok(RequestFrame { bytes })
    }

    /// Parse a frame previously produced by [`RequestFrame::new`].
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() != REQUEST_FRAME_SIZE {
            return Err(ProtocolError::FrameTooShort {
                expected: REQUEST_FRAME_SIZE,
                actual: data.len(),
            });
        }

        let magic = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
        if magic != REQUEST_MAGIC {
            return Err(ProtocolError::BadMagic(magic));
        }

        let mut bytes = [0u8; REQUEST_FRAME_SIZE];
        bytes.copy_from_slice(data);
        Ok(RequestFrame { bytes })
    }

    /// Command identifier.
    pub fn command(&self) -> u8 {
        self.bytes[MAGIC_SIZE]
    }

    /// The payload area including its zero padding (always 63 bytes).
    pub fn payload(&self) -> &[u8] {
        &self.bytes[REQUEST_HEADER_SIZE..]
    }

    /// The full 68 bytes as sent on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for RequestFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestFrame")
            .field("command", &self.command())
            .field("payload", &self.payload())
            .finish()
    }
}

impl AsRef<[u8]> for RequestFrame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// What to do with a byte that breaks a partial magic match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ResyncMode {
    /// Fall back along the longest matched prefix and retry the byte, so a
    /// magic that starts inside a failed partial match is still found.
    #[default]
    Rescan,
    /// Reset the match index to zero and drop the offending byte. This is
    /// how shipped badges' companion apps behave.
    Restart,
}

/// Incremental scanner for a 4-byte big-endian magic in a byte stream.
#[derive(Debug, Clone)]
pub struct MagicScanner {
    pattern: [u8; MAGIC_SIZE],
    /// `failure[i]`: length of the longest proper prefix of
    /// `pattern[..=i]` that is also a suffix of it.
    failure: [usize; MAGIC_SIZE],
    matched: usize,
    mode: ResyncMode,
}

impl MagicScanner {
    /// Create a scanner for `magic`.
    pub fn new(magic: u32, mode: ResyncMode) -> Self {
        let pattern = magic.to_be_bytes();
        let mut failure = [0usize; MAGIC_SIZE];
        let mut k = 0;
        for i in 1..MAGIC_SIZE {
            while k > 0 && pattern[i] != pattern[k] {
                k = failure[k - 1];
            }
            if pattern[i] == pattern[k] {
                k += 1;
            }
            failure[i] = k;
        }

        MagicScanner {
            pattern,
            failure,
            matched: 0,
            mode,
        }
    }

    /// Feed one byte. Returns `true` when it completes the magic.
    pub fn feed(&mut self, byte: u8) -> bool {
        loop {
            if byte == self.pattern[self.matched] {
                self.matched += 1;
                break;
            }
            if self.matched == 0 {
                break;
            }
            match self.mode {
                ResyncMode::Restart => {
                    self.matched = 0;
                    return false;
                }
                ResyncMode::Rescan => self.matched = self.failure[self.matched - 1],
            }
        }

        if self.matched == MAGIC_SIZE {
            self.matched = 0;
            true
        } else {
            false
        }
    }

    /// Number of magic bytes matched so far (0..=3).
    pub fn matched(&self) -> usize {
        self.matched
    }

    /// Resynchronisation mode in use.
    pub fn mode(&self) -> ResyncMode {
        self.mode
    }

    /// Forget any partial match.
    pub fn reset(&mut self) {
        self.matched = 0;
    }
}

/// Phase of response reassembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReassemblyPhase {
    /// Looking for the response magic.
    WaitMagic,
    /// Magic seen; the next byte is the payload length.
    WaitSize,
    /// Accumulating payload bytes.
    Recompose,
}

/// A codec reassembling framed responses out of arbitrary byte chunks.
#[derive(Debug)]
pub struct FrameCodec {
    scanner: MagicScanner,
    phase: ReassemblyPhase,
    expected: usize,
    /// Payload accumulated for the message in progress.
    buffer: BytesMut,
    /// Messages completed but not yet taken by [`FrameCodec::decode`].
    complete: VecDeque<Vec<u8>>,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameCodec {
    /// Create a new frame codec using [`ResyncMode::Rescan`].
    pub fn new() -> Self {
        Self::with_resync(ResyncMode::default())
    }

    /// Create a new frame codec with an explicit resynchronisation mode.
    pub fn with_resync(mode: ResyncMode) -> Self {
        FrameCodec {
            scanner: MagicScanner::new(RESPONSE_MAGIC, mode),
            phase: ReassemblyPhase::WaitMagic,
            expected: 0,
            buffer: BytesMut::with_capacity(MAX_RESPONSE_PAYLOAD),
            complete: VecDeque::new(),
        }
    }

    /// Run received bytes through the state machine.
    ///
    /// A chunk may finish any number of messages and leave the next one
    /// partially assembled; every transition the chunk allows is taken.
    pub fn push(&mut self, data: &[u8]) {
        let mut rest = data;

        while !rest.is_empty() {
            match self.phase {
                ReassemblyPhase::WaitMagic => {
                    let byte = rest[0];
                    rest = &rest[1..];
                    let before = self.scanner.matched();
                    if self.scanner.feed(byte) {
                        self.phase = ReassemblyPhase::WaitSize;
                    } else if before > 0 && self.scanner.matched() <= before {
                        log::trace!(
                            "magic mismatch on 0x{:02X} after {} bytes, resync {:?}",
                            byte,
                            before,
                            self.scanner.mode()
                        );
                    }
                }
                ReassemblyPhase::WaitSize => {
                    self.expected = rest[0] as usize;
                    rest = &rest[1..];
                    self.buffer.clear();
                    self.phase = ReassemblyPhase::Recompose;
                    log::trace!("response header, {} payload bytes", self.expected);
                }
                ReassemblyPhase::Recompose => {
                    let take = rest.len().min(self.expected - self.buffer.len());
                    self.buffer.put_slice(&rest[..take]);
                    rest = &rest[take..];
                }
            }

            if self.phase == ReassemblyPhase::Recompose && self.buffer.len() == self.expected {
                self.finish_message();
            }
        }
    }

    fn finish_message(&mut self) {
        let message = self.buffer.split().to_vec();
        log::debug!("reassembled response of {} bytes", message.len());
        self.complete.push_back(message);
        self.expected = 0;
        self.phase = ReassemblyPhase::WaitMagic;
    }

    /// Take the next complete message, if any.
    pub fn decode(&mut self) -> Option<Vec<u8>> {
        self.complete.pop_front()
    }

    /// Current reassembly phase.
    pub fn phase(&self) -> ReassemblyPhase {
        self.phase
    }

    /// Number of payload bytes held for the message in progress.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Drop partial and queued messages and go back to looking for a magic.
    pub fn clear(&mut self) {
        self.scanner.reset();
        self.phase = ReassemblyPhase::WaitMagic;
        self.expected = 0;
        self.buffer.clear();
        self.complete.clear();
    }

    /// Encode a framed response the way the badge emits it.
    pub fn encode_response(payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        if payload.len() > MAX_RESPONSE_PAYLOAD {
            return Err(ProtocolError::PayloadTooLarge {
                max: MAX_RESPONSE_PAYLOAD,
                actual: payload.len(),
            });
        }

        let mut buf = Vec::with_capacity(MAGIC_SIZE + 1 + payload.len());
        buf.put_u32(RESPONSE_MAGIC);
        buf.put_u8(payload.len() as u8);
        buf.extend_from_slice(payload);
        Ok(buf)
    }
}
