//! Raw transfer receiver.
//!
//! Large replies (stored images) bypass framing entirely. The badge sends a
//! little-endian `u32` total length followed by exactly that many bytes,
//! pausing after every chunk until the host answers with a single
//! [`RAW_ACK_BYTE`].
//!
//! ```text
//! +-------------------+---------------------------------------+
//! | total (u32 LE)    | data[0..total]                        |
//! +-------------------+---------------------------------------+
//! ```

use crate::constants::*;

/// What the caller must do after feeding a chunk to a [`RawReceiver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawProgress {
    /// The chunk was absorbed but the length header is still incomplete.
    NeedMore,
    /// More data is expected; acknowledge the chunk with [`RAW_ACK_BYTE`].
    Ack,
    /// The transfer finished with this chunk. No acknowledgement is sent.
    Complete(Vec<u8>),
}

#[derive(Debug)]
enum RawState {
    Header { bytes: [u8; RAW_LENGTH_SIZE], have: usize },
    Receiving { total: usize, data: Vec<u8> },
    Done,
}

/// Reassembles one raw transfer.
#[derive(Debug)]
pub struct RawReceiver {
    state: RawState,
}

impl Default for RawReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl RawReceiver {
    /// Create a receiver waiting for the length header.
    pub fn new() -> Self {
        RawReceiver {
            state: RawState::Header {
                bytes: [0; RAW_LENGTH_SIZE],
                have: 0,
            },
        }
    }

    /// Feed one transport chunk.
    pub fn push(&mut self, chunk: &[u8]) -> RawProgress {
        let mut rest = chunk;

        if let RawState::Header { bytes, have } = &mut self.state {
            let take = rest.len().min(RAW_LENGTH_SIZE - *have);
            bytes[*have..*have + take].copy_from_slice(&rest[..take]);
            *have += take;
            rest = &rest[take..];

            if *have < RAW_LENGTH_SIZE {
                return RawProgress::NeedMore;
            }

            let total = u32::from_le_bytes(*bytes) as usize;
            log::debug!("raw transfer of {} bytes", total);
            self.state = RawState::Receiving {
                total,
                data: Vec::new(),
            };
        }

        match &mut self.state {
            RawState::Receiving { total, data } => {
                let take = rest.len().min(*total - data.len());
                data.extend_from_slice(&rest[..take]);
                if take < rest.len() {
                    log::debug!("ignoring {} bytes past the raw transfer", rest.len() - take);
                }

                if data.len() == *total {
                    let data = std::mem::take(data);
                    self.state = RawState::Done;
                    RawProgress::Complete(data)
                } else {
                    log::trace!("raw transfer {}/{}", data.len(), total);
                    RawProgress::Ack
                }
            }
            RawState::Done => {
                log::debug!("raw transfer already complete, dropping {} bytes", rest.len());
                RawProgress::NeedMore
            }
            RawState::Header { .. } => RawProgress::NeedMore,
        }
    }

    /// Declared length, once the header has been received.
    pub fn total(&self) -> Option<usize> {
        match &self.state {
            RawState::Receiving { total, .. } => Some(*total),
            _ => None,
        }
    }

    /// Bytes still expected, once the header has been received.
    pub fn remaining(&self) -> Option<usize> {
        match &self.state {
            RawState::Receiving { total, data } => Some(*total - data.len()),
            RawState::Done => Some(0),
            RawState::Header { .. } => None,
        }
    }

    /// Whether the transfer has completed.
    pub fn is_complete(&self) -> bool {
        matches!(self.state, RawState::Done)
    }
}
