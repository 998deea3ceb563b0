//! Over-the-air firmware updates.
//!
//! An update runs in two phases so a user can confirm between them:
//!
//! 1. [`Updater::prepare`] asks the badge for permission, reads its current
//!    version, fetches the server's metadata and binary and verifies the
//!    checksum. Any failure fetching or verifying sends CancelUpdate to the
//!    badge.
//! 2. [`UpdateTransaction::apply`] streams the binary in packets, each
//!    acknowledged with `OK`, and waits for `UPDATE_SUCCESS`.
//!
//! ```text
//! packet: | marker (u32 LE) | packet length (u32 LE) | firmware bytes ... |
//!           0 = more follow     header + data
//!           0xE0E0A0A0 = last
//! ```

use std::time::Duration;

use ecb_protocol::{
    expect_ack, reply_text, Command, ACK_OK, ACK_READY, ACK_READY_TRANS, ACK_UPDATE_SUCCESS,
    UPDATE_PACKET_HEADER_SIZE, UPDATE_PACKET_MARKER_CONTINUE, UPDATE_PACKET_MARKER_END,
};
use tracing::{debug, info, warn};

use crate::config::{ClientConfig, UpdateConfig, VersionComparison};
use crate::error::BadgeError;
use crate::session::Session;
use crate::update_server::UpdateServer;

// ============================================================================
// Versions
// ============================================================================

/// Parse `vMAJ.MIN.BUILD`.
pub fn parse_version(text: &str) -> Option<[u32; 3]> {
    let mut parts = text.strip_prefix('v')?.split('.');
    let mut version = [0u32; 3];
    for slot in version.iter_mut() {
        *slot = parts.next()?.parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(version)
}

/// Whether `new` is a newer firmware than `old`.
///
/// Malformed versions on either side are never newer.
pub fn is_version_newer(new: &str, old: &str, mode: VersionComparison) -> bool {
    let (Some(new), Some(old)) = (parse_version(new), parse_version(old)) else {
        return false;
    };

    match mode {
        VersionComparison::Lexicographic => new > old,
        VersionComparison::AnyComponent => new.iter().zip(old.iter()).any(|(n, o)| n > o),
    }
}

// ============================================================================
// Packets
// ============================================================================

/// Splits a firmware binary into update packets.
#[derive(Debug, Clone)]
pub struct UpdatePackets<'a> {
    binary: &'a [u8],
    offset: usize,
    chunk_size: usize,
}

/// Packets for sending `binary` with transport packets of `packet_size`
/// bytes, header included.
pub fn update_packets(binary: &[u8], packet_size: usize) -> UpdatePackets<'_> {
    UpdatePackets {
        binary,
        offset: 0,
        chunk_size: packet_size.saturating_sub(UPDATE_PACKET_HEADER_SIZE).max(1),
    }
}

impl Iterator for UpdatePackets<'_> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        let remaining = self.binary.len().checked_sub(self.offset).filter(|&r| r > 0)?;
        let take = remaining.min(self.chunk_size);
        let marker = if remaining > self.chunk_size {
            UPDATE_PACKET_MARKER_CONTINUE
        } else {
            UPDATE_PACKET_MARKER_END
        };

        let mut packet = Vec::with_capacity(UPDATE_PACKET_HEADER_SIZE + take);
        packet.extend_from_slice(&marker.to_le_bytes());
        packet.extend_from_slice(&((UPDATE_PACKET_HEADER_SIZE + take) as u32).to_le_bytes());
        packet.extend_from_slice(&self.binary[self.offset..self.offset + take]);

        self.offset += take;
        Some(packet)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.binary.len() - self.offset;
        let count = remaining.div_ceil(self.chunk_size);
        (count, Some(count))
    }
}

impl ExactSizeIterator for UpdatePackets<'_> {}

// ============================================================================
// Updater
// ============================================================================

/// Drives a firmware update on a connected badge.
pub struct Updater<'a, S> {
    session: &'a Session,
    server: S,
    config: UpdateConfig,
    timeout: Duration,
    packet_size: usize,
}

impl<'a, S: UpdateServer> Updater<'a, S> {
    pub fn new(session: &'a Session, server: S, config: &ClientConfig) -> Self {
        Updater {
            session,
            server,
            config: config.update.clone(),
            timeout: config.command_timeout(),
            packet_size: config.raw_packet_size,
        }
    }

    /// Put the badge in update mode and download a verified binary.
    pub fn prepare(&self) -> Result<UpdateTransaction<'a>, BadgeError> {
        let reply = self.session.send_command(&Command::RequestUpdate, self.timeout)?;
        if let Err(e) = expect_ack(&reply, ACK_OK) {
            // Older firmware answers with something else and still proceeds.
            warn!("update request not acknowledged: {}", e);
        }

        let reply = self.session.send_command(&Command::StartUpdate, self.timeout)?;
        let current_version = reply_text(&reply);
        info!("badge firmware {}", current_version);

        let fetched = self
            .fetch_metadata(&current_version)
            .and_then(|(version, checksum)| {
                let binary = self.fetch_binary(&checksum)?;
                Ok((version, checksum, binary))
            });

        match fetched {
            Ok((new_version, checksum, binary)) => Ok(UpdateTransaction {
                session: self.session,
                timeout: self.timeout,
                packet_size: self.packet_size,
                current_version,
                new_version,
                checksum,
                binary,
            }),
            Err(e) => {
                warn!("update aborted: {}", e);
                if let Err(cancel) = self.session.send_command_no_reply(&Command::CancelUpdate) {
                    warn!("could not cancel update on badge: {}", cancel);
                }
                Err(e)
            }
        }
    }

    /// Prepare and apply in one go.
    pub fn run(&self, progress: impl FnMut(usize, usize)) -> Result<String, BadgeError> {
        let transaction = self.prepare()?;
        let version = transaction.new_version().to_string();
        transaction.apply(progress)?;
        Ok(version)
    }

    fn fetch_metadata(&self, current: &str) -> Result<(String, String), BadgeError> {
        let text = self.server.fetch_info().map_err(BadgeError::UpdateMetadata)?;
        let mut lines = text.lines().map(str::trim);

        let version = lines
            .next()
            .filter(|line| !line.is_empty())
            .ok_or(BadgeError::MissingVersion)?;
        info!("server firmware {}", version);

        if !is_version_newer(version, current, self.config.version_comparison) {
            return Err(BadgeError::NotNewer {
                current: current.to_string(),
                available: version.to_string(),
            });
        }

        let checksum = lines
            .next()
            .filter(|line| !line.is_empty())
            .ok_or(BadgeError::MissingChecksum)?;
        debug!("server checksum {}", checksum);

        Ok((version.to_string(), checksum.to_string()))
    }

    fn fetch_binary(&self, checksum: &str) -> Result<Vec<u8>, BadgeError> {
        let binary = self
            .server
            .fetch_binary(self.config.max_firmware_size)
            .map_err(BadgeError::UpdateBinary)?;

        let actual = self.config.checksum.digest_hex(&binary);
        if !actual.eq_ignore_ascii_case(checksum) {
            return Err(BadgeError::ChecksumMismatch {
                expected: checksum.to_string(),
                actual,
            });
        }
        debug!("firmware of {} bytes verified", binary.len());
        Ok(binary)
    }
}

/// A verified update waiting to be applied or cancelled.
pub struct UpdateTransaction<'a> {
    session: &'a Session,
    timeout: Duration,
    packet_size: usize,
    current_version: String,
    new_version: String,
    checksum: String,
    binary: Vec<u8>,
}

impl std::fmt::Debug for UpdateTransaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateTransaction")
            .field("current_version", &self.current_version)
            .field("new_version", &self.new_version)
            .field("checksum", &self.checksum)
            .field("binary_len", &self.binary.len())
            .finish()
    }
}

impl UpdateTransaction<'_> {
    /// Firmware version the badge runs now.
    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    /// Firmware version being installed.
    pub fn new_version(&self) -> &str {
        &self.new_version
    }

    /// Verified checksum of the binary.
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    /// Size of the binary in bytes.
    pub fn binary_len(&self) -> usize {
        self.binary.len()
    }

    /// Stream the binary to the badge, reporting (bytes sent, total).
    pub fn apply(self, mut progress: impl FnMut(usize, usize)) -> Result<(), BadgeError> {
        let reply = self.session.send_command(&Command::ValidateUpdate, self.timeout)?;
        expect_ack(&reply, ACK_READY)?;
        let reply = self.session.send_command(&Command::StartTransferUpdate, self.timeout)?;
        expect_ack(&reply, ACK_READY_TRANS)?;

        let total = self.binary.len();
        let mut sent = 0;
        for packet in update_packets(&self.binary, self.packet_size) {
            self.session.transmit(&packet)?;
            sent += packet.len() - UPDATE_PACKET_HEADER_SIZE;
            debug!("update packet sent, {}/{} bytes", sent, total);

            let reply = self.session.receive(self.timeout)?;
            expect_ack(&reply, ACK_OK)?;
            progress(sent, total);
        }

        let reply = self.session.receive(self.timeout)?;
        expect_ack(&reply, ACK_UPDATE_SUCCESS)?;
        info!("badge updated to {}", self.new_version);
        Ok(())
    }

    /// Leave update mode without installing.
    pub fn cancel(self) -> Result<(), BadgeError> {
        info!("cancelling update to {}", self.new_version);
        self.session.send_command_no_reply(&Command::CancelUpdate)
    }
}
