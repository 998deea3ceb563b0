//! Byte transport boundary.
//!
//! A transport moves opaque byte chunks to and from the badge. Received
//! chunks are pushed to a [`TransportHandler`] from the transport's own
//! thread, with no alignment to message boundaries.

use crate::error::TransportError;

/// Outgoing half of a connection to a badge.
pub trait Transport: Send + Sync {
    /// Write all of `data`.
    fn send(&self, data: &[u8]) -> Result<(), TransportError>;

    /// Shut the connection down. Further sends fail.
    fn close(&self);
}

/// Receiver of transport events.
///
/// Called on the transport's delivery thread. Implementations must not
/// block on a reply from the badge here.
pub trait TransportHandler: Send + Sync {
    /// A chunk of bytes arrived.
    fn on_receive(&self, data: &[u8]);

    /// The underlying link came up or went away.
    fn on_connection_changed(&self, connected: bool);
}
