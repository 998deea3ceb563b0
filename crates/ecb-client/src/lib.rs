//! EConBadge client
//!
//! Talks to a badge over a byte transport: a [`Session`] runs the
//! request/response protocol, [`BadgeClient`] wraps it in device operations
//! and [`Updater`] installs new firmware fetched from an [`UpdateServer`].
//!
//! # Example
//!
//! ```no_run
//! use ecb_client::{BadgeClient, ClientConfig};
//!
//! let client = BadgeClient::connect(ClientConfig::default())?;
//! let info = client.info()?;
//! println!("{} runs {}", info.owner, info.sw_version);
//! # Ok::<(), ecb_client::BadgeError>(())
//! ```

mod client;
mod config;
mod error;
mod session;
mod tcp;
mod transport;
mod update_server;
mod updater;

pub use client::BadgeClient;
pub use config::{ChecksumAlgorithm, ClientConfig, ConfigError, UpdateConfig, VersionComparison};
pub use error::{BadgeError, ErrorKind, TransportError, UpdateServerError};
pub use session::{ReceiveMode, Session};
pub use tcp::TcpTransport;
pub use transport::{Transport, TransportHandler};
pub use update_server::{HttpUpdateServer, UpdateServer};
pub use updater::{
    is_version_newer, parse_version, update_packets, UpdatePackets, UpdateTransaction, Updater,
};
