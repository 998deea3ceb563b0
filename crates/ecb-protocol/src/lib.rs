//! EConBadge serial protocol
//!
//! This crate provides types and utilities for talking to EConBadge firmware
//! over a serial byte stream (Bluetooth SPP or a TCP socket). It does no I/O
//! itself: callers push received bytes in and write encoded frames out.
//!
//! # Protocol Overview
//!
//! - **Requests** (host → badge): fixed 68-byte [`RequestFrame`]s carrying a
//!   `CMD_*` identifier and up to 63 payload bytes.
//! - **Responses** (badge → host): a 4-byte magic, a 1-byte length and the
//!   payload, reassembled by [`FrameCodec`] from arbitrarily split chunks.
//! - **Raw transfers** (badge → host): a length-prefixed blob acknowledged
//!   chunk by chunk, handled by [`RawReceiver`].
//!
//! # Example
//!
//! ```rust
//! use ecb_protocol::{Command, DeviceInfo, FrameCodec};
//!
//! let frame = Command::GetInfo.to_frame()?;
//! assert_eq!(frame.as_bytes().len(), 68);
//!
//! let mut codec = FrameCodec::new();
//! codec.push(&FrameCodec::encode_response(b"a\x06b\x06v1.0.0\x06B\x06\x01\x06img\x061234")?);
//! let info = DeviceInfo::decode(&codec.decode().unwrap_or_default())?;
//! assert_eq!(info.sw_version, "v1.0.0");
//! # Ok::<(), ecb_protocol::ProtocolError>(())
//! ```

mod commands;
mod constants;
mod error;
mod frame;
mod raw;
mod responses;
mod types;

pub use commands::*;
pub use constants::*;
pub use error::*;
pub use frame::*;
pub use raw::*;
pub use responses::*;
pub use types::*;
