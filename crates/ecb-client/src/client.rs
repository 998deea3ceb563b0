//! High-level badge operations.

use std::sync::Arc;

use ecb_image::PackedImage;
use ecb_protocol::{
    decode_image_names, expect_ack, expect_ack_prefix, reply_text, Command, DeviceInfo,
    LedBorderInfo, LedBorderPattern, ProtocolError, ACK_OK, ACK_READY, ACK_UPDATED,
    HANDSHAKE_TOKEN,
};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::BadgeError;
use crate::session::Session;
use crate::tcp::TcpTransport;
use crate::transport::Transport;
use crate::update_server::UpdateServer;
use crate::updater::Updater;

/// A connected badge.
#[derive(Debug)]
pub struct BadgeClient {
    session: Session,
    config: ClientConfig,
}

impl BadgeClient {
    /// Connect over TCP to `config.address` and wait for the handshake.
    pub fn connect(config: ClientConfig) -> Result<Self, BadgeError> {
        let session = Session::new(&config);
        let transport = TcpTransport::connect(
            config.address.as_str(),
            session.handler(),
            config.connect_timeout(),
        )?;
        Self::attach(session, transport, config)
    }

    /// Attach `session` to an already open transport and wait for the
    /// handshake. The connection is torn down if it does not complete.
    pub fn attach(
        session: Session,
        transport: Arc<dyn Transport>,
        config: ClientConfig,
    ) -> Result<Self, BadgeError> {
        let client = BadgeClient { session, config };
        client.session.attach(transport)?;

        if !client.session.wait_for_connection(client.config.connection_timeout()) {
            warn!("badge did not answer the handshake");
            client.session.cancel_connect();
            return Err(BadgeError::Timeout(client.config.connection_timeout()));
        }
        Ok(client)
    }

    /// The underlying session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Close the connection.
    pub fn disconnect(&self) {
        self.session.cancel_connect();
    }

    fn request(&self, command: &Command) -> Result<Vec<u8>, BadgeError> {
        self.session.send_command(command, self.config.command_timeout())
    }

    fn request_ok(&self, command: &Command) -> Result<(), BadgeError> {
        let reply = self.request(command)?;
        expect_ack(&reply, ACK_OK)?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Device
    // ------------------------------------------------------------------------

    /// Check the badge still answers.
    pub fn ping(&self) -> Result<(), BadgeError> {
        let reply = self.request(&Command::Ping)?;
        if reply != HANDSHAKE_TOKEN {
            return Err(ProtocolError::UnexpectedReply {
                expected: "PONG",
                actual: reply_text(&reply),
            }
            .into());
        }
        Ok(())
    }

    /// Read owner, versions and display state.
    pub fn info(&self) -> Result<DeviceInfo, BadgeError> {
        let reply = self.request(&Command::GetInfo)?;
        Ok(DeviceInfo::decode(&reply)?)
    }

    pub fn set_owner(&self, owner: &str) -> Result<(), BadgeError> {
        self.request_ok(&Command::SetOwner {
            owner: owner.to_string(),
        })
    }

    pub fn set_contact(&self, contact: &str) -> Result<(), BadgeError> {
        self.request_ok(&Command::SetContact {
            contact: contact.to_string(),
        })
    }

    /// Change the Bluetooth name and PIN. The badge does not answer.
    pub fn set_bluetooth(&self, name: &str, pin: &str) -> Result<(), BadgeError> {
        self.session.send_command_no_reply(&Command::SetBluetoothSettings {
            name: name.to_string(),
            pin: pin.to_string(),
        })
    }

    pub fn factory_reset(&self) -> Result<(), BadgeError> {
        info!("requesting factory reset");
        self.request_ok(&Command::FactoryReset)
    }

    // ------------------------------------------------------------------------
    // Display
    // ------------------------------------------------------------------------

    /// Blank the e-ink display. The badge does not answer.
    pub fn clear_display(&self) -> Result<(), BadgeError> {
        self.session.send_command_no_reply(&Command::ClearDisplay)
    }

    /// Store `image` under `name` and show it, reporting (bytes sent, total).
    pub fn push_image(
        &self,
        name: &str,
        image: &PackedImage,
        mut progress: impl FnMut(usize, usize),
    ) -> Result<(), BadgeError> {
        let reply = self.request(&Command::PushImage {
            name: name.to_string(),
        })?;
        expect_ack(&reply, ACK_READY)?;

        let data = image.as_bytes();
        let chunk_size = self.config.raw_packet_size.max(1);
        let mut sent = 0;
        for chunk in data.chunks(chunk_size) {
            self.session.transmit(chunk)?;
            sent += chunk.len();
            debug!("image chunk sent, {}/{} bytes", sent, data.len());

            let reply = self.session.receive(self.config.command_timeout())?;
            expect_ack(&reply, ACK_OK)?;
            progress(sent, data.len());
        }

        let reply = self.session.receive(self.config.long_timeout())?;
        expect_ack(&reply, ACK_UPDATED)?;
        info!("image {} stored", name);
        Ok(())
    }

    /// Download a stored image.
    pub fn fetch_image(&self, name: &str) -> Result<PackedImage, BadgeError> {
        let data = self.session.fetch_raw(
            &Command::GetCurrentImage {
                name: name.to_string(),
            },
            self.config.long_timeout(),
        )?;
        Ok(PackedImage::from_bytes(data)?)
    }

    /// Names of up to `count` stored images, starting at `start`.
    pub fn list_images(&self, start: u32, count: u32) -> Result<Vec<String>, BadgeError> {
        let reply = self.request(&Command::ListImages { start, count })?;
        Ok(decode_image_names(&reply))
    }

    /// Show a stored image.
    pub fn select_image(&self, name: &str) -> Result<(), BadgeError> {
        let reply = self.session.send_command(
            &Command::SelectImage {
                name: name.to_string(),
            },
            self.config.long_timeout(),
        )?;
        expect_ack(&reply, ACK_OK)?;
        Ok(())
    }

    pub fn remove_image(&self, name: &str) -> Result<(), BadgeError> {
        self.request_ok(&Command::RemoveImage {
            name: name.to_string(),
        })
    }

    // ------------------------------------------------------------------------
    // LED border
    // ------------------------------------------------------------------------

    pub fn led_info(&self) -> Result<LedBorderInfo, BadgeError> {
        let reply = self.request(&Command::GetLedInfo)?;
        Ok(LedBorderInfo::decode(&reply)?)
    }

    pub fn set_led_enabled(&self, enabled: bool) -> Result<(), BadgeError> {
        let command = if enabled {
            Command::EnableLedBorder
        } else {
            Command::DisableLedBorder
        };
        self.request_ok(&command)
    }

    /// Set brightness in percent; values over 100 are clamped.
    pub fn set_brightness(&self, percent: u8) -> Result<(), BadgeError> {
        self.request_ok(&Command::SetBrightness { percent })
    }

    pub fn set_pattern(&self, pattern: &LedBorderPattern) -> Result<(), BadgeError> {
        self.request_ok(&Command::SetPattern(*pattern))
    }

    pub fn add_animation(&self, anim_type: u8, param: u8) -> Result<(), BadgeError> {
        let reply = self.request(&Command::AddAnimation { anim_type, param })?;
        expect_ack_prefix(&reply, ACK_OK)?;
        Ok(())
    }

    pub fn remove_animation(&self, index: u8) -> Result<(), BadgeError> {
        let reply = self.request(&Command::RemoveAnimation { index })?;
        expect_ack_prefix(&reply, ACK_OK)?;
        Ok(())
    }

    pub fn clear_animations(&self) -> Result<(), BadgeError> {
        self.request_ok(&Command::ClearAnimations)
    }

    // ------------------------------------------------------------------------
    // Firmware
    // ------------------------------------------------------------------------

    /// Firmware updater fetching from `server`.
    pub fn updater<S: UpdateServer>(&self, server: S) -> Updater<'_, S> {
        Updater::new(&self.session, server, &self.config)
    }
}

impl Drop for BadgeClient {
    fn drop(&mut self) {
        self.session.cancel_connect();
    }
}
