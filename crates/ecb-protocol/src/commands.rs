//! Commands that can be sent to the badge.

use bytes::{Buf, BufMut};

use crate::constants::*;
use crate::error::ProtocolError;
use crate::frame::RequestFrame;
use crate::types::*;

/// Commands that can be sent to the badge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Liveness check, answered with `PONG`.
    Ping,

    /// Clear the e-ink display. The badge does not answer.
    ClearDisplay,

    /// Announce an image upload. The packed pixels follow in raw chunks.
    PushImage {
        /// Image name, truncated to fit the frame.
        name: String,
    },

    /// Turn the LED border on.
    EnableLedBorder,

    /// Turn the LED border off.
    DisableLedBorder,

    /// Append an LED border animation.
    AddAnimation {
        /// Animation type identifier.
        anim_type: u8,
        /// Animation speed.
        param: u8,
    },

    /// Remove an LED border animation.
    RemoveAnimation {
        /// Index in the badge's animation table.
        index: u8,
    },

    /// Replace the LED border color pattern.
    SetPattern(LedBorderPattern),

    /// Remove every LED border animation.
    ClearAnimations,

    /// Set the LED border brightness.
    SetBrightness {
        /// Brightness in percent, clamped to 100.
        percent: u8,
    },

    /// Set the owner text.
    SetOwner {
        /// Owner text.
        owner: String,
    },

    /// Set the contact text.
    SetContact {
        /// Contact text.
        contact: String,
    },

    /// Set the bluetooth name and PIN. The badge does not answer.
    SetBluetoothSettings {
        /// Advertised name, truncated to 21 bytes.
        name: String,
        /// PIN, truncated to 4 bytes.
        pin: String,
    },

    /// Restore factory settings.
    FactoryReset,

    /// Enter update mode, answered with the running firmware version.
    StartUpdate,

    /// Confirm the downloaded update, answered with `READY`.
    ValidateUpdate,

    /// Abort a pending update. The badge does not answer.
    CancelUpdate,

    /// Begin the firmware transfer, answered with `READY_TRANS`.
    StartTransferUpdate,

    /// Query the device information fields.
    GetInfo,

    /// Ask the badge for permission to update.
    RequestUpdate,

    /// Query the LED border state.
    GetLedInfo,

    /// List stored image names.
    ListImages {
        /// Number of names to skip.
        start: u32,
        /// Maximum number of names to return.
        count: u32,
    },

    /// Delete a stored image.
    RemoveImage {
        /// Image name.
        name: String,
    },

    /// Display a stored image.
    SelectImage {
        /// Image name.
        name: String,
    },

    /// Download a stored image's packed pixels as a raw transfer.
    GetCurrentImage {
        /// Image name.
        name: String,
    },
}

impl Command {
    /// Get the command code for this command.
    pub fn code(&self) -> u8 {
        match self {
            Command::Ping => CMD_PING,
            Command::ClearDisplay => CMD_CLEAR_EINK,
            Command::PushImage { .. } => CMD_UPDATE_EINK,
            Command::EnableLedBorder => CMD_ENABLE_LED_BORDER,
            Command::DisableLedBorder => CMD_DISABLE_LED_BORDER,
            Command::AddAnimation { .. } => CMD_ADD_ANIM_LED_BORDER,
            Command::RemoveAnimation { .. } => CMD_REM_ANIM_LED_BORDER,
            Command::SetPattern(_) => CMD_SET_PATTERN_LED_BORDER,
            Command::ClearAnimations => CMD_CLEAR_ANIM_LED_BORDER,
            Command::SetBrightness { .. } => CMD_SET_BRIGHTNESS_LED_BORDER,
            Command::SetOwner { .. } => CMD_SET_OWNER,
            Command::SetContact { .. } => CMD_SET_CONTACT,
            Command::SetBluetoothSettings { .. } => CMD_SET_BT_SETTINGS,
            Command::FactoryReset => CMD_REQ_FACTORY_RESET,
            Command::StartUpdate => CMD_START_UPDATE,
            Command::ValidateUpdate => CMD_VALIDATE_UPDATE,
            Command::CancelUpdate => CMD_CANCEL_UPDATE,
            Command::StartTransferUpdate => CMD_START_TRANS_UPDATE,
            Command::GetInfo => CMD_GETINFO,
            Command::RequestUpdate => CMD_REQUEST_UPDATE,
            Command::GetLedInfo => CMD_GET_INFO_LED_BORDER,
            Command::ListImages { .. } => CMD_GET_IMAGES_NAME,
            Command::RemoveImage { .. } => CMD_REMOVE_IMAGE,
            Command::SelectImage { .. } => CMD_SELECT_LOADED_IMAGE,
            Command::GetCurrentImage { .. } => CMD_GET_CURRENT_IMAGE,
        }
    }

    /// Whether the badge answers this command with a framed response.
    pub fn expects_reply(&self) -> bool {
        !matches!(
            self,
            Command::ClearDisplay | Command::SetBluetoothSettings { .. } | Command::CancelUpdate
        )
    }

    /// Encode the command payload (everything after the command id).
    pub fn payload(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut buf = Vec::new();

        match self {
            Command::PushImage { name } => {
                let bytes = name.as_bytes();
                buf.put_slice(&bytes[..bytes.len().min(MAX_REQUEST_PAYLOAD)]);
            }
            Command::AddAnimation { anim_type, param } => {
                buf.put_u8(*anim_type);
                buf.put_u8(*param);
            }
            Command::RemoveAnimation { index } => buf.put_u8(*index),
            Command::SetPattern(pattern) => buf.put_slice(&pattern.encode()),
            Command::SetBrightness { percent } => buf.put_u8(brightness_to_wire(*percent)),
            Command::SetOwner { owner: text } | Command::SetContact { contact: text } => {
                if text.len() > MAX_OWNER_CONTACT_SIZE {
                    return Err(ProtocolError::PayloadTooLarge {
                        max: MAX_OWNER_CONTACT_SIZE,
                        actual: text.len(),
                    });
                }
                buf.put_slice(text.as_bytes());
            }
            Command::SetBluetoothSettings { name, pin } => {
                put_padded(&mut buf, name.as_bytes(), BT_NAME_SIZE);
                put_padded(&mut buf, pin.as_bytes(), BT_PIN_SIZE);
            }
            Command::ListImages { start, count } => {
                buf.put_u32_le(*start);
                buf.put_u32_le(*count);
            }
            Command::RemoveImage { name }
            | Command::SelectImage { name }
            | Command::GetCurrentImage { name } => buf.put_slice(name.as_bytes()),
            _ => {}
        }

        Ok(buf)
    }

    /// Build the 68-byte request frame for this command.
    pub fn to_frame(&self) -> Result<RequestFrame, ProtocolError> {
        RequestFrame::new(self.code(), &self.payload()?)
    }

    /// Parse a command out of a request frame.
    ///
    /// Text fields lose any trailing NUL bytes, since the frame padding
    /// cannot be told apart from the text.
    pub fn decode(frame: &RequestFrame) -> Result<Self, ProtocolError> {
        let mut data = frame.payload();

        let command = match frame.command() {
            CMD_PING => Command::Ping,
            CMD_CLEAR_EINK => Command::ClearDisplay,
            CMD_UPDATE_EINK => Command::PushImage {
                name: text_field(data),
            },
            CMD_ENABLE_LED_BORDER => Command::EnableLedBorder,
            CMD_DISABLE_LED_BORDER => Command::DisableLedBorder,
            CMD_ADD_ANIM_LED_BORDER => Command::AddAnimation {
                anim_type: data.get_u8(),
                param: data.get_u8(),
            },
            CMD_REM_ANIM_LED_BORDER => Command::RemoveAnimation {
                index: data.get_u8(),
            },
            CMD_SET_PATTERN_LED_BORDER => Command::SetPattern(LedBorderPattern::decode(data)?),
            CMD_CLEAR_ANIM_LED_BORDER => Command::ClearAnimations,
            CMD_SET_BRIGHTNESS_LED_BORDER => Command::SetBrightness {
                percent: brightness_from_wire(data.get_u8()),
            },
            CMD_SET_OWNER => Command::SetOwner {
                owner: text_field(data),
            },
            CMD_SET_CONTACT => Command::SetContact {
                contact: text_field(data),
            },
            CMD_SET_BT_SETTINGS => Command::SetBluetoothSettings {
                name: text_field(&data[..BT_NAME_SIZE]),
                pin: text_field(&data[BT_NAME_SIZE..BT_NAME_SIZE + BT_PIN_SIZE]),
            },
            CMD_REQ_FACTORY_RESET => Command::FactoryReset,
            CMD_START_UPDATE => Command::StartUpdate,
            CMD_VALIDATE_UPDATE => Command::ValidateUpdate,
            CMD_CANCEL_UPDATE => Command::CancelUpdate,
            CMD_START_TRANS_UPDATE => Command::StartTransferUpdate,
            CMD_GETINFO => Command::GetInfo,
            CMD_REQUEST_UPDATE => Command::RequestUpdate,
            CMD_GET_INFO_LED_BORDER => Command::GetLedInfo,
            CMD_GET_IMAGES_NAME => Command::ListImages {
                start: data.get_u32_le(),
                count: data.get_u32_le(),
            },
            CMD_REMOVE_IMAGE => Command::RemoveImage {
                name: text_field(data),
            },
            CMD_SELECT_LOADED_IMAGE => Command::SelectImage {
                name: text_field(data),
            },
            CMD_GET_CURRENT_IMAGE => Command::GetCurrentImage {
                name: text_field(data),
            },
            code => return Err(ProtocolError::UnknownCommand(code)),
        };

        Ok(command)
    }
}

/// Write `data` truncated or zero padded to exactly `width` bytes.
fn put_padded(buf: &mut Vec<u8>, data: &[u8], width: usize) {
    let len = data.len().min(width);
    buf.put_slice(&data[..len]);
    buf.put_bytes(0, width - len);
}

fn text_field(data: &[u8]) -> String {
    let end = data.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    String::from_utf8_lossy(&data[..end]).into_owned()
}
