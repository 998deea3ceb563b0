//! Decoders for the badge's replies.
//!
//! Replies are plain byte strings: short acknowledgement texts, delimited
//! field lists, or small binary records.

use bytes::Buf;

use crate::constants::*;
use crate::error::ProtocolError;
use crate::types::*;

/// Render a reply as text for logs and error messages.
pub fn reply_text(reply: &[u8]) -> String {
    String::from_utf8_lossy(reply).into_owned()
}

/// Require `reply` to be exactly `expected`.
pub fn expect_ack(reply: &[u8], expected: &'static str) -> Result<(), ProtocolError> {
    if reply == expected.as_bytes() {
        Ok(())
    } else {
        Err(ProtocolError::UnexpectedReply {
            expected,
            actual: reply_text(reply),
        })
    }
}

/// Require `reply` to start with `expected`.
///
/// The animation commands append data after their `OK`.
pub fn expect_ack_prefix(reply: &[u8], expected: &'static str) -> Result<(), ProtocolError> {
    if reply.starts_with(expected.as_bytes()) {
        Ok(())
    } else {
        Err(ProtocolError::UnexpectedReply {
            expected,
            actual: reply_text(reply),
        })
    }
}

/// Split `data` on `divider`, dropping empty segments.
pub fn split_fields(data: &[u8], divider: u8) -> Vec<&[u8]> {
    data.split(|&b| b == divider)
        .filter(|segment| !segment.is_empty())
        .collect()
}

impl DeviceInfo {
    /// Decode a GETINFO reply.
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        let fields = split_fields(data, MESSAGE_LIST_DIVIDER);
        if fields.len() != GETINFO_FIELD_COUNT {
            return Err(ProtocolError::FieldCount {
                expected: GETINFO_FIELD_COUNT,
                actual: fields.len(),
            });
        }

        Ok(DeviceInfo {
            owner: reply_text(fields[0]),
            contact: reply_text(fields[1]),
            sw_version: reply_text(fields[2]),
            hw_version: reply_text(fields[3]),
            led_enabled: fields[4][0] != 0,
            current_image: reply_text(fields[5]),
            bt_pin: reply_text(fields[6]),
        })
    }

    /// Encode as the badge does. Empty fields cannot be represented.
    pub fn encode(&self) -> Vec<u8> {
        let led = [u8::from(self.led_enabled)];
        let fields: [&[u8]; GETINFO_FIELD_COUNT] = [
            self.owner.as_bytes(),
            self.contact.as_bytes(),
            self.sw_version.as_bytes(),
            self.hw_version.as_bytes(),
            &led,
            self.current_image.as_bytes(),
            self.bt_pin.as_bytes(),
        ];
        fields.join(&MESSAGE_LIST_DIVIDER)
    }
}

impl LedBorderInfo {
    /// Decode a GetLedInfo reply.
    ///
    /// ```text
    /// +---------+--------------+------------+-------+------------------------+
    /// | enabled | pattern (37) | brightness | count | count x (type, param)  |
    /// +---------+--------------+------------+-------+------------------------+
    /// ```
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < LED_INFO_MIN_SIZE {
            return Err(ProtocolError::FrameTooShort {
                expected: LED_INFO_MIN_SIZE,
                actual: data.len(),
            });
        }

        let mut buf = data;
        let enabled = buf.get_u8() != 0;
        let pattern = LedBorderPattern::decode(buf)?;
        buf.advance(LED_PATTERN_SIZE);
        let brightness = brightness_from_wire(buf.get_u8());
        let count = buf.get_u8() as usize;

        let animations: Option<AnimationList> = if buf.remaining() >= count * 2 {
            Some(
                (0..count)
                    .map(|i| AnimationModel {
                        index: i as u8,
                        anim_type: buf.get_u8(),
                        param: buf.get_u8(),
                    })
                    .collect(),
            )
        } else {
            log::debug!(
                "led info declares {} animations but only {} bytes follow",
                count,
                buf.remaining()
            );
            None
        };

        Ok(LedBorderInfo {
            enabled,
            pattern,
            brightness,
            animations,
        })
    }
}

/// Decode a ListImages reply into image names.
pub fn decode_image_names(data: &[u8]) -> Vec<String> {
    split_fields(data, IMAGE_NAME_DIVIDER)
        .into_iter()
        .map(reply_text)
        .collect()
}
