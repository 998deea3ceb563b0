//! Protocol constants
//!
//! These constants define the magics, command identifiers, frame sizes and
//! acknowledgement texts used by the EConBadge serial protocol.

// ============================================================================
// Framing
// ============================================================================

/// Magic prefixed to every request frame (host → badge), big-endian on the wire.
pub const REQUEST_MAGIC: u32 = 0xC0DE_1ECB;
/// Magic prefixed to every framed response (badge → host), big-endian on the wire.
pub const RESPONSE_MAGIC: u32 = 0xCB1E_DEC0;

/// Size of the magic field.
pub const MAGIC_SIZE: usize = 4;
/// Size of a request frame header: magic + command id.
pub const REQUEST_HEADER_SIZE: usize = MAGIC_SIZE + 1;
/// Every request frame is exactly this long, zero padded.
pub const REQUEST_FRAME_SIZE: usize = 68;
/// Maximum request payload carried after the header.
pub const MAX_REQUEST_PAYLOAD: usize = REQUEST_FRAME_SIZE - REQUEST_HEADER_SIZE;
/// Maximum framed response payload (1-byte length field).
pub const MAX_RESPONSE_PAYLOAD: usize = u8::MAX as usize;

/// Default chunk size for bulk transfers (image push, firmware update, raw fetch).
pub const RAW_PACKET_SIZE: usize = 8192;
/// Size of the little-endian length prefix of a raw transfer.
pub const RAW_LENGTH_SIZE: usize = 4;
/// Byte sent back to the badge after each non-final raw chunk.
pub const RAW_ACK_BYTE: u8 = 1;

// ============================================================================
// Command Codes (host → badge)
// ============================================================================

/// Liveness check, answered with `PONG`.
pub const CMD_PING: u8 = 0;
/// Clear the e-ink display.
pub const CMD_CLEAR_EINK: u8 = 1;
/// Push a new e-ink image (followed by a chunked image transfer).
pub const CMD_UPDATE_EINK: u8 = 2;
/// Enable the LED border.
pub const CMD_ENABLE_LED_BORDER: u8 = 3;
/// Disable the LED border.
pub const CMD_DISABLE_LED_BORDER: u8 = 4;
/// Add an LED border animation.
pub const CMD_ADD_ANIM_LED_BORDER: u8 = 5;
/// Remove an LED border animation.
pub const CMD_REM_ANIM_LED_BORDER: u8 = 6;
/// Set the LED border color pattern.
pub const CMD_SET_PATTERN_LED_BORDER: u8 = 7;
/// Remove all LED border animations.
pub const CMD_CLEAR_ANIM_LED_BORDER: u8 = 8;
/// Set the LED border brightness.
pub const CMD_SET_BRIGHTNESS_LED_BORDER: u8 = 9;
/// Set the owner text.
pub const CMD_SET_OWNER: u8 = 10;
/// Set the contact text.
pub const CMD_SET_CONTACT: u8 = 11;
/// Set the bluetooth name and PIN.
pub const CMD_SET_BT_SETTINGS: u8 = 12;
/// Request a factory reset.
pub const CMD_REQ_FACTORY_RESET: u8 = 13;
/// Start a firmware update, answered with the current firmware version.
pub const CMD_START_UPDATE: u8 = 14;
/// Validate a firmware update, answered with `READY`.
pub const CMD_VALIDATE_UPDATE: u8 = 15;
/// Cancel a pending firmware update.
pub const CMD_CANCEL_UPDATE: u8 = 16;
/// Start the firmware binary transfer, answered with `READY_TRANS`.
pub const CMD_START_TRANS_UPDATE: u8 = 17;
/// Get the device information fields.
pub const CMD_GETINFO: u8 = 18;
/// Request update authorization.
pub const CMD_REQUEST_UPDATE: u8 = 19;
/// Get the LED border state, pattern, brightness and animations.
pub const CMD_GET_INFO_LED_BORDER: u8 = 20;
/// List stored image names.
pub const CMD_GET_IMAGES_NAME: u8 = 21;
/// Remove a stored image.
pub const CMD_REMOVE_IMAGE: u8 = 22;
/// Display a stored image.
pub const CMD_SELECT_LOADED_IMAGE: u8 = 23;
/// Fetch a stored image's packed pixels (raw-mode reply).
pub const CMD_GET_CURRENT_IMAGE: u8 = 24;

/// Highest valid command identifier.
pub const CMD_MAX: u8 = CMD_GET_CURRENT_IMAGE;

// ============================================================================
// Acknowledgement texts (badge → host)
// ============================================================================

/// Handshake token answering the connection ping.
pub const HANDSHAKE_TOKEN: &[u8] = b"PONG";
/// Generic success acknowledgement.
pub const ACK_OK: &str = "OK";
/// Badge ready for the next step.
pub const ACK_READY: &str = "READY";
/// Badge ready to receive the firmware binary.
pub const ACK_READY_TRANS: &str = "READY_TRANS";
/// Firmware update written successfully.
pub const ACK_UPDATE_SUCCESS: &str = "UPDATE_SUCCESS";
/// Image stored and displayed.
pub const ACK_UPDATED: &str = "UPDATED";

// ============================================================================
// Response layouts
// ============================================================================

/// Divider between GETINFO fields.
pub const MESSAGE_LIST_DIVIDER: u8 = 0x06;
/// Number of fields in a GETINFO reply.
pub const GETINFO_FIELD_COUNT: usize = 7;
/// Divider between image names in a ListImages reply.
pub const IMAGE_NAME_DIVIDER: u8 = 0x00;
/// Minimum length of a GetLedInfo reply.
pub const LED_INFO_MIN_SIZE: usize = 40;

// ============================================================================
// LED border
// ============================================================================

/// Serialized size of an LED border pattern.
pub const LED_PATTERN_SIZE: usize = 37;
/// Number of color slots per pattern.
pub const LED_COLOR_SLOTS: usize = 4;
/// Gradient size used until the badge reports otherwise.
pub const DEFAULT_GRADIENT_SIZE: u8 = 5;
/// Alpha mask forced onto every pattern color.
pub const OPAQUE_ALPHA: u32 = 0xFF00_0000;

// ============================================================================
// Settings limits
// ============================================================================

/// Bluetooth name field width in the SetBluetoothSettings payload.
pub const BT_NAME_SIZE: usize = 21;
/// Bluetooth PIN field width in the SetBluetoothSettings payload.
pub const BT_PIN_SIZE: usize = 4;
/// Maximum length of the owner and contact strings.
pub const MAX_OWNER_CONTACT_SIZE: usize = 41;

// ============================================================================
// Firmware update
// ============================================================================

/// Size of the header prefixed to every firmware packet.
pub const UPDATE_PACKET_HEADER_SIZE: usize = 8;
/// Marker for a firmware packet followed by more packets.
pub const UPDATE_PACKET_MARKER_CONTINUE: u32 = 0;
/// Marker for the final firmware packet.
pub const UPDATE_PACKET_MARKER_END: u32 = 0xE0E0_A0A0;
/// Upper bound on the downloaded firmware image.
pub const MAX_FIRMWARE_SIZE: usize = 2 * 1024 * 1024;
