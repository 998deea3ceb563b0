//! EConBadge e-ink image codec
//!
//! The badge's 600x448 seven-color panel takes images as packed 4-bit
//! hardware color codes, two pixels per byte, rows top to bottom. Users
//! prepare images as 8bpp bitmaps whose 7-entry palette uses the exact
//! colors in [`HardwareColor`].
//!
//! - [`encode_bitmap`] validates such a bitmap and packs it.
//! - [`PackedImage::to_argb`] unpacks badge data for on-screen preview.
//! - [`write_bitmap`] turns packed data back into an editable bitmap.

mod bitmap;
mod error;
mod packed;
mod palette;

pub use bitmap::*;
pub use error::*;
pub use packed::*;
pub use palette::*;

/// Display width in pixels.
pub const IMAGE_WIDTH: usize = 600;
/// Display height in pixels.
pub const IMAGE_HEIGHT: usize = 448;
/// Number of palette entries a source bitmap must declare.
pub const PALETTE_SIZE: usize = 7;
/// Size of a packed image in bytes.
pub const PACKED_IMAGE_SIZE: usize = IMAGE_WIDTH * IMAGE_HEIGHT / 2;
