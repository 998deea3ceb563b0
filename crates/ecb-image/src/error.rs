//! Image codec error types.

use thiserror::Error;

/// Errors raised while validating or converting badge images.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    /// The file does not start with `BM`.
    #[error("not a bitmap: bad signature")]
    BadSignature,

    /// The file ends before a field or the pixel array.
    #[error("bitmap truncated: need {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes required.
        expected: usize,
        /// Bytes available.
        actual: usize,
    },

    /// Width or height differ from the display's.
    #[error("unsupported dimensions {width}x{height}, expected 600x448")]
    Dimensions {
        /// Declared width.
        width: i32,
        /// Declared height.
        height: i32,
    },

    /// Bits per pixel is not 8.
    #[error("unsupported bit depth {0}, expected 8")]
    BitDepth(u16),

    /// The bitmap is compressed.
    #[error("compressed bitmaps are not supported (method {0})")]
    Compressed(u32),

    /// The palette does not hold exactly 7 colors.
    #[error("palette has {0} colors, expected 7")]
    PaletteSize(u32),

    /// A palette color is not one the display can show.
    #[error("palette entry {index} has color 0x{rgb:06X}, which the display cannot show")]
    UnknownColor {
        /// Palette slot.
        index: usize,
        /// Offending palette word, reserved byte included.
        rgb: u32,
    },

    /// A pixel refers past the end of the palette.
    #[error("pixel ({x}, {y}) uses palette index {index}")]
    PixelOutOfPalette {
        /// Column.
        x: usize,
        /// Display row.
        y: usize,
        /// Palette index found.
        index: u8,
    },

    /// Packed data does not have the display's size.
    #[error("packed image must be {expected} bytes, got {actual}")]
    PackedSize {
        /// Required size.
        expected: usize,
        /// Size supplied.
        actual: usize,
    },

    /// A hardware color code outside 0..=6.
    #[error("invalid hardware color code {0}")]
    InvalidCode(u8),
}
