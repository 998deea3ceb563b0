//! 8bpp palette bitmap parsing and writing.
//!
//! Only the exact format the badge accepts is understood: an uncompressed
//! 600x448 bitmap with 8 bits per pixel and a 7-entry palette stored right
//! before the pixel array.
//!
//! ```text
//! offset  field
//!      0  "BM"
//!     10  pixel array offset (u32)
//!     18  width (i32)            = 600
//!     22  height (i32)           = 448, bottom-up
//!     28  bits per pixel (u16)   = 8
//!     30  compression (u32)      = 0
//!     46  palette colors (u32)   = 7
//! ```

use crate::error::ImageError;
use crate::packed::{NibbleOrder, PackedImage};
use crate::palette::HardwareColor;
use crate::{IMAGE_HEIGHT, IMAGE_WIDTH, PALETTE_SIZE};

const FILE_HEADER_SIZE: usize = 14;
const INFO_HEADER_SIZE: usize = 40;
const PALETTE_BYTES: usize = PALETTE_SIZE * 4;

/// Header fields of a bitmap that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitmapHeader {
    /// Offset of the pixel array.
    pub pixel_offset: usize,
    /// Offset of the 7-entry palette.
    pub palette_offset: usize,
}

fn read_u16(data: &[u8], at: usize) -> Result<u16, ImageError> {
    data.get(at..at + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or(ImageError::Truncated {
            expected: at + 2,
            actual: data.len(),
        })
}

fn read_u32(data: &[u8], at: usize) -> Result<u32, ImageError> {
    data.get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(ImageError::Truncated {
            expected: at + 4,
            actual: data.len(),
        })
}

/// Check that `data` is a bitmap the badge can display.
pub fn validate_bitmap(data: &[u8]) -> Result<BitmapHeader, ImageError> {
    if data.get(..2) != Some(b"BM".as_slice()) {
        return Err(ImageError::BadSignature);
    }

    let width = read_u32(data, 18)? as i32;
    let height = read_u32(data, 22)? as i32;
    if width != IMAGE_WIDTH as i32 || height != IMAGE_HEIGHT as i32 {
        return Err(ImageError::Dimensions { width, height });
    }

    let bpp = read_u16(data, 28)?;
    if bpp != 8 {
        return Err(ImageError::BitDepth(bpp));
    }

    let compression = read_u32(data, 30)?;
    if compression != 0 {
        return Err(ImageError::Compressed(compression));
    }

    let colors = read_u32(data, 46)?;
    if colors != PALETTE_SIZE as u32 {
        return Err(ImageError::PaletteSize(colors));
    }

    let pixel_offset = read_u32(data, 10)? as usize;
    let end = pixel_offset + IMAGE_WIDTH * IMAGE_HEIGHT;
    if pixel_offset < PALETTE_BYTES || end > data.len() {
        return Err(ImageError::Truncated {
            expected: end.max(PALETTE_BYTES),
            actual: data.len(),
        });
    }

    Ok(BitmapHeader {
        pixel_offset,
        palette_offset: pixel_offset - PALETTE_BYTES,
    })
}

/// Read the bitmap's palette as hardware colors, by palette index.
pub fn read_palette(data: &[u8], header: &BitmapHeader) -> Result<[HardwareColor; PALETTE_SIZE], ImageError> {
    let mut palette = [HardwareColor::Black; PALETTE_SIZE];
    for (index, slot) in palette.iter_mut().enumerate() {
        // The reserved byte takes part in the match, so it must be zero.
        let rgb = read_u32(data, header.palette_offset + index * 4)?;
        *slot = HardwareColor::from_palette_rgb(rgb).ok_or_else(|| {
            log::debug!("palette entry {} has unsupported color 0x{:08X}", index, rgb);
            ImageError::UnknownColor { index, rgb }
        })?;
    }
    Ok(palette)
}

/// Convert a bitmap into the badge's packed 4-bit format.
///
/// Bitmap rows are stored bottom-up; output rows are top-down.
pub fn encode_bitmap(data: &[u8]) -> Result<PackedImage, ImageError> {
    let header = validate_bitmap(data)?;
    let palette = read_palette(data, &header)?;

    let mut codes = Vec::with_capacity(IMAGE_WIDTH * IMAGE_HEIGHT);
    for y in 0..IMAGE_HEIGHT {
        let row_start = header.pixel_offset + (IMAGE_HEIGHT - 1 - y) * IMAGE_WIDTH;
        for (x, &index) in data[row_start..row_start + IMAGE_WIDTH].iter().enumerate() {
            let color = palette
                .get(index as usize)
                .ok_or(ImageError::PixelOutOfPalette { x, y, index })?;
            codes.push(color.code());
        }
    }

    PackedImage::from_codes(&codes)
}

/// Write a packed image back out as a bitmap the badge would accept.
///
/// The palette is written in hardware code order. `order` says which nibble
/// of each packed byte holds the left pixel. Nibbles that are not a hardware
/// code become black.
pub fn write_bitmap(image: &PackedImage, order: NibbleOrder) -> Vec<u8> {
    let pixel_offset = FILE_HEADER_SIZE + INFO_HEADER_SIZE + PALETTE_BYTES;
    let pixel_bytes = IMAGE_WIDTH * IMAGE_HEIGHT;
    let file_size = pixel_offset + pixel_bytes;

    let mut out = Vec::with_capacity(file_size);
    out.extend_from_slice(b"BM");
    out.extend_from_slice(&(file_size as u32).to_le_bytes());
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(&(pixel_offset as u32).to_le_bytes());

    out.extend_from_slice(&(INFO_HEADER_SIZE as u32).to_le_bytes());
    out.extend_from_slice(&(IMAGE_WIDTH as i32).to_le_bytes());
    out.extend_from_slice(&(IMAGE_HEIGHT as i32).to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&8u16.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&(pixel_bytes as u32).to_le_bytes());
    out.extend_from_slice(&2835i32.to_le_bytes());
    out.extend_from_slice(&2835i32.to_le_bytes());
    out.extend_from_slice(&(PALETTE_SIZE as u32).to_le_bytes());
    out.extend_from_slice(&(PALETTE_SIZE as u32).to_le_bytes());

    for color in HardwareColor::ALL {
        out.extend_from_slice(&color.palette_rgb().to_le_bytes());
    }

    let codes = image.codes(order);
    for y in (0..IMAGE_HEIGHT).rev() {
        for &code in &codes[y * IMAGE_WIDTH..(y + 1) * IMAGE_WIDTH] {
            let index = if (code as usize) < PALETTE_SIZE {
                code
            } else {
                HardwareColor::Black.code()
            };
            out.push(index);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_bitmap() -> Vec<u8> {
        let codes = vec![HardwareColor::White.code(); IMAGE_WIDTH * IMAGE_HEIGHT];
        write_bitmap(&PackedImage::from_codes(&codes).unwrap(), NibbleOrder::HighFirst)
    }

    fn patch_u32(data: &mut [u8], at: usize, value: u32) {
        data[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }

    #[test]
    fn test_written_bitmap_validates() {
        let bmp = blank_bitmap();
        let header = validate_bitmap(&bmp).unwrap();

        assert_eq!(header.pixel_offset, 82);
        assert_eq!(header.palette_offset, 54);
        assert_eq!(bmp.len(), 82 + 600 * 448);
    }

    #[test]
    fn test_validation_rejects_each_field() {
        let mut bmp = blank_bitmap();
        bmp[0] = b'X';
        assert_eq!(validate_bitmap(&bmp), Err(ImageError::BadSignature));

        let mut bmp = blank_bitmap();
        patch_u32(&mut bmp, 18, 601);
        assert_eq!(
            validate_bitmap(&bmp),
            Err(ImageError::Dimensions {
                width: 601,
                height: 448
            })
        );

        let mut bmp = blank_bitmap();
        patch_u32(&mut bmp, 22, (-448i32) as u32);
        assert!(matches!(validate_bitmap(&bmp), Err(ImageError::Dimensions { .. })));

        let mut bmp = blank_bitmap();
        bmp[28] = 24;
        assert_eq!(validate_bitmap(&bmp), Err(ImageError::BitDepth(24)));

        let mut bmp = blank_bitmap();
        patch_u32(&mut bmp, 30, 1);
        assert_eq!(validate_bitmap(&bmp), Err(ImageError::Compressed(1)));

        let mut bmp = blank_bitmap();
        patch_u32(&mut bmp, 46, 16);
        assert_eq!(validate_bitmap(&bmp), Err(ImageError::PaletteSize(16)));
    }

    #[test]
    fn test_validation_rejects_truncated() {
        let bmp = blank_bitmap();
        assert!(matches!(
            validate_bitmap(&bmp[..bmp.len() - 1]),
            Err(ImageError::Truncated { .. })
        ));
        assert!(matches!(
            validate_bitmap(&bmp[..20]),
            Err(ImageError::Truncated { .. })
        ));
        assert_eq!(validate_bitmap(b"B"), Err(ImageError::BadSignature));
    }

    #[test]
    fn test_unknown_palette_color() {
        let mut bmp = blank_bitmap();
        patch_u32(&mut bmp, 54 + 3 * 4, 0x123456);
        assert_eq!(
            encode_bitmap(&bmp),
            Err(ImageError::UnknownColor {
                index: 3,
                rgb: 0x123456
            })
        );
    }

    #[test]
    fn test_palette_reserved_byte_must_be_zero() {
        let mut bmp = blank_bitmap();
        let white = HardwareColor::White.palette_rgb() | 0x0100_0000;
        patch_u32(&mut bmp, 54 + 4, white);
        assert_eq!(
            encode_bitmap(&bmp),
            Err(ImageError::UnknownColor {
                index: 1,
                rgb: 0x01FF_FFFF
            })
        );
    }

    #[test]
    fn test_pixel_out_of_palette() {
        let mut bmp = blank_bitmap();
        // Last bitmap row is the top display row.
        let top_left = bmp.len() - IMAGE_WIDTH;
        bmp[top_left + 5] = 7;
        assert_eq!(
            encode_bitmap(&bmp),
            Err(ImageError::PixelOutOfPalette {
                x: 5,
                y: 0,
                index: 7
            })
        );
    }

    #[test]
    fn test_palette_order_is_remapped() {
        let mut bmp = blank_bitmap();
        // Swap palette slots 0 and 1: index 1 now means black.
        patch_u32(&mut bmp, 54, HardwareColor::White.palette_rgb());
        patch_u32(&mut bmp, 58, HardwareColor::Black.palette_rgb());

        let packed = encode_bitmap(&bmp).unwrap();
        assert!(packed.as_bytes().iter().all(|&b| b == 0x00));
    }

    #[test]
    fn test_rows_flipped_and_packed_high_nibble_first() {
        let mut bmp = blank_bitmap();
        let pixels = 82;
        // Bitmap row 447 is display row 0.
        bmp[pixels + 447 * IMAGE_WIDTH] = HardwareColor::Red.code();
        bmp[pixels + 447 * IMAGE_WIDTH + 1] = HardwareColor::Blue.code();
        // Bitmap row 0 is display row 447.
        bmp[pixels + IMAGE_WIDTH - 1] = HardwareColor::Orange.code();

        let packed = encode_bitmap(&bmp).unwrap();
        let bytes = packed.as_bytes();
        assert_eq!(bytes[0], 0x43);
        assert_eq!(bytes[1], 0x11);
        assert_eq!(bytes[bytes.len() - 1], 0x16);
    }

    #[test]
    fn test_write_bitmap_follows_nibble_order() {
        // Every byte holds white in the high nibble and red in the low one.
        let image = PackedImage::from_bytes(vec![0x14; IMAGE_WIDTH * IMAGE_HEIGHT / 2]).unwrap();
        let pixels = 82;

        let high = write_bitmap(&image, NibbleOrder::HighFirst);
        assert_eq!(&high[pixels..pixels + 4], &[1, 4, 1, 4]);

        let low = write_bitmap(&image, NibbleOrder::LowFirst);
        assert_eq!(&low[pixels..pixels + 4], &[4, 1, 4, 1]);
        assert_eq!(&high[..pixels], &low[..pixels]);
        assert_eq!(
            encode_bitmap(&low).unwrap().as_bytes(),
            PackedImage::from_bytes(vec![0x41; IMAGE_WIDTH * IMAGE_HEIGHT / 2])
                .unwrap()
                .as_bytes()
        );
    }
}
