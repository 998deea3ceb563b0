//! Packed 4-bit display images.
//!
//! Each byte holds two horizontally adjacent pixels. The encoder writes the
//! left pixel in the high nibble.

use crate::error::ImageError;
use crate::palette::HardwareColor;
use crate::{IMAGE_HEIGHT, IMAGE_WIDTH, PACKED_IMAGE_SIZE};

/// Which nibble of a packed byte holds the left pixel when unpacking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum NibbleOrder {
    /// Left pixel in the high nibble, matching [`crate::encode_bitmap`].
    #[default]
    HighFirst,
    /// Left pixel in the low nibble, as the first companion app previewed
    /// images fetched from the badge.
    LowFirst,
}

/// A full-screen image in the badge's packed format.
#[derive(Clone, PartialEq, Eq)]
pub struct PackedImage {
    data: Vec<u8>,
}

impl std::fmt::Debug for PackedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackedImage")
            .field("len", &self.data.len())
            .finish()
    }
}

impl PackedImage {
    /// Wrap packed bytes received from the badge.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, ImageError> {
        if data.len() != PACKED_IMAGE_SIZE {
            return Err(ImageError::PackedSize {
                expected: PACKED_IMAGE_SIZE,
                actual: data.len(),
            });
        }
        Ok(PackedImage { data })
    }

    /// Pack display-order hardware codes, left pixel in the high nibble.
    pub fn from_codes(codes: &[u8]) -> Result<Self, ImageError> {
        if codes.len() != IMAGE_WIDTH * IMAGE_HEIGHT {
            return Err(ImageError::PackedSize {
                expected: PACKED_IMAGE_SIZE,
                actual: codes.len() / 2,
            });
        }

        let data = codes
            .chunks_exact(2)
            .map(|pair| (pair[0] << 4) | (pair[1] & 0x0F))
            .collect();
        Ok(PackedImage { data })
    }

    /// The packed bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume into the packed bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Unpack to raw nibble values in display order.
    pub fn codes(&self, order: NibbleOrder) -> Vec<u8> {
        let mut codes = Vec::with_capacity(self.data.len() * 2);
        for &byte in &self.data {
            let (high, low) = (byte >> 4, byte & 0x0F);
            match order {
                NibbleOrder::HighFirst => codes.extend_from_slice(&[high, low]),
                NibbleOrder::LowFirst => codes.extend_from_slice(&[low, high]),
            }
        }
        codes
    }

    /// Unpack to hardware colors, failing on the first invalid nibble.
    pub fn colors(&self, order: NibbleOrder) -> Result<Vec<HardwareColor>, ImageError> {
        self.codes(order)
            .into_iter()
            .map(HardwareColor::try_from)
            .collect()
    }

    /// Unpack to ARGB preview pixels in display order.
    ///
    /// Nibbles that are not a hardware code become opaque black.
    pub fn to_argb(&self, order: NibbleOrder) -> Vec<u32> {
        let codes = self.codes(order);
        let invalid = codes.iter().filter(|&&c| HardwareColor::try_from(c).is_err()).count();
        if invalid > 0 {
            log::debug!("{} pixels outside the hardware palette", invalid);
        }
        codes.into_iter().map(HardwareColor::argb_for_code).collect()
    }

    /// Hardware code of the pixel at `(x, y)`, reading the left pixel from
    /// the high nibble.
    pub fn pixel(&self, x: usize, y: usize) -> Option<u8> {
        if x >= IMAGE_WIDTH || y >= IMAGE_HEIGHT {
            return None;
        }
        let byte = self.data[(y * IMAGE_WIDTH + x) / 2];
        Some(if x % 2 == 0 { byte >> 4 } else { byte & 0x0F })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::FALLBACK_ARGB;

    fn image_with_first_byte(byte: u8) -> PackedImage {
        let mut data = vec![0x11; PACKED_IMAGE_SIZE];
        data[0] = byte;
        PackedImage::from_bytes(data).unwrap()
    }

    #[test]
    fn test_from_bytes_size() {
        assert!(PackedImage::from_bytes(vec![0; PACKED_IMAGE_SIZE]).is_ok());
        assert_eq!(
            PackedImage::from_bytes(vec![0; 10]),
            Err(ImageError::PackedSize {
                expected: 134_400,
                actual: 10
            })
        );
    }

    #[test]
    fn test_nibble_order() {
        let image = image_with_first_byte(0x25);

        assert_eq!(&image.codes(NibbleOrder::HighFirst)[..4], &[2, 5, 1, 1]);
        assert_eq!(&image.codes(NibbleOrder::LowFirst)[..4], &[5, 2, 1, 1]);
        assert_eq!(image.pixel(0, 0), Some(2));
        assert_eq!(image.pixel(1, 0), Some(5));
        assert_eq!(image.pixel(600, 0), None);
    }

    #[test]
    fn test_argb_fallback_same_for_both_nibbles() {
        let image = image_with_first_byte(0x7F);

        for order in [NibbleOrder::HighFirst, NibbleOrder::LowFirst] {
            let argb = image.to_argb(order);
            assert_eq!(argb.len(), IMAGE_WIDTH * IMAGE_HEIGHT);
            assert_eq!(&argb[..3], &[FALLBACK_ARGB, FALLBACK_ARGB, 0xFFFF_FFFF]);
        }
        assert_eq!(
            image.colors(NibbleOrder::HighFirst),
            Err(ImageError::InvalidCode(7))
        );
    }

    #[test]
    fn test_from_codes_packs_high_first() {
        let mut codes = vec![1u8; IMAGE_WIDTH * IMAGE_HEIGHT];
        codes[0] = 6;
        codes[1] = 3;
        let image = PackedImage::from_codes(&codes).unwrap();

        assert_eq!(image.as_bytes()[0], 0x63);
        assert_eq!(image.codes(NibbleOrder::HighFirst), codes);
        assert!(PackedImage::from_codes(&codes[1..]).is_err());
    }
}
