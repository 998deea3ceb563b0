//! The display's fixed seven-color palette.

use crate::error::ImageError;

/// Colors the e-ink panel can show, by hardware code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HardwareColor {
    /// Code 0.
    Black = 0,
    /// Code 1.
    White = 1,
    /// Code 2.
    Green = 2,
    /// Code 3.
    Blue = 3,
    /// Code 4.
    Red = 4,
    /// Code 5.
    Yellow = 5,
    /// Code 6.
    Orange = 6,
}

/// ARGB used for nibbles that are not a hardware code.
pub const FALLBACK_ARGB: u32 = 0xFF00_0000;

impl HardwareColor {
    /// All colors in code order.
    pub const ALL: [HardwareColor; 7] = [
        HardwareColor::Black,
        HardwareColor::White,
        HardwareColor::Green,
        HardwareColor::Blue,
        HardwareColor::Red,
        HardwareColor::Yellow,
        HardwareColor::Orange,
    ];

    /// Hardware code written into the packed nibbles.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Look up the color a source palette entry must have (`0x00RRGGBB`).
    ///
    /// Only exact matches are accepted.
    pub fn from_palette_rgb(rgb: u32) -> Option<Self> {
        let color = match rgb {
            0x000000 => HardwareColor::Black,
            0xFFFFFF => HardwareColor::White,
            0x4B6E54 => HardwareColor::Green,
            0x37436A => HardwareColor::Blue,
            0xA4504B => HardwareColor::Red,
            0xDCCC5F => HardwareColor::Yellow,
            0xC06650 => HardwareColor::Orange,
            _ => return None,
        };
        Some(color)
    }

    /// The `0x00RRGGBB` value matched by [`HardwareColor::from_palette_rgb`].
    pub fn palette_rgb(self) -> u32 {
        match self {
            HardwareColor::Black => 0x000000,
            HardwareColor::White => 0xFFFFFF,
            HardwareColor::Green => 0x4B6E54,
            HardwareColor::Blue => 0x37436A,
            HardwareColor::Red => 0xA4504B,
            HardwareColor::Yellow => 0xDCCC5F,
            HardwareColor::Orange => 0xC06650,
        }
    }

    /// ARGB used to preview this color on screen.
    pub fn display_argb(self) -> u32 {
        match self {
            HardwareColor::Black => 0xFF00_0000,
            HardwareColor::White => 0xFFFF_FFFF,
            HardwareColor::Green => 0xFF54_6E4B,
            HardwareColor::Blue => 0xFF6A_4337,
            HardwareColor::Red => 0xFF4B_50A4,
            HardwareColor::Yellow => 0xFF5F_CCDC,
            HardwareColor::Orange => 0xFF50_66C0,
        }
    }

    /// Preview ARGB for a raw nibble, [`FALLBACK_ARGB`] if it is no color.
    pub fn argb_for_code(code: u8) -> u32 {
        HardwareColor::try_from(code).map_or(FALLBACK_ARGB, HardwareColor::display_argb)
    }
}

impl TryFrom<u8> for HardwareColor {
    type Error = ImageError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        HardwareColor::ALL
            .get(code as usize)
            .copied()
            .ok_or(ImageError::InvalidCode(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_lookup_is_exact() {
        for color in HardwareColor::ALL {
            assert_eq!(HardwareColor::from_palette_rgb(color.palette_rgb()), Some(color));
        }
        assert_eq!(HardwareColor::from_palette_rgb(0x4B6E55), None);
        assert_eq!(HardwareColor::from_palette_rgb(0xFF00_0000), None);
    }

    #[test]
    fn test_codes() {
        for (i, color) in HardwareColor::ALL.iter().enumerate() {
            assert_eq!(color.code() as usize, i);
            assert_eq!(HardwareColor::try_from(i as u8), Ok(*color));
        }
        assert_eq!(HardwareColor::try_from(7), Err(ImageError::InvalidCode(7)));
    }

    #[test]
    fn test_display_fallback() {
        assert_eq!(HardwareColor::argb_for_code(1), 0xFFFF_FFFF);
        assert_eq!(HardwareColor::argb_for_code(4), 0xFF4B_50A4);
        assert_eq!(HardwareColor::argb_for_code(7), FALLBACK_ARGB);
        assert_eq!(HardwareColor::argb_for_code(15), FALLBACK_ARGB);
    }
}
