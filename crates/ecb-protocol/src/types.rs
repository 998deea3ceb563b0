//! Common types used in the protocol.

use std::fmt;
use std::str::FromStr;

use bytes::{Buf, BufMut};

use crate::constants::*;
use crate::error::ProtocolError;

// ============================================================================
// Colors
// ============================================================================

/// An opaque ARGB color. The alpha byte is always `0xFF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(u32);

impl Color {
    /// Opaque white, the badge's default for every pattern slot.
    pub const WHITE: Color = Color(0xFFFF_FFFF);
    /// Opaque black.
    pub const BLACK: Color = Color(0xFF00_0000);

    /// Create a color from an ARGB value, forcing it opaque.
    pub const fn from_argb(argb: u32) -> Self {
        Color(argb | OPAQUE_ALPHA)
    }

    /// Create a color from its channels.
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Color(OPAQUE_ALPHA | (r as u32) << 16 | (g as u32) << 8 | b as u32)
    }

    /// The ARGB value.
    pub const fn argb(self) -> u32 {
        self.0
    }

    /// The color without its alpha byte (`0x00RRGGBB`).
    pub const fn rgb(self) -> u32 {
        self.0 & 0x00FF_FFFF
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06X}", self.rgb())
    }
}

impl FromStr for Color {
    type Err = ProtocolError;

    /// Parse `RRGGBB`, `#RRGGBB` or `0xRRGGBB`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix('#')
            .or_else(|| s.strip_prefix("0x"))
            .unwrap_or(s);
        if digits.len() != 6 {
            return Err(ProtocolError::InvalidData(format!("bad color: {s:?}")));
        }
        u32::from_str_radix(digits, 16)
            .map(Color::from_argb)
            .map_err(|_| ProtocolError::InvalidData(format!("bad color: {s:?}")))
    }
}

// ============================================================================
// LED border pattern
// ============================================================================

/// Kind of LED border pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PatternKind {
    /// One color for the whole border.
    Plain = 0,
    /// Gradient over one segment.
    Grad1 = 1,
    /// Gradient over two segments.
    Grad2 = 2,
    /// Gradient over three segments.
    Grad3 = 3,
    /// Gradient over four segments.
    Grad4 = 4,
}

impl PatternKind {
    /// All kinds in wire order.
    pub const ALL: [PatternKind; 5] = [
        PatternKind::Plain,
        PatternKind::Grad1,
        PatternKind::Grad2,
        PatternKind::Grad3,
        PatternKind::Grad4,
    ];

    /// Wire value.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether this is one of the gradient kinds.
    pub fn is_gradient(self) -> bool {
        self != PatternKind::Plain
    }
}

impl TryFrom<u8> for PatternKind {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        PatternKind::ALL
            .get(value as usize)
            .copied()
            .ok_or_else(|| ProtocolError::InvalidData(format!("unknown pattern kind {value}")))
    }
}

/// The kind-specific tail of a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternFill {
    /// Plain fill color.
    Plain(Color),
    /// Size of each gradient segment.
    Gradient([u8; LED_COLOR_SLOTS]),
}

/// Color pattern shown on the LED border.
///
/// Serialized as 37 little-endian bytes:
///
/// ```text
/// +------+-------------------+-------------------+---------------------------+
/// | kind | start[4] (u32 LE) | end[4] (u32 LE)   | plain (u32) | sizes[4] u8 |
/// +------+-------------------+-------------------+---------------------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LedBorderPattern {
    kind: PatternKind,
    /// Gradient start colors.
    pub start: [Color; LED_COLOR_SLOTS],
    /// Gradient end colors.
    pub end: [Color; LED_COLOR_SLOTS],
    fill: PatternFill,
}

impl Default for LedBorderPattern {
    fn default() -> Self {
        LedBorderPattern::plain(Color::WHITE)
    }
}

impl LedBorderPattern {
    /// A plain pattern with white gradient slots.
    pub fn plain(color: Color) -> Self {
        LedBorderPattern {
            kind: PatternKind::Plain,
            start: [Color::WHITE; LED_COLOR_SLOTS],
            end: [Color::WHITE; LED_COLOR_SLOTS],
            fill: PatternFill::Plain(color),
        }
    }

    /// A gradient pattern. Returns `None` when `kind` is [`PatternKind::Plain`].
    pub fn gradient(
        kind: PatternKind,
        start: [Color; LED_COLOR_SLOTS],
        end: [Color; LED_COLOR_SLOTS],
        sizes: [u8; LED_COLOR_SLOTS],
    ) -> Option<Self> {
        kind.is_gradient().then_some(LedBorderPattern {
            kind,
            start,
            end,
            fill: PatternFill::Gradient(sizes),
        })
    }

    /// Pattern kind.
    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    /// Kind-specific fill.
    pub fn fill(&self) -> PatternFill {
        self.fill
    }

    /// Plain fill color, for plain patterns.
    pub fn plain_color(&self) -> Option<Color> {
        match self.fill {
            PatternFill::Plain(color) => Some(color),
            PatternFill::Gradient(_) => None,
        }
    }

    /// Gradient segment sizes, for gradient patterns.
    pub fn gradient_sizes(&self) -> Option<[u8; LED_COLOR_SLOTS]> {
        match self.fill {
            PatternFill::Gradient(sizes) => Some(sizes),
            PatternFill::Plain(_) => None,
        }
    }

    /// Change the pattern kind.
    ///
    /// Switching between plain and gradient resets the fill to the badge
    /// defaults (white, or segments of [`DEFAULT_GRADIENT_SIZE`]). The
    /// previous plain color or segment sizes are dropped, not remembered, so
    /// switching back does not restore them. Switching between two gradient
    /// kinds keeps the sizes. The `start` and `end` colors are never touched.
    pub fn set_kind(&mut self, kind: PatternKind) {
        match (kind.is_gradient(), self.fill) {
            (false, PatternFill::Gradient(_)) => self.fill = PatternFill::Plain(Color::WHITE),
            (true, PatternFill::Plain(_)) => {
                self.fill = PatternFill::Gradient([DEFAULT_GRADIENT_SIZE; LED_COLOR_SLOTS])
            }
            _ => {}
        }
        self.kind = kind;
    }

    /// Make the pattern plain with `color`.
    pub fn set_plain_color(&mut self, color: Color) {
        self.kind = PatternKind::Plain;
        self.fill = PatternFill::Plain(color);
    }

    /// Set one gradient segment size. Ignored for plain patterns.
    pub fn set_gradient_size(&mut self, slot: usize, size: u8) {
        if let PatternFill::Gradient(sizes) = &mut self.fill {
            if let Some(s) = sizes.get_mut(slot) {
                *s = size;
            }
        }
    }

    /// Serialize to the 37-byte wire layout.
    pub fn encode(&self) -> [u8; LED_PATTERN_SIZE] {
        let mut buf = Vec::with_capacity(LED_PATTERN_SIZE);
        buf.put_u8(self.kind.code());
        for color in &self.start {
            buf.put_u32_le(color.argb());
        }
        for color in &self.end {
            buf.put_u32_le(color.argb());
        }
        match self.fill {
            PatternFill::Plain(color) => buf.put_u32_le(color.argb()),
            PatternFill::Gradient(sizes) => buf.put_slice(&sizes),
        }

        let mut out = [0u8; LED_PATTERN_SIZE];
        out.copy_from_slice(&buf);
        out
    }

    /// Deserialize from the wire layout. Extra trailing bytes are ignored.
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < LED_PATTERN_SIZE {
            return Err(ProtocolError::FrameTooShort {
                expected: LED_PATTERN_SIZE,
                actual: data.len(),
            });
        }

        let mut buf = &data[..LED_PATTERN_SIZE];
        let kind = PatternKind::try_from(buf.get_u8())?;
        let mut start = [Color::WHITE; LED_COLOR_SLOTS];
        for slot in &mut start {
            *slot = Color::from_argb(buf.get_u32_le());
        }
        let mut end = [Color::WHITE; LED_COLOR_SLOTS];
        for slot in &mut end {
            *slot = Color::from_argb(buf.get_u32_le());
        }
        let fill = if kind.is_gradient() {
            let mut sizes = [0u8; LED_COLOR_SLOTS];
            buf.copy_to_slice(&mut sizes);
            PatternFill::Gradient(sizes)
        } else {
            PatternFill::Plain(Color::from_argb(buf.get_u32_le()))
        };

        Ok(LedBorderPattern {
            kind,
            start,
            end,
            fill,
        })
    }
}

// ============================================================================
// Brightness
// ============================================================================

/// Convert a brightness percentage to the badge's 0..=255 scale.
pub fn brightness_to_wire(percent: u8) -> u8 {
    (percent.min(100) as u32 * 255 / 100) as u8
}

/// Convert the badge's 0..=255 brightness to a percentage.
pub fn brightness_from_wire(value: u8) -> u8 {
    (value as u32 * 100 / 255) as u8
}

// ============================================================================
// Animations
// ============================================================================

/// One LED border animation as reported by the badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnimationModel {
    /// Position in the badge's animation table.
    pub index: u8,
    /// Animation type identifier.
    pub anim_type: u8,
    /// Type-specific parameter (speed).
    pub param: u8,
}

/// Animations kept in descending index order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnimationList {
    items: Vec<AnimationModel>,
}

impl AnimationList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an animation, replacing any entry with the same index.
    pub fn insert(&mut self, animation: AnimationModel) {
        match self
            .items
            .binary_search_by(|probe| animation.index.cmp(&probe.index))
        {
            Ok(pos) => self.items[pos] = animation,
            Err(pos) => self.items.insert(pos, animation),
        }
    }

    /// Remove the animation at `index`.
    pub fn remove(&mut self, index: u8) -> Option<AnimationModel> {
        let pos = self.items.iter().position(|a| a.index == index)?;
        Some(self.items.remove(pos))
    }

    /// Look up the animation at `index`.
    pub fn get(&self, index: u8) -> Option<&AnimationModel> {
        self.items.iter().find(|a| a.index == index)
    }

    /// Remove every animation.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Number of animations.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate from highest to lowest index.
    pub fn iter(&self) -> impl Iterator<Item = &AnimationModel> {
        self.items.iter()
    }
}

impl FromIterator<AnimationModel> for AnimationList {
    fn from_iter<I: IntoIterator<Item = AnimationModel>>(iter: I) -> Self {
        let mut list = AnimationList::new();
        for animation in iter {
            list.insert(animation);
        }
        list
    }
}

// ============================================================================
// Device information
// ============================================================================

/// Fields reported by the GETINFO command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Owner text.
    pub owner: String,
    /// Contact text.
    pub contact: String,
    /// Firmware version, e.g. `v1.2.0`.
    pub sw_version: String,
    /// Hardware revision.
    pub hw_version: String,
    /// Whether the LED border is on.
    pub led_enabled: bool,
    /// Name of the image being displayed.
    pub current_image: String,
    /// Bluetooth PIN.
    pub bt_pin: String,
}

/// LED border state reported by the GetLedInfo command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedBorderInfo {
    /// Whether the border is on.
    pub enabled: bool,
    /// Current color pattern.
    pub pattern: LedBorderPattern,
    /// Brightness in percent.
    pub brightness: u8,
    /// Active animations, `None` when the reply was too short to hold them.
    pub animations: Option<AnimationList>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_forced_opaque() {
        assert_eq!(Color::from_argb(0x0012_3456).argb(), 0xFF12_3456);
        assert_eq!(Color::from_rgb(0x12, 0x34, 0x56), Color::from_argb(0x123456));
        assert_eq!(Color::from_argb(0x00AB_CDEF).to_string(), "#ABCDEF");
    }

    #[test]
    fn test_color_parse() {
        assert_eq!("#FF0000".parse::<Color>().unwrap(), Color::from_rgb(255, 0, 0));
        assert_eq!("0x00ff00".parse::<Color>().unwrap(), Color::from_rgb(0, 255, 0));
        assert_eq!("0000FF".parse::<Color>().unwrap(), Color::from_rgb(0, 0, 255));
        assert!("#FFF".parse::<Color>().is_err());
        assert!("#GGGGGG".parse::<Color>().is_err());
    }

    #[test]
    fn test_pattern_default_layout() {
        let bytes = LedBorderPattern::default().encode();
        assert_eq!(bytes[0], 0);
        assert!(bytes[1..].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_pattern_gradient_layout() {
        let pattern = LedBorderPattern::gradient(
            PatternKind::Grad2,
            [Color::from_rgb(1, 2, 3); 4],
            [Color::BLACK; 4],
            [1, 2, 3, 4],
        )
        .unwrap();
        let bytes = pattern.encode();

        assert_eq!(bytes[0], 2);
        assert_eq!(&bytes[1..5], &[3, 2, 1, 0xFF]);
        assert_eq!(&bytes[17..21], &[0, 0, 0, 0xFF]);
        assert_eq!(&bytes[33..], &[1, 2, 3, 4]);
        assert_eq!(LedBorderPattern::decode(&bytes).unwrap(), pattern);
    }

    #[test]
    fn test_pattern_gradient_rejects_plain_kind() {
        assert!(LedBorderPattern::gradient(PatternKind::Plain, [Color::WHITE; 4], [Color::WHITE; 4], [5; 4]).is_none());
    }

    #[test]
    fn test_pattern_decode_forces_opaque() {
        let mut bytes = [0u8; LED_PATTERN_SIZE];
        bytes[33..].copy_from_slice(&0x0011_2233u32.to_le_bytes());
        let pattern = LedBorderPattern::decode(&bytes).unwrap();

        assert_eq!(pattern.plain_color(), Some(Color::from_argb(0xFF11_2233)));
        assert!(pattern.start.iter().all(|c| *c == Color::BLACK));
    }

    #[test]
    fn test_pattern_decode_errors() {
        assert!(matches!(
            LedBorderPattern::decode(&[0u8; 10]),
            Err(ProtocolError::FrameTooShort { expected: 37, actual: 10 })
        ));
        let mut bytes = [0u8; LED_PATTERN_SIZE];
        bytes[0] = 9;
        assert!(LedBorderPattern::decode(&bytes).is_err());
    }

    #[test]
    fn test_pattern_set_kind() {
        let mut pattern = LedBorderPattern::plain(Color::BLACK);
        pattern.set_kind(PatternKind::Grad3);
        assert_eq!(pattern.gradient_sizes(), Some([DEFAULT_GRADIENT_SIZE; 4]));

        pattern.set_gradient_size(1, 9);
        pattern.set_gradient_size(7, 9);
        pattern.set_kind(PatternKind::Grad1);
        assert_eq!(pattern.gradient_sizes(), Some([5, 9, 5, 5]));

        pattern.set_kind(PatternKind::Plain);
        assert_eq!(pattern.plain_color(), Some(Color::WHITE));
    }

    #[test]
    fn test_pattern_set_kind_forgets_previous_fill() {
        let red = Color::from_argb(0xFFFF_0000);
        let mut pattern = LedBorderPattern::plain(red);
        pattern.start[0] = red;

        pattern.set_kind(PatternKind::Grad2);
        pattern.set_kind(PatternKind::Plain);
        assert_eq!(pattern.plain_color(), Some(Color::WHITE));
        assert_eq!(pattern.start[0], red);

        pattern.set_kind(PatternKind::Grad2);
        pattern.set_gradient_size(0, 12);
        pattern.set_kind(PatternKind::Plain);
        pattern.set_kind(PatternKind::Grad2);
        assert_eq!(pattern.gradient_sizes(), Some([DEFAULT_GRADIENT_SIZE; 4]));
    }

    #[test]
    fn test_brightness_conversion() {
        assert_eq!(brightness_to_wire(0), 0);
        assert_eq!(brightness_to_wire(50), 127);
        assert_eq!(brightness_to_wire(100), 255);
        assert_eq!(brightness_to_wire(250), 255);
        assert_eq!(brightness_from_wire(255), 100);
        assert_eq!(brightness_from_wire(127), 49);
    }

    #[test]
    fn test_animation_list_ordering() {
        let mut list = AnimationList::new();
        for index in [1, 4, 2] {
            list.insert(AnimationModel {
                index,
                anim_type: 0,
                param: index,
            });
        }
        list.insert(AnimationModel {
            index: 2,
            anim_type: 1,
            param: 99,
        });

        let indices: Vec<u8> = list.iter().map(|a| a.index).collect();
        assert_eq!(indices, vec![4, 2, 1]);
        assert_eq!(list.get(2).map(|a| a.param), Some(99));

        assert_eq!(list.remove(4).map(|a| a.index), Some(4));
        assert!(list.remove(4).is_none());
        assert_eq!(list.len(), 2);

        list.clear();
        assert!(list.is_empty());
    }
}
