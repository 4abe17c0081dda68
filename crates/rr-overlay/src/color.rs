//! Color model
//!
//! Scripts describe colors as packed `0xRRGGBBAA` numbers, palette names,
//! `#hex` strings or component tables. Internally a color is four 8-bit
//! channels; [`Color::to_argb`] / [`Color::from_argb`] give the packed
//! ARGB form used when talking to frame buffers.

use bytemuck::{Pod, Zeroable};
use rr_core::OverlayError;
use std::str::FromStr;

/// An RGBA color with straight (non-premultiplied) alpha
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Named palette, matched case-insensitively
const PALETTE: &[(&str, u32)] = &[
    ("white", 0xFFFFFFFF),
    ("black", 0x000000FF),
    ("clear", 0x00000000),
    ("gray", 0x7F7F7FFF),
    ("grey", 0x7F7F7FFF),
    ("red", 0xFF0000FF),
    ("orange", 0xFF7F00FF),
    ("yellow", 0xFFFF00FF),
    ("chartreuse", 0x7FFF00FF),
    ("green", 0x00FF00FF),
    ("teal", 0x00FF7FFF),
    ("cyan", 0x00FFFFFF),
    ("blue", 0x0000FFFF),
    ("purple", 0x7F00FFFF),
    ("magenta", 0xFF00FFFF),
];

impl Color {
    pub const WHITE: Color = Color::new(255, 255, 255, 255);
    pub const BLACK: Color = Color::new(0, 0, 0, 255);
    pub const CLEAR: Color = Color::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Unpack `0xRRGGBBAA`
    pub const fn from_rgba(packed: u32) -> Self {
        Self::new(
            (packed >> 24) as u8,
            (packed >> 16) as u8,
            (packed >> 8) as u8,
            packed as u8,
        )
    }

    /// Pack as `0xRRGGBBAA`
    pub const fn to_rgba(self) -> u32 {
        (self.r as u32) << 24 | (self.g as u32) << 16 | (self.b as u32) << 8 | self.a as u32
    }

    /// Unpack `0xAARRGGBB`
    pub const fn from_argb(packed: u32) -> Self {
        Self::new(
            (packed >> 16) as u8,
            (packed >> 8) as u8,
            packed as u8,
            (packed >> 24) as u8,
        )
    }

    /// Pack as `0xAARRGGBB`
    pub const fn to_argb(self) -> u32 {
        (self.a as u32) << 24 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    /// Same color with full alpha
    pub const fn opaque(self) -> Self {
        Self::new(self.r, self.g, self.b, 255)
    }

    /// Scale alpha by an opacity modifier where 255 is unchanged.
    /// Modifiers above 255 brighten up to full alpha.
    pub fn scaled_alpha(self, modifier: u32) -> Self {
        let a = (self.a as u32 * modifier / 255).min(255);
        Self { a: a as u8, ..self }
    }

    /// Look up a palette name
    pub fn named(name: &str) -> Option<Self> {
        PALETTE
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|&(_, packed)| Self::from_rgba(packed))
    }

    /// A random opaque color
    pub fn random_opaque() -> Self {
        Self::new(rand::random(), rand::random(), rand::random(), 255)
    }

    /// Parse the digits of a `#hex` color.
    ///
    /// Fewer than eight digits are shifted up to the red end; when two or
    /// more digits are missing the alpha channel is forced to 255, so
    /// `fff` becomes `FF F0 00 FF`.
    pub fn from_hex(digits: &str) -> Result<Self, OverlayError> {
        let unknown = || OverlayError::UnknownColor(format!("#{}", digits));

        let hex_len = digits.bytes().take_while(|b| b.is_ascii_hexdigit()).count();
        if hex_len == 0 || digits.len() > 8 {
            return Err(unknown());
        }
        let mut value = u32::from_str_radix(&digits[..hex_len], 16).map_err(|_| unknown())?;

        let missing = 8 - digits.len();
        value <<= missing * 4;
        if missing >= 2 {
            value |= 0xFF;
        }
        Ok(Self::from_rgba(value))
    }
}

impl FromStr for Color {
    type Err = OverlayError;

    /// Parse a palette name, `rand...` or `#hex`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(digits) = s.strip_prefix('#') {
            return Self::from_hex(digits);
        }
        if s.get(..4).is_some_and(|prefix| prefix.eq_ignore_ascii_case("rand")) {
            return Ok(Self::random_opaque());
        }
        Self::named(s).ok_or_else(|| OverlayError::UnknownColor(s.to_string()))
    }
}

/// One channel of a component table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Red,
    Green,
    Blue,
    Alpha,
}

impl Channel {
    /// Channel for an array index (1 = red .. 4 = alpha)
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            1 => Some(Channel::Red),
            2 => Some(Channel::Green),
            3 => Some(Channel::Blue),
            4 => Some(Channel::Alpha),
            _ => None,
        }
    }

    /// Channel for a string key; only the first letter counts, so `"r"`,
    /// `"red"` and `"R"` all name red
    pub fn from_key(key: &str) -> Option<Self> {
        match key.chars().next()?.to_ascii_lowercase() {
            'r' => Some(Channel::Red),
            'g' => Some(Channel::Green),
            'b' => Some(Channel::Blue),
            'a' => Some(Channel::Alpha),
            _ => None,
        }
    }
}

/// Builds a color from table components. Unset color channels are 0,
/// unset alpha is 255.
#[derive(Debug, Clone, Copy)]
pub struct ColorBuilder {
    color: Color,
}

impl ColorBuilder {
    pub fn new() -> Self {
        Self {
            color: Color::new(0, 0, 0, 255),
        }
    }

    /// Set a channel, clamping to 0..=255
    pub fn set(&mut self, channel: Channel, value: i64) -> &mut Self {
        let v = value.clamp(0, 255) as u8;
        match channel {
            Channel::Red => self.color.r = v,
            Channel::Green => self.color.g = v,
            Channel::Blue => self.color.b = v,
            Channel::Alpha => self.color.a = v,
        }
        self
    }

    pub fn build(&self) -> Color {
        self.color
    }
}

impl Default for ColorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack() {
        let c = Color::from_rgba(0x11223344);
        assert_eq!(c, Color::new(0x11, 0x22, 0x33, 0x44));
        assert_eq!(c.to_rgba(), 0x11223344);
        assert_eq!(c.to_argb(), 0x44112233);
        assert_eq!(Color::from_argb(0x44112233), c);
    }

    #[test]
    fn test_named_colors() {
        assert_eq!("white".parse::<Color>().unwrap(), Color::WHITE);
        assert_eq!("Grey".parse::<Color>().unwrap(), Color::from_rgba(0x7F7F7FFF));
        assert_eq!("CLEAR".parse::<Color>().unwrap(), Color::CLEAR);
        assert_eq!(
            "mauve".parse::<Color>(),
            Err(OverlayError::UnknownColor("mauve".to_string()))
        );
    }

    #[test]
    fn test_hex_colors() {
        assert_eq!("#11223344".parse::<Color>().unwrap().to_rgba(), 0x11223344);
        // one digit short keeps the parsed alpha nibble
        assert_eq!("#1122334".parse::<Color>().unwrap().to_rgba(), 0x11223340);
        assert_eq!("#112233".parse::<Color>().unwrap().to_rgba(), 0x112233FF);
        assert_eq!("#fff".parse::<Color>().unwrap().to_rgba(), 0xFFF000FF);
        assert_eq!("#F".parse::<Color>().unwrap().to_rgba(), 0xF00000FF);
        assert!("#".parse::<Color>().is_err());
        assert!("#123456789".parse::<Color>().is_err());
        assert!("#zz".parse::<Color>().is_err());
    }

    #[test]
    fn test_hex_lengths_force_alpha() {
        let digits = "abcdef12";
        for len in 1..=8 {
            let c = Color::from_hex(&digits[..len]).unwrap();
            if len <= 6 {
                assert_eq!(c.a, 255, "len {}", len);
            }
            assert_eq!(c.r >> 4, 0xA);
        }
    }

    #[test]
    fn test_random_is_opaque() {
        for _ in 0..8 {
            assert_eq!("Random".parse::<Color>().unwrap().a, 255);
        }
    }

    #[test]
    fn test_builder_clamps() {
        let c = ColorBuilder::new()
            .set(Channel::Red, 300)
            .set(Channel::Blue, -5)
            .build();
        assert_eq!(c, Color::new(255, 0, 0, 255));

        let c = ColorBuilder::new().set(Channel::Alpha, 10).build();
        assert_eq!(c.a, 10);

        assert_eq!(Channel::from_key("Green"), Some(Channel::Green));
        assert_eq!(Channel::from_key("x"), None);
        assert_eq!(Channel::from_index(4), Some(Channel::Alpha));
    }

    #[test]
    fn test_scaled_alpha() {
        let c = Color::new(1, 2, 3, 200);
        assert_eq!(c.scaled_alpha(255).a, 200);
        assert_eq!(c.scaled_alpha(0).a, 0);
        assert_eq!(c.scaled_alpha(510).a, 255);
        assert_eq!(c.scaled_alpha(127).a, 99);
    }
}
