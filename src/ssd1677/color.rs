//! Logical pixel color of a 1-bit panel

use embedded_graphics::pixelcolor::BinaryColor;

/// Only white and black, the panel has no grey levels.
///
/// The discriminants follow the drawing API (`0` = white, `1` = black), which
/// is the inverse of what ends up in panel RAM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Color {
    #[default]
    White = 0,
    Black = 1,
}

impl Color {
    /// Byte that paints 8 pixels of this color in panel RAM
    pub fn get_byte_value(self) -> u8 {
        match self {
            Color::White => 0xFF,
            Color::Black => 0x00,
        }
    }

    /// Value of a single RAM bit for this color
    pub fn get_bit_value(self) -> u8 {
        match self {
            Color::White => 1,
            Color::Black => 0,
        }
    }
}

impl From<u8> for Color {
    /// Anything non-zero is black.
    fn from(value: u8) -> Self {
        if value == 0 {
            Color::White
        } else {
            Color::Black
        }
    }
}

/// `On` = black pixels, `Off` = white background.
impl From<BinaryColor> for Color {
    fn from(color: BinaryColor) -> Self {
        match color {
            BinaryColor::On => Color::Black,
            BinaryColor::Off => Color::White,
        }
    }
}

impl From<Color> for BinaryColor {
    fn from(color: Color) -> Self {
        match color {
            Color::Black => BinaryColor::On,
            Color::White => BinaryColor::Off,
        }
    }
}
