use core::fmt;
use core::str::FromStr;

use image::Rgba;

use crate::error::{QrError, Result};

/// An RGBA color. Alpha 255 is fully opaque.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self::rgba(red, green, blue, 255)
    }

    pub const fn rgba(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self { red, green, blue, alpha }
    }

    /// Parses `#RGB`, `#RRGGBB` or `#RRGGBBAA` (the `#` is optional).
    ///
    /// # Errors
    ///
    /// Returns [`QrError::InvalidColor`] for any other input.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.trim().trim_start_matches('#');
        let invalid = || QrError::InvalidColor(format!("{hex:?} is not a hex color"));
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |i: usize, len: usize| {
            u8::from_str_radix(&digits[i * len..(i + 1) * len], 16).map(|v| if len == 1 { v * 17 } else { v })
        };
        let parsed = match digits.len() {
            3 => (channel(0, 1), channel(1, 1), channel(2, 1), Ok(255)),
            6 => (channel(0, 2), channel(1, 2), channel(2, 2), Ok(255)),
            8 => (channel(0, 2), channel(1, 2), channel(2, 2), channel(3, 2)),
            _ => return Err(invalid()),
        };
        match parsed {
            (Ok(r), Ok(g), Ok(b), Ok(a)) => Ok(Self::rgba(r, g, b, a)),
            _ => Err(invalid()),
        }
    }

    /// `#rrggbb`, alpha not included.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
    }

    /// Alpha as a fraction between 0 and 1.
    pub fn opacity(self) -> f32 {
        f32::from(self.alpha) / 255.0
    }
}

impl From<Color> for Rgba<u8> {
    fn from(c: Color) -> Self {
        Rgba([c.red, c.green, c.blue, c.alpha])
    }
}

impl FromStr for Color {
    type Err = QrError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02x}", self.to_hex(), self.alpha)
    }
}
