use core::fmt;
use core::str::FromStr;

use crate::error::{QrError, Result};

/// A named character set the payload bytes are expressed in.
///
/// The charset decides how text is turned into bytes, whether Kanji mode is
/// available, and which ECI designator is written in front of byte-mode data.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum Charset {
    #[default]
    Utf8,
    Iso8859_1,
    UsAscii,
    ShiftJis,
}

impl Charset {
    /// Canonical label, as accepted back by [`Charset::from_str`].
    pub fn label(self) -> &'static str {
        use Charset::*;
        match self {
            Utf8 => "UTF-8",
            Iso8859_1 => "ISO-8859-1",
            UsAscii => "US-ASCII",
            ShiftJis => "Shift_JIS",
        }
    }

    /// ECI assignment number for this charset.
    pub fn eci_assignment(self) -> u32 {
        use Charset::*;
        match self {
            Utf8 => 26,
            Iso8859_1 => 3,
            UsAscii => 27,
            ShiftJis => 20,
        }
    }

    /// ISO-8859-1 is the default interpretation of byte mode, so it never
    /// needs an ECI header.
    pub(crate) fn needs_eci(self) -> bool {
        self != Charset::Iso8859_1
    }

    /// Transcodes `text` into bytes of this charset.
    ///
    /// Shift_JIS only accepts its ASCII-compatible subset here; double-byte
    /// Shift_JIS data must be handed over already encoded.
    ///
    /// # Errors
    ///
    /// Returns [`QrError::InvalidCharset`] if a character cannot be
    /// represented in this charset.
    pub fn encode_text(self, text: &str) -> Result<Vec<u8>> {
        use Charset::*;
        match self {
            Utf8 => Ok(text.as_bytes().to_vec()),
            Iso8859_1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).map_err(|_| self.unencodable(c)))
                .collect(),
            UsAscii | ShiftJis => text
                .chars()
                .map(|c| {
                    if c.is_ascii() {
                        Ok(c as u8)
                    } else {
                        Err(self.unencodable(c))
                    }
                })
                .collect(),
        }
    }

    /// Checks that raw bytes are well-formed for this charset.
    ///
    /// # Errors
    ///
    /// Returns [`QrError::InvalidCharset`] for malformed UTF-8 or non 7-bit
    /// ASCII input.
    pub fn check_bytes(self, data: &[u8]) -> Result<()> {
        match self {
            Charset::Utf8 => core::str::from_utf8(data)
                .map(|_| ())
                .map_err(|e| QrError::InvalidCharset(format!("data is not valid UTF-8: {e}"))),
            Charset::UsAscii => match data.iter().position(|b| !b.is_ascii()) {
                None => Ok(()),
                Some(pos) => Err(QrError::InvalidCharset(format!(
                    "byte 0x{:02X} at offset {pos} is not US-ASCII",
                    data[pos]
                ))),
            },
            Charset::Iso8859_1 | Charset::ShiftJis => Ok(()),
        }
    }

    fn unencodable(self, c: char) -> QrError {
        QrError::InvalidCharset(format!("{c:?} cannot be encoded as {}", self.label()))
    }
}

impl FromStr for Charset {
    type Err = QrError;

    fn from_str(label: &str) -> Result<Self> {
        let normalized = label.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "utf-8" | "utf8" => Ok(Charset::Utf8),
            "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" => Ok(Charset::Iso8859_1),
            "us-ascii" | "ascii" => Ok(Charset::UsAscii),
            "shift-jis" | "sjis" => Ok(Charset::ShiftJis),
            _ => Err(QrError::InvalidCharset(format!("unknown charset label {label:?}"))),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
