//! QR code symbol generation.
//!
//! [`QrSymbol::encode`] runs the whole symbol pipeline for a
//! [`SymbolRequest`]: data encoding, Reed-Solomon correction, matrix layout
//! and mask selection.

use tracing::debug;

use crate::charset::Charset;
use crate::ecc;
use crate::error::{QrError, Result};
use crate::mask::{self, Mask};
use crate::matrix::ModuleMatrix;
use crate::segment;

/// A finished QR Code symbol: a square grid of dark and light modules.
///
/// Instances are immutable after creation.
///
/// # Example
///
/// ```rust
/// use qrcomposer::qrcode::{EcLevel, QrSymbol};
///
/// let qr = QrSymbol::encode_text("Hello, World!", EcLevel::Low).unwrap();
/// assert_eq!(qr.version().value(), 1);
/// assert_eq!(qr.size(), 21);
/// ```
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct QrSymbol {
    matrix: ModuleMatrix,
    ec_level: EcLevel,
    mask: Mask,
}

impl QrSymbol {
    /// Encodes a request into a symbol, choosing the smallest fitting
    /// version unless the request fixes one.
    ///
    /// # Errors
    ///
    /// Returns [`QrError::InvalidCharset`] or [`QrError::CapacityExceeded`]
    /// from the data encoder.
    pub fn encode(request: &SymbolRequest) -> Result<Self> {
        let (bitstream, version) =
            segment::encode(&request.data, request.charset, request.ec_level, request.version)?;
        let codewords = ecc::correct(&bitstream, version, request.ec_level);
        let matrix = ModuleMatrix::build(&codewords, version, request.ec_level);
        let (matrix, mask) = mask::select_mask(matrix);
        debug!(version = version.value(), mask = mask.value(), "encoded QR symbol");
        Ok(Self {
            matrix,
            ec_level: request.ec_level,
            mask,
        })
    }

    /// Encodes UTF-8 text at the given level.
    ///
    /// # Errors
    ///
    /// Returns [`QrError::CapacityExceeded`] if the text does not fit.
    pub fn encode_text(text: &str, ecl: EcLevel) -> Result<Self> {
        Self::encode(&SymbolRequest::new(text).with_ec_level(ecl))
    }

    /// Returns this QR Code's version, in the range [1, 40].
    pub fn version(&self) -> Version {
        self.matrix.version()
    }

    /// Returns this QR Code's size, in the range [21, 177].
    pub fn size(&self) -> usize {
        self.matrix.size()
    }

    /// Returns this QR Code's error correction level.
    pub fn error_correction_level(&self) -> EcLevel {
        self.ec_level
    }

    /// Returns the mask chosen by penalty scoring.
    pub fn mask(&self) -> Mask {
        self.mask
    }

    /// The finished module matrix.
    pub fn matrix(&self) -> &ModuleMatrix {
        &self.matrix
    }

    /// Returns the color of the module at the given coordinates.
    ///
    /// Returns `true` for dark modules and `false` for light modules.
    /// Coordinates outside the symbol return `false`, which lets callers
    /// iterate over a quiet zone.
    pub fn get_module(&self, x: i32, y: i32) -> bool {
        let range = 0..self.size() as i32;
        range.contains(&x) && range.contains(&y) && self.matrix.get(x as usize, y as usize)
    }
}

/// Immutable input of the symbol pipeline.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SymbolRequest {
    data: Vec<u8>,
    charset: Charset,
    ec_level: EcLevel,
    version: Option<Version>,
}

impl SymbolRequest {
    /// A UTF-8 request for `text` at level Low with automatic version.
    pub fn new(text: &str) -> Self {
        Self::from_bytes(text.as_bytes().to_vec(), Charset::Utf8)
    }

    /// A request for bytes already expressed in `charset`.
    pub fn from_bytes(data: Vec<u8>, charset: Charset) -> Self {
        Self {
            data,
            charset,
            ec_level: EcLevel::Low,
            version: None,
        }
    }

    /// Transcodes `text` into `charset`.
    ///
    /// # Errors
    ///
    /// Returns [`QrError::InvalidCharset`] if the text is not representable.
    pub fn from_text(text: &str, charset: Charset) -> Result<Self> {
        Ok(Self::from_bytes(charset.encode_text(text)?, charset))
    }

    #[must_use]
    pub fn with_ec_level(mut self, ecl: EcLevel) -> Self {
        self.ec_level = ecl;
        self
    }

    /// Pins the version; a payload that does not fit is an error rather than
    /// an upgrade.
    #[must_use]
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    pub fn ec_level(&self) -> EcLevel {
        self.ec_level
    }

    pub fn version(&self) -> Option<Version> {
        self.version
    }
}

/// Error correction level for a QR code.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub enum EcLevel {
    /// Tolerates ~7% erroneous codewords.
    #[default]
    Low,
    /// Tolerates ~15% erroneous codewords.
    Medium,
    /// Tolerates ~25% erroneous codewords.
    Quartile,
    /// Tolerates ~30% erroneous codewords.
    High,
}

impl EcLevel {
    pub const ALL: [EcLevel; 4] = [EcLevel::Low, EcLevel::Medium, EcLevel::Quartile, EcLevel::High];

    /// Index into the capacity tables (0 to 3).
    pub(crate) fn ordinal(self) -> usize {
        use EcLevel::*;
        match self {
            Low => 0,
            Medium => 1,
            Quartile => 2,
            High => 3,
        }
    }

    /// The 2-bit value written into the format information.
    pub(crate) fn format_bits(self) -> u8 {
        use EcLevel::*;
        match self {
            Low => 1,
            Medium => 0,
            Quartile => 3,
            High => 2,
        }
    }

    pub(crate) fn from_format_bits(bits: u8) -> Self {
        use EcLevel::*;
        [Medium, Low, High, Quartile][usize::from(bits & 3)]
    }
}

/// A QR code version (1–40).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Version(u8);

impl Version {
    /// The minimum version number supported in the QR Code Model 2 standard.
    pub const MIN: Version = Version(1);

    /// The maximum version number supported in the QR Code Model 2 standard.
    pub const MAX: Version = Version(40);

    /// Creates a version object from the given number.
    ///
    /// # Errors
    ///
    /// Returns [`QrError::UnsupportedVersion`] outside the range [1, 40].
    pub fn new(ver: u32) -> Result<Self> {
        match u8::try_from(ver) {
            Ok(v) if (Self::MIN.0..=Self::MAX.0).contains(&v) => Ok(Self(v)),
            _ => Err(QrError::UnsupportedVersion(ver)),
        }
    }

    /// Returns the value, which is in the range [1, 40].
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Side length of the symbol in modules: `4 * version + 17`.
    pub const fn size(self) -> usize {
        self.0 as usize * 4 + 17
    }

    pub(crate) fn next(self) -> Self {
        debug_assert!(self < Self::MAX);
        Self(self.0 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_bounds() {
        assert!(matches!(Version::new(0), Err(QrError::UnsupportedVersion(0))));
        assert!(matches!(Version::new(41), Err(QrError::UnsupportedVersion(41))));
        assert!(matches!(Version::new(300), Err(QrError::UnsupportedVersion(300))));
        assert_eq!(Version::new(40).unwrap(), Version::MAX);
        assert_eq!(Version::new(7).unwrap().size(), 45);
    }

    #[test]
    fn test_format_bits_round_trip() {
        for ecl in EcLevel::ALL {
            assert_eq!(EcLevel::from_format_bits(ecl.format_bits()), ecl);
        }
    }

    #[test]
    fn test_symbol_reads_back_its_format() {
        let qr = QrSymbol::encode_text("https://example.com", EcLevel::Quartile).unwrap();
        assert_eq!(qr.matrix().read_error_correction_level(), EcLevel::Quartile);
        assert_eq!(qr.matrix().read_mask(), qr.mask());
        assert_eq!(qr.size(), qr.version().size());
    }

    #[test]
    fn test_quiet_zone_is_light() {
        let qr = QrSymbol::encode_text("quiet", EcLevel::Low).unwrap();
        assert!(!qr.get_module(-1, 0));
        assert!(!qr.get_module(0, qr.size() as i32));
        // Top-left finder corner
        assert!(qr.get_module(0, 0));
    }

    #[test]
    fn test_higher_level_never_shrinks_version() {
        let text = "The quick brown fox jumps over the lazy dog 0123456789";
        let versions: Vec<u8> = EcLevel::ALL
            .iter()
            .map(|&ecl| QrSymbol::encode_text(text, ecl).unwrap().version().value())
            .collect();
        assert!(versions.windows(2).all(|w| w[0] <= w[1]), "{versions:?}");
    }
}
