/// Errors raised anywhere in the QR generation pipeline.
///
/// Every stage reports the first violation it finds and the pipeline stops;
/// no partial output is ever returned.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum QrError {
    #[error("invalid charset: {0}")]
    InvalidCharset(String),

    #[error("data length = {needed_bits} bits, max capacity = {capacity_bits} bits at version {version}")]
    CapacityExceeded {
        needed_bits: usize,
        capacity_bits: usize,
        version: u8,
    },

    #[error("unsupported version: {0} (expected 1 to 40)")]
    UnsupportedVersion(u32),

    #[error(
        "built-in validation reader read {actual:?} instead of {expected:?}; \
         adjust your parameters to increase readability or disable validation"
    )]
    RoundTripMismatch { expected: String, actual: String },

    #[error("no readable QR code found in output: {0}")]
    Unreadable(String),

    #[error("invalid color: {0}")]
    InvalidColor(String),

    #[error("invalid dimension: {0}")]
    InvalidDimension(String),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = core::result::Result<T, QrError>;
