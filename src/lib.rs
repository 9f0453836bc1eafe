//! # qrcomposer
//!
//! A Rust library for generating QR codes and composing them into images.
//!
//! `qrcomposer` encodes text or binary data into QR Code Model 2 symbols
//! (versions 1 to 40, four error correction levels), renders them at a chosen
//! pixel size and margin, overlays an optional logo and caption label, and
//! serializes the result as PNG, SVG or plain text. PNG output can be decoded
//! again to check that it still carries the input.
//!
//! ## Features
//!
//! - Encode data in numeric, alphanumeric, byte, Kanji or ECI modes.
//! - Four error correction levels: Low, Medium, Quartile, High.
//! - Four ways of fitting modules to a pixel size, see [`RoundBlockSizeMode`].
//! - Logo and label compositing with alpha blending.
//! - PNG, SVG, `0`/`1` text and console half-block writers.
//! - Safe Rust implementation with no unsafe code.
//!
//! ## Example
//!
//! Generate a PNG with a label and check that it scans:
//!
//! ```rust
//! use qrcomposer::{Builder, EcLevel, WriterKind};
//!
//! let result = Builder::new()
//!     .data("https://example.com")
//!     .error_correction_level(EcLevel::Quartile)
//!     .size(300)
//!     .margin(10)
//!     .label_text("example.com")
//!     .writer(WriterKind::Png)
//!     .validate_result(true)
//!     .build()
//!     .unwrap();
//! assert_eq!(result.mime_type(), "image/png");
//! ```
//!
//! Work with the symbol directly:
//!
//! ```rust
//! use qrcomposer::{EcLevel, QrSymbol};
//!
//! let qr = QrSymbol::encode_text("HELLO WORLD", EcLevel::Medium).unwrap();
//! assert_eq!(qr.size(), 21);
//! for y in 0..qr.size() as i32 {
//!     let row: String = (0..qr.size() as i32)
//!         .map(|x| if qr.get_module(x, y) { '#' } else { ' ' })
//!         .collect();
//!     assert_eq!(row.len(), 21);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`segment`], [`ecc`], [`matrix`], [`mask`]: the symbol pipeline, driven
//!   by [`qrcode`].
//! - [`raster`], [`compose`], [`font`]: pixel rendering and overlays.
//! - [`writer`]: output formats and validation.
//! - [`builder`]: configuration and the one-call entry point.

#![forbid(unsafe_code)]

pub mod builder;
pub mod charset;
pub mod color;
pub mod compose;
pub mod ecc;
pub mod error;
pub mod font;
pub mod mask;
pub mod matrix;
pub mod qrcode;
pub mod raster;
pub mod segment;
pub mod writer;

pub use builder::{generate, Builder, QrConfig};
pub use charset::Charset;
pub use color::Color;
pub use compose::{LabelAlignment, LabelMargin, LabelSpec, LogoSpec};
pub use error::{QrError, Result};
pub use font::{BitmapFont, LabelFont};
pub use mask::Mask;
pub use qrcode::{EcLevel, QrSymbol, SymbolRequest, Version};
pub use raster::{PixelBuffer, RasterOptions, RoundBlockSizeMode};
pub use writer::{QrResult, WriterKind};
