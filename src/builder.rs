//! Configuration and the pipeline entry point.
//!
//! ```rust
//! use qrcomposer::{Builder, EcLevel, WriterKind};
//!
//! let result = Builder::new()
//!     .data("Hello, World!")
//!     .error_correction_level(EcLevel::Medium)
//!     .writer(WriterKind::Binary)
//!     .build()
//!     .unwrap();
//! assert_eq!(result.mime_type(), "text/plain");
//! ```

use std::sync::Arc;

use image::RgbaImage;
use tracing::debug;

use crate::charset::Charset;
use crate::color::Color;
use crate::compose::{self, LabelAlignment, LabelMargin, LabelSpec, LogoSpec};
use crate::error::Result;
use crate::font::LabelFont;
use crate::qrcode::{EcLevel, QrSymbol, SymbolRequest, Version};
use crate::raster::{self, RasterOptions, RoundBlockSizeMode};
use crate::writer::{self, QrResult, WriterKind};

/// Everything needed to produce one output.
#[derive(Clone, Debug)]
pub struct QrConfig {
    pub request: SymbolRequest,
    pub raster: RasterOptions,
    pub writer: WriterKind,
    pub logo: Option<LogoSpec>,
    pub label: Option<LabelSpec>,
    /// Decode the output again and compare it with the input.
    pub validate_result: bool,
}

impl QrConfig {
    pub fn new(request: SymbolRequest) -> Self {
        Self {
            request,
            raster: RasterOptions::default(),
            writer: WriterKind::default(),
            logo: None,
            label: None,
            validate_result: false,
        }
    }
}

/// Runs the pipeline for `config`: encode, rasterize, composite, write and
/// optionally validate.
///
/// # Errors
///
/// Any stage error, see [`QrError`](crate::QrError).
pub fn generate(config: &QrConfig) -> Result<QrResult> {
    let symbol = QrSymbol::encode(&config.request)?;
    let mut buffer = raster::rasterize(symbol.matrix(), &config.raster)?;

    if let Some(logo) = &config.logo {
        if config.writer.supports_logo() {
            buffer = compose::overlay_logo(buffer, logo)?;
        } else {
            debug!(writer = ?config.writer, "writer does not support logos, skipping");
        }
    }
    if let Some(label) = &config.label {
        if config.writer.supports_label() {
            buffer = compose::overlay_label(buffer, label)?;
        } else {
            debug!(writer = ?config.writer, "writer does not support labels, skipping");
        }
    }

    let result = config.writer.write(&symbol, &buffer)?;
    if config.validate_result {
        if config.writer.validates() {
            writer::validate_png(&result, config.request.data())?;
        } else {
            debug!(writer = ?config.writer, "writer output cannot be validated, skipping");
        }
    }
    Ok(result)
}

#[derive(Clone, Debug)]
enum Payload {
    Text(String),
    Bytes(Vec<u8>),
}

/// Fluent assembler for a [`QrConfig`].
///
/// Setters only record values; parsing and validation happen in
/// [`Builder::build_config`], so the first invalid setting is reported there.
#[derive(Clone, Debug)]
pub struct Builder {
    payload: Payload,
    charset: Charset,
    encoding: Option<String>,
    ec_level: EcLevel,
    version: Option<u32>,
    raster: RasterOptions,
    foreground: Option<String>,
    background: Option<String>,
    writer: WriterKind,
    logo: Option<RgbaImage>,
    logo_width: Option<u32>,
    logo_height: Option<u32>,
    logo_punchout: bool,
    label_text: Option<String>,
    label_font: Option<Arc<dyn LabelFont>>,
    label_alignment: LabelAlignment,
    label_margin: LabelMargin,
    label_text_color: Color,
    label_background_color: Color,
    validate_result: bool,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            payload: Payload::Text(String::new()),
            charset: Charset::default(),
            encoding: None,
            ec_level: EcLevel::default(),
            version: None,
            raster: RasterOptions::default(),
            foreground: None,
            background: None,
            writer: WriterKind::default(),
            logo: None,
            logo_width: None,
            logo_height: None,
            logo_punchout: false,
            label_text: None,
            label_font: None,
            label_alignment: LabelAlignment::default(),
            label_margin: LabelMargin::default(),
            label_text_color: Color::BLACK,
            label_background_color: Color::WHITE,
            validate_result: false,
        }
    }
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text to encode; transcoded into the charset at build time.
    pub fn data(mut self, text: impl Into<String>) -> Self {
        self.payload = Payload::Text(text.into());
        self
    }

    /// Bytes already expressed in the charset.
    pub fn data_bytes(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.payload = Payload::Bytes(bytes.into());
        self
    }

    pub fn charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self.encoding = None;
        self
    }

    /// Charset by name, e.g. `"UTF-8"` or `"ISO-8859-1"`.
    pub fn encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = Some(label.into());
        self
    }

    pub fn error_correction_level(mut self, ecl: EcLevel) -> Self {
        self.ec_level = ecl;
        self
    }

    /// Pins the symbol version (1 to 40).
    pub fn version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    pub fn size(mut self, size: u32) -> Self {
        self.raster.size = size;
        self
    }

    /// Pixels per module; the symbol size then follows from the version.
    pub fn module_size(mut self, pixels: u32) -> Self {
        self.raster.module_size = Some(pixels);
        self
    }

    pub fn margin(mut self, margin: u32) -> Self {
        self.raster.margin = margin;
        self
    }

    pub fn round_block_size_mode(mut self, mode: RoundBlockSizeMode) -> Self {
        self.raster.round_block_size = mode;
        self
    }

    pub fn foreground_color(mut self, color: Color) -> Self {
        self.raster.foreground = color;
        self.foreground = None;
        self
    }

    /// Foreground as a hex string, parsed at build time.
    pub fn foreground_hex(mut self, hex: impl Into<String>) -> Self {
        self.foreground = Some(hex.into());
        self
    }

    pub fn background_color(mut self, color: Color) -> Self {
        self.raster.background = color;
        self.background = None;
        self
    }

    pub fn background_hex(mut self, hex: impl Into<String>) -> Self {
        self.background = Some(hex.into());
        self
    }

    pub fn writer(mut self, writer: WriterKind) -> Self {
        self.writer = writer;
        self
    }

    pub fn logo(mut self, image: RgbaImage) -> Self {
        self.logo = Some(image);
        self
    }

    pub fn logo_resize_to_width(mut self, width: u32) -> Self {
        self.logo_width = Some(width);
        self
    }

    pub fn logo_resize_to_height(mut self, height: u32) -> Self {
        self.logo_height = Some(height);
        self
    }

    pub fn logo_punchout_background(mut self, punchout: bool) -> Self {
        self.logo_punchout = punchout;
        self
    }

    pub fn label_text(mut self, text: impl Into<String>) -> Self {
        self.label_text = Some(text.into());
        self
    }

    pub fn label_font(mut self, font: Arc<dyn LabelFont>) -> Self {
        self.label_font = Some(font);
        self
    }

    pub fn label_alignment(mut self, alignment: LabelAlignment) -> Self {
        self.label_alignment = alignment;
        self
    }

    pub fn label_margin(mut self, margin: LabelMargin) -> Self {
        self.label_margin = margin;
        self
    }

    pub fn label_text_color(mut self, color: Color) -> Self {
        self.label_text_color = color;
        self
    }

    pub fn label_background_color(mut self, color: Color) -> Self {
        self.label_background_color = color;
        self
    }

    pub fn validate_result(mut self, validate: bool) -> Self {
        self.validate_result = validate;
        self
    }

    /// Resolves every setting into a [`QrConfig`].
    ///
    /// # Errors
    ///
    /// [`QrError::InvalidCharset`](crate::QrError::InvalidCharset),
    /// [`QrError::UnsupportedVersion`](crate::QrError::UnsupportedVersion),
    /// [`QrError::InvalidColor`](crate::QrError::InvalidColor) or
    /// [`QrError::InvalidDimension`](crate::QrError::InvalidDimension) for the
    /// first setting that cannot be used. Whether the size can hold the
    /// symbol's modules is only known once the version is chosen, so that
    /// check happens in [`generate`].
    pub fn build_config(self) -> Result<QrConfig> {
        let charset = match &self.encoding {
            Some(label) => label.parse::<Charset>()?,
            None => self.charset,
        };
        let mut request = match self.payload {
            Payload::Text(text) => SymbolRequest::from_text(&text, charset)?,
            Payload::Bytes(bytes) => SymbolRequest::from_bytes(bytes, charset),
        }
        .with_ec_level(self.ec_level);
        if let Some(v) = self.version {
            request = request.with_version(Version::new(v)?);
        }

        let mut raster = self.raster;
        if let Some(hex) = &self.foreground {
            raster.foreground = Color::from_hex(hex)?;
        }
        if let Some(hex) = &self.background {
            raster.background = Color::from_hex(hex)?;
        }
        raster.validate()?;

        let logo = match self.logo {
            Some(image) => {
                let mut spec = LogoSpec::new(image).with_punchout_background(self.logo_punchout);
                if let Some(w) = self.logo_width {
                    spec = spec.with_resize_to_width(w);
                }
                if let Some(h) = self.logo_height {
                    spec = spec.with_resize_to_height(h);
                }
                spec.target_size()?;
                Some(spec)
            }
            None => None,
        };

        let label = self.label_text.map(|text| {
            let mut spec = LabelSpec::new(text)
                .with_alignment(self.label_alignment)
                .with_margin(self.label_margin)
                .with_text_color(self.label_text_color)
                .with_background_color(self.label_background_color);
            if let Some(font) = self.label_font {
                spec = spec.with_font(font);
            }
            spec
        });

        Ok(QrConfig {
            request,
            raster,
            writer: self.writer,
            logo,
            label,
            validate_result: self.validate_result,
        })
    }

    /// Builds the configuration and runs [`generate`] on it.
    ///
    /// # Errors
    ///
    /// Any configuration or pipeline error.
    pub fn build(self) -> Result<QrResult> {
        generate(&self.build_config()?)
    }
}
