//! Output writers: serialize a rendered symbol into bytes plus a MIME type.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::ImageFormat;
use tracing::{debug, warn};

use crate::error::{QrError, Result};
use crate::qrcode::QrSymbol;
use crate::raster::PixelBuffer;

/// The serialized output of a writer.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct QrResult {
    bytes: Vec<u8>,
    mime_type: &'static str,
}

impl QrResult {
    pub fn new(bytes: Vec<u8>, mime_type: &'static str) -> Self {
        Self { bytes, mime_type }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    /// The output as text, for the text based writers.
    pub fn as_text(&self) -> Option<&str> {
        if self.mime_type == WriterKind::Png.mime_type() {
            return None;
        }
        std::str::from_utf8(&self.bytes).ok()
    }

    /// Writes the output to `path`, creating missing parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`QrError::Io`] if the directory or file cannot be written.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        fs::write(path, &self.bytes)?;
        Ok(())
    }
}

/// Available output formats.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum WriterKind {
    /// Lossless PNG of the composited image.
    #[default]
    Png,
    /// One vector rectangle per dark module.
    Svg,
    /// `0`/`1` per module, one line per row.
    Binary,
    /// Unicode half blocks, two module rows per line.
    Console,
}

impl WriterKind {
    pub fn mime_type(self) -> &'static str {
        match self {
            WriterKind::Png => "image/png",
            WriterKind::Svg => "image/svg+xml",
            WriterKind::Binary | WriterKind::Console => "text/plain",
        }
    }

    pub fn supports_logo(self) -> bool {
        self == WriterKind::Png
    }

    pub fn supports_label(self) -> bool {
        self == WriterKind::Png
    }

    /// Whether the output can be read back by the validation decoder.
    pub fn validates(self) -> bool {
        self == WriterKind::Png
    }

    /// Serializes `symbol`, rendered as `buffer`, in this format.
    ///
    /// # Errors
    ///
    /// Returns [`QrError::Image`] if PNG encoding fails.
    pub fn write(self, symbol: &QrSymbol, buffer: &PixelBuffer) -> Result<QrResult> {
        let bytes = match self {
            WriterKind::Png => {
                let mut bytes = Vec::new();
                buffer.image().write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
                bytes
            }
            WriterKind::Svg => to_svg_string(symbol, buffer).into_bytes(),
            WriterKind::Binary => to_binary_string(symbol).into_bytes(),
            WriterKind::Console => to_console_string(symbol).into_bytes(),
        };
        debug!(writer = ?self, len = bytes.len(), "wrote output");
        Ok(QrResult::new(bytes, self.mime_type()))
    }
}

// Returns SVG code for the symbol laid out at the rasterized geometry.
// The string always uses Unix newlines (\n), regardless of the platform.
fn to_svg_string(symbol: &QrSymbol, buffer: &PixelBuffer) -> String {
    let geometry = buffer.geometry();
    let outer = geometry.outer_size();
    let (fg, bg) = (buffer.foreground(), buffer.background());
    let mut result = String::new();
    result += "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
    result += &format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\" width=\"{0}\" height=\"{0}\" viewBox=\"0 0 {0} {0}\" stroke=\"none\">\n",
        outer
    );
    result += &format!(
        "\t<rect width=\"100%\" height=\"100%\" fill=\"{}\" fill-opacity=\"{}\"/>\n",
        bg.to_hex(),
        bg.opacity()
    );
    result += "\t<path d=\"";
    let mut first = true;
    for (y, row) in symbol.matrix().rows().enumerate() {
        let (y0, y1) = (geometry.module_edge(y as u32), geometry.module_edge(y as u32 + 1));
        for (x, &dark) in row.iter().enumerate() {
            if !dark {
                continue;
            }
            let (x0, x1) = (geometry.module_edge(x as u32), geometry.module_edge(x as u32 + 1));
            if !first {
                result += " ";
            }
            first = false;
            result += &format!("M{},{}h{}v{}h-{}z", x0, y0, x1 - x0, y1 - y0, x1 - x0);
        }
    }
    result += &format!("\" fill=\"{}\" fill-opacity=\"{}\"/>\n", fg.to_hex(), fg.opacity());
    result += "</svg>\n";
    result
}

fn to_binary_string(symbol: &QrSymbol) -> String {
    let mut result = String::with_capacity(symbol.size() * (symbol.size() + 1));
    for row in symbol.matrix().rows() {
        result.extend(row.iter().map(|&dark| if dark { '1' } else { '0' }));
        result.push('\n');
    }
    result
}

fn to_console_string(symbol: &QrSymbol) -> String {
    let border: i32 = 2;
    let size = symbol.size() as i32;
    let mut result = String::new();
    for y in (-border..size + border).step_by(2) {
        for x in -border..size + border {
            let c = match (symbol.get_module(x, y), symbol.get_module(x, y + 1)) {
                (true, true) => '█',
                (true, false) => '▀',
                (false, true) => '▄',
                (false, false) => ' ',
            };
            result.push(c);
        }
        result.push('\n');
    }
    result
}

/// Decodes a PNG result and checks that it carries `expected`.
///
/// # Errors
///
/// [`QrError::Unreadable`] if no symbol can be found or decoded, and
/// [`QrError::RoundTripMismatch`] if the decoded payload differs.
pub fn validate_png(result: &QrResult, expected: &[u8]) -> Result<()> {
    let gray = image::load_from_memory_with_format(result.bytes(), ImageFormat::Png)?.to_luma8();
    let (width, height) = gray.dimensions();
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
        gray.get_pixel(x as u32, y as u32)[0]
    });
    let grids = prepared.detect_grids();
    let grid = grids.first().ok_or_else(|| {
        warn!(width, height, "validation found no QR code");
        QrError::Unreadable("no symbol detected".into())
    })?;

    let mut decoded = Vec::new();
    let meta = grid.decode_to(&mut decoded).map_err(|e| {
        warn!(error = ?e, "validation could not decode QR code");
        QrError::Unreadable(format!("{e:?}"))
    })?;
    debug!(version = ?meta.version, ecc_level = ?meta.ecc_level, len = decoded.len(), "decoded output");

    if decoded != expected {
        warn!("validation read back different data");
        return Err(QrError::RoundTripMismatch {
            expected: String::from_utf8_lossy(expected).into_owned(),
            actual: String::from_utf8_lossy(&decoded).into_owned(),
        });
    }
    Ok(())
}
