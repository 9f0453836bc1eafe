//! Turns a module matrix into an RGBA pixel buffer.

use image::{Rgba, RgbaImage};
use tracing::debug;

use crate::color::Color;
use crate::error::{QrError, Result};
use crate::matrix::ModuleMatrix;
use crate::qrcode::Version;

/// How the requested pixel size is reconciled with the module count.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum RoundBlockSizeMode {
    /// Keep the requested size exactly; module edges fall on
    /// `i * size / count`, so modules may differ by one pixel.
    None,
    /// Round the block size up; the image grows.
    Enlarge,
    /// Round the block size down; the image shrinks.
    Shrink,
    /// Round the block size down and keep the requested outer size, growing
    /// the margin to absorb the remainder.
    #[default]
    Margin,
}

/// Largest width or height, in pixels, of any image the crate produces.
pub const MAX_IMAGE_SIZE: u32 = 16_384;

/// Pixel rectangle.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn contains(&self, x: u32, y: u32) -> bool {
        (self.x..self.x + self.width).contains(&x) && (self.y..self.y + self.height).contains(&y)
    }
}

/// Pixel layout of a symbol: how many modules, how large the symbol area is,
/// and how the margin is split.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Geometry {
    block_count: u32,
    inner_size: u32,
    outer_size: u32,
    margin_left: u32,
    margin_right: u32,
}

impl Geometry {
    /// # Errors
    ///
    /// Returns [`QrError::InvalidDimension`] if `size` is zero, a module
    /// would end up smaller than one pixel, or the image would exceed
    /// [`MAX_IMAGE_SIZE`].
    pub fn new(block_count: u32, size: u32, margin: u32, mode: RoundBlockSizeMode) -> Result<Self> {
        if size == 0 || block_count == 0 {
            return Err(QrError::InvalidDimension("size must be positive".into()));
        }
        if size < block_count {
            return Err(QrError::InvalidDimension(format!(
                "block size too small: {block_count} modules in {size} pixels; \
                 increase the size or lower the error correction level"
            )));
        }
        let too_large = || {
            QrError::InvalidDimension(format!(
                "size {size} with margin {margin} exceeds {MAX_IMAGE_SIZE} pixels"
            ))
        };
        let padding = margin.checked_mul(2).ok_or_else(too_large)?;
        let floor = size / block_count;
        let inner_size = match mode {
            RoundBlockSizeMode::None => size,
            RoundBlockSizeMode::Enlarge => size
                .div_ceil(block_count)
                .checked_mul(block_count)
                .ok_or_else(too_large)?,
            RoundBlockSizeMode::Shrink | RoundBlockSizeMode::Margin => floor * block_count,
        };
        let outer_size = match mode {
            RoundBlockSizeMode::Margin => size.checked_add(padding),
            _ => inner_size.checked_add(padding),
        }
        .filter(|&outer| outer <= MAX_IMAGE_SIZE)
        .ok_or_else(too_large)?;

        let margin_left = (outer_size - inner_size) / 2;
        Ok(Self {
            block_count,
            inner_size,
            outer_size,
            margin_left,
            margin_right: outer_size - inner_size - margin_left,
        })
    }

    /// Modules per side.
    pub fn block_count(&self) -> u32 {
        self.block_count
    }

    /// Pixels per module; fractional only in [`RoundBlockSizeMode::None`].
    pub fn block_size(&self) -> f64 {
        f64::from(self.inner_size) / f64::from(self.block_count)
    }

    pub fn inner_size(&self) -> u32 {
        self.inner_size
    }

    /// Width and height of the whole image.
    pub fn outer_size(&self) -> u32 {
        self.outer_size
    }

    /// Margin on the left and top.
    pub fn margin_left(&self) -> u32 {
        self.margin_left
    }

    /// Margin on the right and bottom.
    pub fn margin_right(&self) -> u32 {
        self.margin_right
    }

    /// Pixel offset of module edge `i` (0 to `block_count`) from the image edge.
    pub fn module_edge(&self, i: u32) -> u32 {
        let offset = u64::from(i) * u64::from(self.inner_size) / u64::from(self.block_count);
        self.margin_left + offset as u32
    }

    /// The symbol area, margin excluded.
    pub fn matrix_area(&self) -> Rect {
        Rect {
            x: self.margin_left,
            y: self.margin_left,
            width: self.inner_size,
            height: self.inner_size,
        }
    }
}

/// Sizing and colors for [`rasterize`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RasterOptions {
    /// Requested symbol size in pixels, margin excluded.
    pub size: u32,
    /// Pixels per module. When set it replaces `size`, which becomes
    /// `module_size * modules per side`.
    pub module_size: Option<u32>,
    pub margin: u32,
    pub round_block_size: RoundBlockSizeMode,
    pub foreground: Color,
    pub background: Color,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            size: 300,
            module_size: None,
            margin: 10,
            round_block_size: RoundBlockSizeMode::Margin,
            foreground: Color::BLACK,
            background: Color::WHITE,
        }
    }
}

impl RasterOptions {
    /// Checks the settings that do not depend on the symbol.
    ///
    /// # Errors
    ///
    /// Returns [`QrError::InvalidDimension`] for a zero size or module size,
    /// or when even a version 1 symbol would exceed [`MAX_IMAGE_SIZE`].
    pub fn validate(&self) -> Result<()> {
        let min_count = Version::MIN.size() as u32;
        let inner = match self.module_size {
            Some(0) => return Err(QrError::InvalidDimension("module size must be positive".into())),
            Some(px) => px.checked_mul(min_count),
            None if self.size == 0 => return Err(QrError::InvalidDimension("size must be positive".into())),
            None => Some(self.size),
        };
        inner
            .zip(self.margin.checked_mul(2))
            .and_then(|(inner, padding)| inner.checked_add(padding))
            .filter(|&outer| outer <= MAX_IMAGE_SIZE)
            .map(|_| ())
            .ok_or_else(|| QrError::InvalidDimension(format!("image would exceed {MAX_IMAGE_SIZE} pixels")))
    }

    fn symbol_size(&self, block_count: u32) -> Result<u32> {
        match self.module_size {
            Some(0) => Err(QrError::InvalidDimension("module size must be positive".into())),
            Some(px) => px.checked_mul(block_count).ok_or_else(|| {
                QrError::InvalidDimension(format!("{block_count} modules of {px} pixels overflow"))
            }),
            None => Ok(self.size),
        }
    }
}

/// An RGBA image of a symbol, plus the layout it was drawn with.
#[derive(Clone, Debug)]
pub struct PixelBuffer {
    image: RgbaImage,
    geometry: Geometry,
    foreground: Color,
    background: Color,
}

impl PixelBuffer {
    pub(crate) fn from_parts(image: RgbaImage, geometry: Geometry, foreground: Color, background: Color) -> Self {
        Self { image, geometry, foreground, background }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub(crate) fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn foreground(&self) -> Color {
        self.foreground
    }

    pub fn background(&self) -> Color {
        self.background
    }
}

/// Draws `matrix` at the geometry derived from `options`.
///
/// With `module_size` set the symbol is exactly `module_size * count`
/// pixels wide, so every rounding mode gives the same layout.
///
/// # Errors
///
/// Returns [`QrError::InvalidDimension`] if the requested size cannot hold
/// one pixel per module or the image would be too large.
pub fn rasterize(matrix: &ModuleMatrix, options: &RasterOptions) -> Result<PixelBuffer> {
    let count = matrix.size() as u32;
    let size = options.symbol_size(count)?;
    let geometry = Geometry::new(count, size, options.margin, options.round_block_size)?;
    debug!(
        outer = geometry.outer_size(),
        inner = geometry.inner_size(),
        margin_left = geometry.margin_left(),
        mode = ?options.round_block_size,
        "rasterizing symbol"
    );

    let fg: Rgba<u8> = options.foreground.into();
    let outer = geometry.outer_size();
    let mut image = RgbaImage::from_pixel(outer, outer, options.background.into());
    for (y, row) in matrix.rows().enumerate() {
        let (y0, y1) = (geometry.module_edge(y as u32), geometry.module_edge(y as u32 + 1));
        for (x, _) in row.iter().enumerate().filter(|&(_, &dark)| dark) {
            let (x0, x1) = (geometry.module_edge(x as u32), geometry.module_edge(x as u32 + 1));
            for py in y0..y1 {
                for px in x0..x1 {
                    image.put_pixel(px, py, fg);
                }
            }
        }
    }
    Ok(PixelBuffer::from_parts(image, geometry, options.foreground, options.background))
}
