//! Logo and label overlays on a rasterized symbol.

use std::borrow::Cow;
use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::{Pixel, Rgba, RgbaImage};
use tracing::debug;

use crate::color::Color;
use crate::error::{QrError, Result};
use crate::font::{BitmapFont, LabelFont};
use crate::raster::{PixelBuffer, MAX_IMAGE_SIZE};

/// A decoded logo and how large to draw it.
#[derive(Clone, Debug)]
pub struct LogoSpec {
    image: RgbaImage,
    resize_to_width: Option<u32>,
    resize_to_height: Option<u32>,
    punchout_background: bool,
}

impl LogoSpec {
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image,
            resize_to_width: None,
            resize_to_height: None,
            punchout_background: false,
        }
    }

    /// Target width; the height follows the logo's aspect ratio unless it
    /// is set as well.
    #[must_use]
    pub fn with_resize_to_width(mut self, width: u32) -> Self {
        self.resize_to_width = Some(width);
        self
    }

    #[must_use]
    pub fn with_resize_to_height(mut self, height: u32) -> Self {
        self.resize_to_height = Some(height);
        self
    }

    /// Clears the area under the logo to the background color first, so
    /// transparent logo pixels show no modules.
    #[must_use]
    pub fn with_punchout_background(mut self, punchout: bool) -> Self {
        self.punchout_background = punchout;
        self
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Size the logo will be drawn at.
    ///
    /// # Errors
    ///
    /// Returns [`QrError::InvalidDimension`] for an empty logo, a zero
    /// target dimension, or one above [`MAX_IMAGE_SIZE`].
    pub fn target_size(&self) -> Result<(u32, u32)> {
        let (nw, nh) = self.image.dimensions();
        if nw == 0 || nh == 0 {
            return Err(QrError::InvalidDimension("logo image is empty".into()));
        }
        let scale = |len: u32, num: u32, den: u32| {
            let scaled = u64::from(len) * u64::from(num) / u64::from(den);
            u32::try_from(scaled).unwrap_or(u32::MAX)
        };
        let (w, h) = match (self.resize_to_width, self.resize_to_height) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => (w, scale(nh, w, nw).max(1)),
            (None, Some(h)) => (scale(nw, h, nh).max(1), h),
            (None, None) => (nw, nh),
        };
        if w == 0 || h == 0 || w > MAX_IMAGE_SIZE || h > MAX_IMAGE_SIZE {
            return Err(QrError::InvalidDimension(format!("logo size {w}x{h}")));
        }
        Ok((w, h))
    }
}

/// Scales the logo and alpha-composites it over the center of the symbol
/// area. Pixels outside the logo box are left untouched.
///
/// # Errors
///
/// Returns [`QrError::InvalidDimension`] if the logo has no usable size.
pub fn overlay_logo(mut buffer: PixelBuffer, logo: &LogoSpec) -> Result<PixelBuffer> {
    let (w, h) = logo.target_size()?;
    let scaled: Cow<'_, RgbaImage> = if (w, h) == logo.image.dimensions() {
        Cow::Borrowed(&logo.image)
    } else {
        Cow::Owned(imageops::resize(&logo.image, w, h, FilterType::Lanczos3))
    };

    let area = buffer.geometry().matrix_area();
    let x = i64::from(area.x) + (i64::from(area.width) - i64::from(w)) / 2;
    let y = i64::from(area.y) + (i64::from(area.height) - i64::from(h)) / 2;
    debug!(x, y, width = w, height = h, "placing logo");

    let background: Rgba<u8> = buffer.background().into();
    let image = buffer.image_mut();
    if logo.punchout_background {
        let (iw, ih) = image.dimensions();
        let clip = |start: i64, len: u32, limit: u32| {
            let from = start.clamp(0, i64::from(limit)) as u32;
            let to = (start + i64::from(len)).clamp(0, i64::from(limit)) as u32;
            from..to
        };
        for py in clip(y, h, ih) {
            for px in clip(x, w, iw) {
                image.put_pixel(px, py, background);
            }
        }
    }
    imageops::overlay(image, scaled.as_ref(), x, y);
    Ok(buffer)
}

/// Horizontal placement of label text within its band.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum LabelAlignment {
    Start,
    #[default]
    Center,
    End,
}

/// Space around the label text, in pixels.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct LabelMargin {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl LabelMargin {
    pub const fn new(top: u32, right: u32, bottom: u32, left: u32) -> Self {
        Self { top, right, bottom, left }
    }
}

impl Default for LabelMargin {
    fn default() -> Self {
        Self::new(0, 10, 10, 10)
    }
}

/// A line of text drawn in a band below the symbol.
#[derive(Clone, Debug)]
pub struct LabelSpec {
    text: String,
    font: Arc<dyn LabelFont>,
    text_color: Color,
    background_color: Color,
    alignment: LabelAlignment,
    margin: LabelMargin,
}

impl LabelSpec {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font: Arc::new(BitmapFont::default()),
            text_color: Color::BLACK,
            background_color: Color::WHITE,
            alignment: LabelAlignment::default(),
            margin: LabelMargin::default(),
        }
    }

    #[must_use]
    pub fn with_font(mut self, font: Arc<dyn LabelFont>) -> Self {
        self.font = font;
        self
    }

    #[must_use]
    pub fn with_text_color(mut self, color: Color) -> Self {
        self.text_color = color;
        self
    }

    #[must_use]
    pub fn with_background_color(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    #[must_use]
    pub fn with_alignment(mut self, alignment: LabelAlignment) -> Self {
        self.alignment = alignment;
        self
    }

    #[must_use]
    pub fn with_margin(mut self, margin: LabelMargin) -> Self {
        self.margin = margin;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn font(&self) -> &dyn LabelFont {
        self.font.as_ref()
    }

    pub fn alignment(&self) -> LabelAlignment {
        self.alignment
    }

    pub fn margin(&self) -> LabelMargin {
        self.margin
    }

    /// Height of the band the label adds below the symbol, saturating at
    /// `u32::MAX`.
    pub fn band_height(&self) -> u32 {
        self.font
            .line_height()
            .saturating_add(self.margin.top)
            .saturating_add(self.margin.bottom)
    }
}

/// Extends the canvas downward by the label band, paints the band with the
/// label background and draws the text into it.
///
/// # Errors
///
/// Returns [`QrError::InvalidDimension`] if the font has no line height or
/// the extended image would exceed [`MAX_IMAGE_SIZE`].
pub fn overlay_label(buffer: PixelBuffer, label: &LabelSpec) -> Result<PixelBuffer> {
    let font = label.font();
    if font.line_height() == 0 {
        return Err(QrError::InvalidDimension("label font has zero line height".into()));
    }
    let width = buffer.width();
    let old_height = buffer.height();
    let text_width = i64::from(font.text_width(&label.text));
    let margin = label.margin;

    let height = old_height
        .checked_add(label.band_height())
        .filter(|&h| h <= MAX_IMAGE_SIZE)
        .ok_or_else(|| QrError::InvalidDimension(format!("label band of {} pixels is too tall", label.band_height())))?;
    let mut image = RgbaImage::from_pixel(width, height, label.background_color.into());
    imageops::replace(&mut image, buffer.image(), 0, 0);

    let x = match label.alignment {
        LabelAlignment::Start => i64::from(margin.left),
        LabelAlignment::Center => (i64::from(width) - text_width) / 2,
        LabelAlignment::End => i64::from(width) - text_width - i64::from(margin.right),
    };
    let y = old_height + margin.top;
    debug!(x, y, text_width, "drawing label");
    draw_text(&mut image, font, &label.text, x, y, label.text_color);

    Ok(PixelBuffer::from_parts(
        image,
        *buffer.geometry(),
        buffer.foreground(),
        buffer.background(),
    ))
}

fn draw_text(image: &mut RgbaImage, font: &dyn LabelFont, text: &str, x: i64, y: u32, color: Color) {
    let (width, height) = image.dimensions();
    let mut pen_x = x;
    for ch in text.chars() {
        let advance = font.advance(ch);
        for gy in 0..font.line_height() {
            let py = y + gy;
            if py >= height {
                break;
            }
            for gx in 0..advance {
                let px = pen_x + i64::from(gx);
                if px < 0 || px >= i64::from(width) {
                    continue;
                }
                let coverage = font.coverage(ch, gx, gy);
                if coverage == 0 {
                    continue;
                }
                let alpha = (u32::from(coverage) * u32::from(color.alpha) / 255) as u8;
                image
                    .get_pixel_mut(px as u32, py)
                    .blend(&Rgba([color.red, color.green, color.blue, alpha]));
            }
        }
        pen_x += i64::from(advance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qrcode::{EcLevel, QrSymbol};
    use crate::raster::{rasterize, RasterOptions, Rect, RoundBlockSizeMode};

    fn symbol_300() -> PixelBuffer {
        let qr = QrSymbol::encode_text("Data", EcLevel::High).unwrap();
        let options = RasterOptions {
            size: 300,
            margin: 0,
            round_block_size: RoundBlockSizeMode::None,
            ..RasterOptions::default()
        };
        rasterize(qr.matrix(), &options).unwrap()
    }

    fn red_logo(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([255, 0, 0, 255]))
    }

    #[test]
    fn test_logo_target_size_keeps_aspect() {
        let logo = LogoSpec::new(red_logo(100, 60)).with_resize_to_width(50);
        assert_eq!(logo.target_size().unwrap(), (50, 30));
        let logo = LogoSpec::new(red_logo(100, 60)).with_resize_to_height(30);
        assert_eq!(logo.target_size().unwrap(), (50, 30));
        let logo = LogoSpec::new(red_logo(100, 60)).with_resize_to_width(40).with_resize_to_height(40);
        assert_eq!(logo.target_size().unwrap(), (40, 40));
        assert_eq!(LogoSpec::new(red_logo(7, 9)).target_size().unwrap(), (7, 9));
        assert!(LogoSpec::new(red_logo(10, 10)).with_resize_to_width(0).target_size().is_err());
        assert!(LogoSpec::new(red_logo(1, 10)).with_resize_to_height(u32::MAX).target_size().is_err());
        assert!(LogoSpec::new(red_logo(10, 10)).with_resize_to_width(MAX_IMAGE_SIZE + 1).target_size().is_err());
    }

    #[test]
    fn test_logo_only_touches_its_box() {
        let before = symbol_300();
        assert_eq!(before.width(), 300);
        let logo = LogoSpec::new(red_logo(50, 30));
        let after = overlay_logo(before.clone(), &logo).unwrap();
        let logo_box = Rect { x: 125, y: 135, width: 50, height: 30 };
        for (x, y, px) in after.image().enumerate_pixels() {
            if logo_box.contains(x, y) {
                assert_eq!(px, &Rgba([255, 0, 0, 255]), "({x},{y})");
            } else {
                assert_eq!(px, before.image().get_pixel(x, y), "({x},{y})");
            }
        }
    }

    #[test]
    fn test_transparent_logo_with_punchout() {
        let before = symbol_300();
        let clear = RgbaImage::from_pixel(40, 40, Rgba([0, 0, 0, 0]));
        let plain = overlay_logo(before.clone(), &LogoSpec::new(clear.clone())).unwrap();
        assert_eq!(plain.image(), before.image());

        let punched = overlay_logo(before, &LogoSpec::new(clear).with_punchout_background(true)).unwrap();
        for y in 130..170 {
            for x in 130..170 {
                assert_eq!(punched.image().get_pixel(x, y), &Rgba([255, 255, 255, 255]));
            }
        }
    }

    #[test]
    fn test_label_extends_canvas() {
        let before = symbol_300();
        let label = LabelSpec::new("Label")
            .with_text_color(Color::rgb(255, 0, 0))
            .with_background_color(Color::BLACK);
        let after = overlay_label(before.clone(), &label).unwrap();
        assert_eq!(after.width(), 300);
        assert_eq!(after.height(), 300 + 18 + 10);
        for y in 0..300 {
            for x in (0..300).step_by(7) {
                assert_eq!(after.image().get_pixel(x, y), before.image().get_pixel(x, y));
            }
        }
        // Band background, and red ink somewhere inside the text line
        assert_eq!(after.image().get_pixel(0, 310), &Rgba([0, 0, 0, 255]));
        let red = (300..318)
            .flat_map(|y| (0..300).map(move |x| (x, y)))
            .filter(|&(x, y)| after.image().get_pixel(x, y) == &Rgba([255, 0, 0, 255]))
            .count();
        assert!(red > 0);
    }

    #[test]
    fn test_oversized_label_band_is_rejected() {
        let label = LabelSpec::new("tall").with_margin(LabelMargin::new(u32::MAX, 0, u32::MAX, 0));
        assert_eq!(label.band_height(), u32::MAX);
        assert!(matches!(overlay_label(symbol_300(), &label), Err(QrError::InvalidDimension(_))));
    }

    fn first_ink_column(buffer: &PixelBuffer, color: Rgba<u8>) -> Option<u32> {
        (0..buffer.width()).find(|&x| (300..buffer.height()).any(|y| buffer.image().get_pixel(x, y) == &color))
    }

    #[test]
    fn test_label_alignment() {
        let ink = Rgba([0, 0, 255, 255]);
        let label = |alignment| {
            let spec = LabelSpec::new("II")
                .with_font(Arc::new(BitmapFont::new(1)))
                .with_text_color(Color::rgb(0, 0, 255))
                .with_alignment(alignment);
            overlay_label(symbol_300(), &spec).unwrap()
        };
        // "II" is 12 pixels wide; 'I' has ink from column 1
        assert_eq!(first_ink_column(&label(LabelAlignment::Start), ink), Some(10 + 1));
        assert_eq!(first_ink_column(&label(LabelAlignment::Center), ink), Some(144 + 1));
        assert_eq!(first_ink_column(&label(LabelAlignment::End), ink), Some(300 - 12 - 10 + 1));
    }
}
