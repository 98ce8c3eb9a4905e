//! Drawing primitives shared by the slide composer and the error slide.
//!
//! Slides are composed on an opaque RGBA canvas so text layers can be
//! alpha-blended with `imageops::overlay`, then flattened to RGB.

use super::backend::RenderError;
use super::font::FontHandle;
use crate::types::Color;
use image::{DynamicImage, RgbImage, RgbaImage, imageops};

/// Canvas edge all layout constants are expressed against.
pub const REFERENCE_EDGE: u32 = 1080;

/// Scales reference-canvas pixel values to the actual canvas.
#[derive(Debug, Clone, Copy)]
pub struct Metrics {
    pub width: u32,
    pub height: u32,
    unit: f32,
}

impl Metrics {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            unit: width.min(height) as f32 / REFERENCE_EDGE as f32,
        }
    }

    /// `value` reference pixels on this canvas, at least 1.
    pub fn px(&self, value: u32) -> u32 {
        ((value as f32 * self.unit).round() as u32).max(1)
    }

    /// Signed variant of [`px`](Self::px) for coordinates.
    pub fn offset(&self, value: u32) -> i64 {
        self.px(value) as i64
    }
}

pub fn solid(width: u32, height: u32, color: Color) -> RgbaImage {
    RgbaImage::from_pixel(width, height, color.rgba(255))
}

/// Vertical gradient from `top` to `bottom`.
pub fn vertical_tint(width: u32, height: u32, top: Color, bottom: Color) -> RgbaImage {
    let span = height.saturating_sub(1).max(1) as f32;
    RgbaImage::from_fn(width, height, |_, y| top.lerp(bottom, y as f32 / span).rgba(255))
}

/// Fill a rectangle, clipped to the canvas.
pub fn fill_rect(canvas: &mut RgbaImage, x: i64, y: i64, width: i64, height: i64, color: Color) {
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + width).min(canvas.width() as i64);
    let y1 = (y + height).min(canvas.height() as i64);
    for py in y0..y1 {
        for px in x0..x1 {
            canvas.put_pixel(px as u32, py as u32, color.rgba(255));
        }
    }
}

/// Blend `layer` onto the canvas, horizontally centered, top edge at `y`.
pub fn paste_centered(canvas: &mut RgbaImage, layer: &RgbaImage, y: i64) {
    let x = (canvas.width() as i64 - layer.width() as i64) / 2;
    imageops::overlay(canvas, layer, x, y);
}

/// Draw flat-colored text with its top-left corner at `(x, y)`.
/// Returns the drawn width.
pub fn draw_text(
    canvas: &mut RgbaImage,
    font: &FontHandle,
    text: &str,
    (x, y): (i64, i64),
    color: Color,
) -> Result<u32, RenderError> {
    let glyphs = font.rasterize(text, color)?;
    imageops::overlay(canvas, &glyphs, x, y);
    Ok(glyphs.width())
}

/// Drop the alpha channel of an opaque canvas.
pub fn into_rgb(canvas: RgbaImage) -> RgbImage {
    DynamicImage::ImageRgba8(canvas).to_rgb8()
}

/// Pixel at `(x, y)` as a [`Color`], for tests and sampling.
pub fn color_at(image: &RgbImage, x: u32, y: u32) -> Color {
    Color(image.get_pixel(x, y).0)
}
