//! Gradient text with a soft drop shadow.
//!
//! The glyphs are rasterized in white, a horizontal color strip is built by
//! interpolating the color stops across the text width, and each pixel takes
//! its color from the strip and its alpha from glyph coverage scaled by the
//! strip's luminance. A blurred, offset black copy of the glyphs sits
//! underneath so text stays legible on dark, uneven backgrounds.
//!
//! [`render_gradient_text`] never fails: on any error it returns flat text
//! centered in a `canvas_width × 100` layer and marks the result `degraded`.

use super::backend::RenderError;
use super::bitmap_font;
use super::font::FontHandle;
use crate::types::Color;
use image::{Rgba, RgbaImage, imageops};

/// Minimum mask value, so dark stops fade the text instead of erasing it.
const MASK_FLOOR: u32 = 96;
const SHADOW_OFFSET: u32 = 3;
const SHADOW_ALPHA: u32 = 110;
const SHADOW_SIGMA: f32 = 2.5;
/// Transparent border around the text, wide enough for offset plus blur.
const PAD: u32 = SHADOW_OFFSET + 6;

/// Refuse layers larger than this instead of attempting the allocation.
const MAX_LAYER_PIXELS: u64 = 64 * 1024 * 1024;

const FALLBACK_HEIGHT: u32 = 100;
const FALLBACK_MESSAGE: &str = "[Text Rendering Error]";

/// A rendered text layer and where its top-left corner goes on the canvas.
#[derive(Debug, Clone)]
pub struct GradientText {
    pub layer: RgbaImage,
    pub anchor: (i64, i64),
    /// True when the flat fallback was used.
    pub degraded: bool,
}

/// Render `text` with its glyph box starting at `position` (top-left).
///
/// Empty or whitespace-only text yields a 1×1 transparent layer.
pub fn render_gradient_text(
    text: &str,
    position: (i64, i64),
    font: &FontHandle,
    canvas_width: u32,
    stops: &[Color],
) -> GradientText {
    if text.trim().is_empty() {
        return GradientText {
            layer: RgbaImage::new(1, 1),
            anchor: position,
            degraded: false,
        };
    }
    match compose_layer(text, font, stops) {
        Ok(layer) => GradientText {
            layer,
            anchor: (position.0 - PAD as i64, position.1 - PAD as i64),
            degraded: false,
        },
        Err(e) => {
            tracing::warn!(error = %e, font = %font.describe(), "gradient text failed, using flat text");
            let color = stops.last().copied().unwrap_or(Color::WHITE);
            GradientText {
                layer: flat_fallback(text, font, canvas_width, color),
                anchor: (0, position.1 - FALLBACK_HEIGHT as i64 / 2),
                degraded: true,
            }
        }
    }
}

fn compose_layer(text: &str, font: &FontHandle, stops: &[Color]) -> Result<RgbaImage, RenderError> {
    let glyphs = font.rasterize(text, Color::WHITE)?;
    let (w, h) = glyphs.dimensions();
    let strip = color_strip(w, stops)?;

    let (lw, lh) = (w + 2 * PAD, h + 2 * PAD);
    if u64::from(lw) * u64::from(lh) > MAX_LAYER_PIXELS {
        return Err(RenderError::Allocation {
            width: lw,
            height: lh,
        });
    }

    let mut shadow = RgbaImage::new(lw, lh);
    for (x, y, p) in glyphs.enumerate_pixels() {
        let alpha = p[3] as u32 * SHADOW_ALPHA / 255;
        if alpha > 0 {
            shadow.put_pixel(
                x + PAD + SHADOW_OFFSET,
                y + PAD + SHADOW_OFFSET,
                Rgba([0, 0, 0, alpha as u8]),
            );
        }
    }
    let mut layer = imageops::blur(&shadow, SHADOW_SIGMA);

    let mut fill = RgbaImage::new(w, h);
    for (x, y, p) in glyphs.enumerate_pixels() {
        let coverage = p[3] as u32;
        if coverage == 0 {
            continue;
        }
        let color = strip[x as usize];
        let mask = MASK_FLOOR + (255 - MASK_FLOOR) * color.luminance() as u32 / 255;
        fill.put_pixel(x, y, color.rgba((coverage * mask / 255) as u8));
    }
    imageops::overlay(&mut layer, &fill, PAD as i64, PAD as i64);
    Ok(layer)
}

/// One color per pixel column, linearly interpolated across the stops.
pub fn color_strip(width: u32, stops: &[Color]) -> Result<Vec<Color>, RenderError> {
    let (first, rest) = stops.split_first().ok_or(RenderError::NoColorStops)?;
    if rest.is_empty() || width <= 1 {
        return Ok(vec![*first; width as usize]);
    }
    let segments = (stops.len() - 1) as f32;
    Ok((0..width)
        .map(|x| {
            let t = x as f32 / (width - 1) as f32 * segments;
            let i = (t.floor() as usize).min(stops.len() - 2);
            stops[i].lerp(stops[i + 1], t - i as f32)
        })
        .collect())
}

/// Keep only characters that are safe for any font.
fn simplify(text: &str) -> String {
    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || " .,!?-:;".contains(*c))
        .collect();
    let kept = kept.trim();
    if kept.is_empty() {
        FALLBACK_MESSAGE.to_string()
    } else {
        kept.to_string()
    }
}

/// Flat text centered in a `canvas_width × 100` layer.
fn flat_fallback(text: &str, font: &FontHandle, canvas_width: u32, color: Color) -> RgbaImage {
    let width = canvas_width.max(1);
    let mut layer = RgbaImage::new(width, FALLBACK_HEIGHT);
    let text = simplify(text);
    match font.rasterize(&text, color) {
        Ok(glyphs) => {
            let x = (width as i64 - glyphs.width() as i64) / 2;
            let y = (FALLBACK_HEIGHT as i64 - glyphs.height() as i64) / 2;
            imageops::overlay(&mut layer, &glyphs, x, y);
        }
        Err(_) => {
            let scale = 2;
            let x = (width as i64 - bitmap_font::lossy_width(&text, scale) as i64) / 2;
            let y = (FALLBACK_HEIGHT - bitmap_font::GLYPH_HEIGHT * scale) as i64 / 2;
            bitmap_font::draw_lossy(&mut layer, x, y, &text, scale, color.rgba(255));
        }
    }
    layer
}

#[cfg(test)]
mod tests {
    use super::*;

    const STOPS: &[Color] = &[Color([40, 100, 255]), Color([255, 255, 255])];

    #[test]
    fn empty_text_gives_transparent_pixel() {
        let font = FontHandle::builtin(2);
        for text in ["", "   "] {
            let g = render_gradient_text(text, (10, 20), &font, 1080, STOPS);
            assert_eq!(g.layer.dimensions(), (1, 1));
            assert_eq!(g.layer.get_pixel(0, 0)[3], 0);
            assert_eq!(g.anchor, (10, 20));
            assert!(!g.degraded);
        }
    }

    #[test]
    fn layer_is_padded_text_box() {
        let font = FontHandle::builtin(2);
        let extent = font.measure("Hello").unwrap();
        let g = render_gradient_text("Hello", (100, 50), &font, 1080, STOPS);
        assert!(!g.degraded);
        assert_eq!(
            g.layer.dimensions(),
            (extent.width + 2 * PAD, extent.height + 2 * PAD)
        );
        assert_eq!(g.anchor, (100 - PAD as i64, 50 - PAD as i64));
    }

    #[test]
    fn text_color_sweeps_left_to_right() {
        let font = FontHandle::builtin(4);
        let g = render_gradient_text("MMMMMMMM", (0, 0), &font, 1080, STOPS);
        // Leftmost column of 'M' is solid: compare its first and the last column's pixels
        let row = PAD + 4;
        let left = g.layer.get_pixel(PAD, row);
        let right_x = (PAD..g.layer.width() - PAD)
            .rev()
            .find(|x| g.layer.get_pixel(*x, row)[2] > 200 && g.layer.get_pixel(*x, row)[0] > 200)
            .unwrap();
        let right = g.layer.get_pixel(right_x, row);
        assert!(left[0] < right[0], "left {left:?} right {right:?}");
        assert!(right[3] > left[3]);
    }

    #[test]
    fn shadow_present_below_text() {
        let font = FontHandle::builtin(3);
        let g = render_gradient_text("I", (0, 0), &font, 1080, STOPS);
        // Bottom padding row below the glyph only holds shadow pixels
        let shadow_row = g.layer.height() - PAD + SHADOW_OFFSET - 1;
        let has_shadow = (0..g.layer.width()).any(|x| {
            let p = g.layer.get_pixel(x, shadow_row);
            p[3] > 0 && p[0] == 0
        });
        assert!(has_shadow);
    }

    #[test]
    fn failure_falls_back_to_flat_layer() {
        let font = FontHandle::builtin(2);
        let g = render_gradient_text("caf\u{e9}", (0, 300), &font, 640, STOPS);
        assert!(g.degraded);
        assert_eq!(g.layer.dimensions(), (640, FALLBACK_HEIGHT));
        assert_eq!(g.anchor, (0, 250));
        assert!(g.layer.pixels().any(|p| p[3] > 0));
    }

    #[test]
    fn missing_stops_fall_back() {
        let font = FontHandle::builtin(2);
        let g = render_gradient_text("ok", (0, 100), &font, 200, &[]);
        assert!(g.degraded);
    }

    #[test]
    fn color_strip_interpolates() {
        let strip = color_strip(3, &[Color::BLACK, Color::WHITE]).unwrap();
        assert_eq!(strip, [Color::BLACK, Color([128, 128, 128]), Color::WHITE]);

        let strip = color_strip(5, &[Color::BLACK, Color::WHITE, Color::BLACK]).unwrap();
        assert_eq!(strip[0], Color::BLACK);
        assert_eq!(strip[2], Color::WHITE);
        assert_eq!(strip[4], Color::BLACK);

        assert_eq!(color_strip(4, &[Color::WHITE]).unwrap(), vec![Color::WHITE; 4]);
        assert!(color_strip(4, &[]).is_err());
    }

    #[test]
    fn simplify_keeps_safe_characters() {
        assert_eq!(simplify("Hi, caf\u{e9}!"), "Hi, caf!");
        assert_eq!(simplify("\u{263a}\u{263a}"), FALLBACK_MESSAGE);
    }
}
