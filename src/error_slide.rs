//! Placeholder slide shown in place of a slide that failed to render.
//!
//! Drawn with the built-in bitmap font only, so it cannot hit the font or
//! encoding problems that caused the failure in the first place. Every
//! character outside printable ASCII is replaced before drawing.

use crate::compose::{counter_label, counter_top};
use crate::imaging::bitmap_font::{self, GLYPH_HEIGHT};
use crate::imaging::canvas::{self, Metrics};
use crate::imaging::font::FontHandle;
use crate::imaging::gradient::render_gradient_text;
use crate::types::{Color, StyleOptions};
use image::{RgbImage, RgbaImage};

const BACKGROUND: Color = Color([40, 40, 40]);
const HEADLINE: &str = "Error Creating Slide";
const HEADLINE_STOPS: &[Color] = &[Color([255, 100, 100]), Color([255, 180, 120])];
const SUMMARY_COLOR: Color = Color([240, 240, 240]);
const DETAIL_COLOR: Color = Color([200, 200, 200]);
const HINT: &str = "Please check your text input for special characters";
const HINT_COLOR: Color = Color([180, 180, 255]);
const COUNTER_COLOR: Color = Color([200, 200, 200]);

const MAX_DETAIL_CHARS: usize = 100;
/// Detail lines stay strictly shorter than this many characters.
const DETAIL_LINE_CHARS: usize = 50;

/// Compose the error slide for slide `index` of `total`. Never fails.
pub fn compose_error_slide(
    index: usize,
    total: usize,
    message: &str,
    style: &StyleOptions,
) -> RgbImage {
    let metrics = Metrics::new(style.width, style.height);
    let mut canvas = canvas::solid(style.width, style.height, BACKGROUND);
    let mid = style.height as i64 / 2;

    let headline_scale = metrics.px(5);
    let text_scale = metrics.px(3);
    let small_scale = metrics.px(2);

    let headline = FontHandle::builtin(headline_scale);
    let top = mid - metrics.offset(150) - half_height(headline_scale);
    let text = render_gradient_text(HEADLINE, (0, top), &headline, style.width, HEADLINE_STOPS);
    canvas::paste_centered(&mut canvas, &text.layer, text.anchor.1);

    draw_centered(
        &mut canvas,
        classify(message),
        mid - metrics.offset(70),
        text_scale,
        SUMMARY_COLOR,
    );

    let mut y = mid + metrics.offset(20);
    for line in wrap_detail(&truncate_detail(&force_ascii(message))) {
        draw_centered(&mut canvas, &line, y, small_scale, DETAIL_COLOR);
        y += metrics.offset(30);
    }

    draw_centered(&mut canvas, HINT, mid + metrics.offset(150), text_scale, HINT_COLOR);

    let label = counter_label(index, total);
    let label_height = GLYPH_HEIGHT * small_scale;
    let x = (style.width as i64 - bitmap_font::lossy_width(&label, small_scale) as i64) / 2;
    bitmap_font::draw_lossy(
        &mut canvas,
        x,
        counter_top(&metrics, label_height),
        &label,
        small_scale,
        COUNTER_COLOR.rgba(255),
    );

    let center = style.width as i64 / 2;
    let bar = metrics.offset(4);
    canvas::fill_rect(
        &mut canvas,
        center - metrics.offset(150),
        mid - metrics.offset(180),
        2 * metrics.offset(150),
        bar,
        HEADLINE_STOPS[0],
    );
    canvas::fill_rect(
        &mut canvas,
        center - metrics.offset(100),
        mid + metrics.offset(180),
        2 * metrics.offset(100),
        bar,
        HINT_COLOR,
    );

    canvas::into_rgb(canvas)
}

/// Short, user-facing description of a render failure.
pub fn classify(message: &str) -> &'static str {
    let lower = message.to_lowercase();
    if lower.contains("can't encode character") {
        "Unicode character issue"
    } else if lower.contains("font") {
        "Font loading error"
    } else if lower.contains("memory") {
        "Memory allocation error"
    } else {
        "Error processing text"
    }
}

fn half_height(scale: u32) -> i64 {
    (GLYPH_HEIGHT * scale) as i64 / 2
}

/// Draw `text` horizontally centered with its vertical middle at `y`.
fn draw_centered(canvas: &mut RgbaImage, text: &str, y: i64, scale: u32, color: Color) {
    let x = (canvas.width() as i64 - bitmap_font::lossy_width(text, scale) as i64) / 2;
    bitmap_font::draw_lossy(canvas, x, y - half_height(scale), text, scale, color.rgba(255));
}

fn force_ascii(message: &str) -> String {
    message
        .chars()
        .map(|c| match c {
            ' '..='~' => c,
            c if c.is_whitespace() => ' ',
            _ => '?',
        })
        .collect()
}

fn truncate_detail(detail: &str) -> String {
    if detail.chars().count() <= MAX_DETAIL_CHARS {
        return detail.to_string();
    }
    let kept: String = detail.chars().take(MAX_DETAIL_CHARS - 3).collect();
    format!("{kept}...")
}

/// Wrap on character count; an over-long word gets its own line.
fn wrap_detail(detail: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in detail.split_whitespace() {
        let len = current.len() + usize::from(!current.is_empty()) + word.len();
        if current.is_empty() || len < DETAIL_LINE_CHARS {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
