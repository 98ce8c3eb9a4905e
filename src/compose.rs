//! Slide composition.
//!
//! [`SlideComposer`] is the production [`SlideRenderer`]. It draws a slide in
//! five steps, in order:
//!
//! 1. background: flat, or a top-to-bottom tint
//! 2. title (first slide only), centered near the top in gradient text
//! 3. body text: sanitized, wrapped to the canvas width minus a margin,
//!    rendered line by line and vertically centered as a block. A blank body
//!    gets a placeholder line
//! 4. navigation: segmented progress bar, `index/total` counter, and arrows
//!    towards the previous/next slide
//! 5. logo in the bottom-left corner, when requested
//!
//! Font and gradient failures degrade locally. Failures that leave no sensible
//! slide (body text the font cannot measure, a navigation font that cannot draw
//! ASCII) are returned as errors so the orchestrator substitutes an error slide.
//! A missing or unreadable logo is only a warning.
//!
//! Layout constants are reference pixels on a 1080 px canvas; see
//! [`Metrics`].

use crate::imaging::backend::{ComposedSlide, RenderError, SlideJob, SlideRenderer};
use crate::imaging::canvas::{self, Metrics};
use crate::imaging::font::{FontHandle, FontResolver};
use crate::imaging::gradient::render_gradient_text;
use crate::imaging::wrap::wrap;
use crate::sanitize::Sanitizer;
use crate::types::{Color, StyleOptions};
use image::RgbaImage;
use image::imageops::{self, FilterType};
use std::path::Path;
use std::sync::Arc;

const TITLE_SIZE: (u32, u32) = (60, 48);
const BODY_SIZE: (u32, u32) = (48, 36);
const NAV_SIZE: (u32, u32) = (36, 24);

/// Drawn instead of a body that wraps to nothing.
const EMPTY_BODY_PLACEHOLDER: &str = "[Text rendering error]";

const TITLE_TOP: u32 = 150;
const BODY_MARGIN: u32 = 200;
const ARROW_INSET: u32 = 40;
const COUNTER_BOTTOM: u32 = 60;
const PROGRESS_BOTTOM: u32 = 24;
const PROGRESS_HEIGHT: u32 = 6;
const PROGRESS_MARGIN: u32 = 80;
const PROGRESS_GAP: u32 = 8;
const LOGO_INSET: u32 = 30;
/// Logo width as a fraction of the canvas width.
const LOGO_FRACTION: u32 = 10;

/// Colors and decoration flags distinguishing renderer styles.
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: &'static str,
    pub title_stops: Vec<Color>,
    /// Body gradient end color; `None` draws the body in the flat text color.
    pub body_tint: Option<Color>,
    /// Top color of the background tint; `None` for a flat background.
    pub background_tint: Option<Color>,
    pub progress_active: Color,
    pub progress_inactive: Color,
    pub counter: Color,
}

impl Theme {
    pub fn standard() -> Self {
        Self {
            name: "standard",
            title_stops: vec![Color([160, 160, 160]), Color::WHITE],
            body_tint: None,
            background_tint: None,
            progress_active: Color([220, 220, 220]),
            progress_inactive: Color([70, 70, 70]),
            counter: Color([200, 200, 200]),
        }
    }

    pub fn enhanced() -> Self {
        Self {
            name: "enhanced",
            title_stops: vec![Color([40, 100, 255]), Color::WHITE],
            body_tint: Some(Color([200, 210, 255])),
            background_tint: Some(Color([30, 38, 64])),
            progress_active: Color([40, 100, 255]),
            progress_inactive: Color([60, 60, 72]),
            counter: Color([190, 200, 230]),
        }
    }

    fn body_stops(&self, text_color: Color) -> Vec<Color> {
        match self.body_tint {
            Some(tint) => vec![text_color, text_color.lerp(tint, 0.6)],
            None => vec![text_color, text_color],
        }
    }
}

/// Label of the slide counter, shared with the error slide.
pub fn counter_label(index: usize, total: usize) -> String {
    format!("{index}/{total}")
}

/// Top edge of the slide counter for a label `text_height` pixels tall.
pub fn counter_top(metrics: &Metrics, text_height: u32) -> i64 {
    metrics.height as i64 - metrics.offset(COUNTER_BOTTOM) - text_height as i64
}

pub struct SlideComposer {
    theme: Theme,
    fonts: Arc<FontResolver>,
    sanitizer: Sanitizer,
}

impl SlideComposer {
    pub fn new(theme: Theme, fonts: Arc<FontResolver>, sanitizer: Sanitizer) -> Self {
        Self {
            theme,
            fonts,
            sanitizer,
        }
    }

    fn load(&self, name: &str, (size, fallback): (u32, u32), metrics: &Metrics) -> FontHandle {
        self.fonts
            .load_font(name, metrics.px(size), metrics.px(fallback))
    }

    fn background(&self, style: &StyleOptions) -> RgbaImage {
        match self.theme.background_tint {
            Some(top) => canvas::vertical_tint(
                style.width,
                style.height,
                style.background.lerp(top, 0.8),
                style.background,
            ),
            None => canvas::solid(style.width, style.height, style.background),
        }
    }

    fn draw_title(
        &self,
        canvas: &mut RgbaImage,
        title: &str,
        style: &StyleOptions,
        metrics: &Metrics,
        warnings: &mut Vec<String>,
    ) {
        let title = self.sanitizer.sanitize(title).replace('\n', " ");
        let title = title.trim();
        if title.is_empty() {
            return;
        }
        let font = self.load(&style.title_font, TITLE_SIZE, metrics);
        let max_width = style.width.saturating_sub(metrics.px(BODY_MARGIN)).max(1);
        // An unmeasurable title still goes through the compositor, which falls back to flat text.
        let lines = wrap(title, &font, max_width).unwrap_or_else(|_| vec![title.to_string()]);

        let mut y = metrics.offset(TITLE_TOP);
        for line in &lines {
            let text = render_gradient_text(line, (0, y), &font, style.width, &self.theme.title_stops);
            if text.degraded {
                warnings.push("title drawn without gradient".to_string());
            }
            canvas::paste_centered(canvas, &text.layer, text.anchor.1);
            y += font.line_height() as i64;
        }
    }

    fn draw_body(
        &self,
        canvas: &mut RgbaImage,
        body: &str,
        style: &StyleOptions,
        metrics: &Metrics,
        warnings: &mut Vec<String>,
    ) -> Result<(), RenderError> {
        let body = self.sanitizer.sanitize(body);
        let font = self.load(&style.body_font, BODY_SIZE, metrics);
        let max_width = style.width.saturating_sub(metrics.px(BODY_MARGIN)).max(1);
        let mut lines = wrap(&body, &font, max_width)?;
        if lines.is_empty() {
            lines = wrap(EMPTY_BODY_PLACEHOLDER, &font, max_width)?;
        }

        let stops = self.theme.body_stops(style.text_color);
        let line_height = font.line_height() as i64;
        let block = line_height * lines.len() as i64;
        let mut y = (style.height as i64 - block) / 2;
        for (i, line) in lines.iter().enumerate() {
            let text = render_gradient_text(line, (0, y), &font, style.width, &stops);
            if text.degraded {
                warnings.push(format!("body line {} drawn without gradient", i + 1));
            }
            canvas::paste_centered(canvas, &text.layer, text.anchor.1);
            y += line_height;
        }
        Ok(())
    }

    fn draw_navigation(
        &self,
        canvas: &mut RgbaImage,
        job: &SlideJob<'_>,
        metrics: &Metrics,
    ) -> Result<(), RenderError> {
        self.draw_progress(canvas, job.index, job.total, metrics);

        let font = self.load(&job.style.nav_font, NAV_SIZE, metrics);
        let label = counter_label(job.index, job.total);
        let extent = font.measure(&label)?;
        let x = (metrics.width as i64 - extent.width as i64) / 2;
        canvas::draw_text(
            canvas,
            &font,
            &label,
            (x, counter_top(metrics, extent.height)),
            self.theme.counter,
        )?;

        let color = job.style.text_color;
        if job.index > 1 {
            let arrow = arrow_layer(&font, "\u{2190}", "<", color)?;
            let y = (metrics.height as i64 - arrow.height() as i64) / 2;
            imageops::overlay(canvas, &arrow, metrics.offset(ARROW_INSET), y);
        }
        if job.index < job.total {
            let arrow = arrow_layer(&font, "\u{2192}", ">", color)?;
            let x = metrics.width as i64 - metrics.offset(ARROW_INSET) - arrow.width() as i64;
            let y = (metrics.height as i64 - arrow.height() as i64) / 2;
            imageops::overlay(canvas, &arrow, x, y);
        }
        Ok(())
    }

    fn draw_progress(&self, canvas: &mut RgbaImage, index: usize, total: usize, metrics: &Metrics) {
        let margin = metrics.offset(PROGRESS_MARGIN);
        let gap = metrics.offset(PROGRESS_GAP);
        let height = metrics.offset(PROGRESS_HEIGHT);
        let y = metrics.height as i64 - metrics.offset(PROGRESS_BOTTOM) - height;
        let available = metrics.width as i64 - 2 * margin;
        if available <= 0 || total == 0 {
            return;
        }
        let (active, inactive) = (self.theme.progress_active, self.theme.progress_inactive);
        let n = total as i64;
        let segment = (available - gap * (n - 1)) / n;
        if segment < 2 {
            // Too many slides for distinct segments: draw a filled bar instead
            canvas::fill_rect(canvas, margin, y, available, height, inactive);
            canvas::fill_rect(canvas, margin, y, available * index as i64 / n, height, active);
            return;
        }
        for i in 0..n {
            let color = if i + 1 == index as i64 { active } else { inactive };
            canvas::fill_rect(canvas, margin + i * (segment + gap), y, segment, height, color);
        }
    }

    fn draw_logo(
        &self,
        canvas: &mut RgbaImage,
        job: &SlideJob<'_>,
        metrics: &Metrics,
        warnings: &mut Vec<String>,
    ) {
        let Some(path) = job.logo_ref else {
            tracing::warn!(slide = job.index, "logo requested without a logo reference");
            warnings.push("logo requested without a logo reference".to_string());
            return;
        };
        match load_logo(path, metrics.width / LOGO_FRACTION) {
            Ok(logo) => {
                let inset = metrics.offset(LOGO_INSET);
                let y = metrics.height as i64 - logo.height() as i64 - inset;
                imageops::overlay(canvas, &logo, inset, y);
            }
            Err(e) => {
                tracing::warn!(slide = job.index, error = %e, "skipping logo");
                warnings.push(format!("logo skipped: {e}"));
            }
        }
    }
}

impl SlideRenderer for SlideComposer {
    fn name(&self) -> &str {
        self.theme.name
    }

    fn compose_slide(&self, job: &SlideJob<'_>) -> Result<ComposedSlide, RenderError> {
        let style = job.style;
        let metrics = Metrics::new(style.width, style.height);
        let mut warnings = Vec::new();

        let mut canvas = self.background(style);
        if let Some(title) = job.title {
            self.draw_title(&mut canvas, title, style, &metrics, &mut warnings);
        }
        self.draw_body(&mut canvas, job.body, style, &metrics, &mut warnings)?;
        self.draw_navigation(&mut canvas, job, &metrics)?;
        if job.include_logo {
            self.draw_logo(&mut canvas, job, &metrics, &mut warnings);
        }

        Ok(ComposedSlide {
            image: canvas::into_rgb(canvas),
            warnings,
        })
    }
}

/// Arrow glyph, or its ASCII stand-in when the font cannot draw it.
fn arrow_layer(
    font: &FontHandle,
    glyph: &str,
    ascii: &str,
    color: Color,
) -> Result<RgbaImage, RenderError> {
    font.rasterize(glyph, color)
        .or_else(|_| font.rasterize(ascii, color))
}

/// Load a logo and resize it to `width` pixels wide, keeping its aspect ratio.
fn load_logo(path: &Path, width: u32) -> Result<RgbaImage, RenderError> {
    let logo = image::open(path).map_err(|e| RenderError::Logo {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let logo = logo.to_rgba8();
    let (w, h) = logo.dimensions();
    if w == 0 || h == 0 {
        return Err(RenderError::Logo {
            path: path.to_path_buf(),
            reason: "image is empty".to_string(),
        });
    }
    let width = width.max(1);
    let height = ((h as u64 * width as u64) / w as u64).max(1) as u32;
    Ok(imageops::resize(&logo, width, height, FilterType::Lanczos3))
}
