//! Shared request, slide, and response types.
//!
//! The request types mirror the JSON documents accepted by `carousel-gen
//! render`; the response type is what `render --json` prints.

use image::{RgbImage, Rgba};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// An RGB triple, serialized as `[r, g, b]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub [u8; 3]);

impl Color {
    pub const WHITE: Color = Color([255, 255, 255]);
    pub const BLACK: Color = Color([0, 0, 0]);

    pub fn rgba(self, alpha: u8) -> Rgba<u8> {
        let [r, g, b] = self.0;
        Rgba([r, g, b, alpha])
    }

    /// `#rrggbb`, as understood by SVG `fill`.
    pub fn to_hex(self) -> String {
        let [r, g, b] = self.0;
        format!("#{r:02x}{g:02x}{b:02x}")
    }

    /// Perceived brightness, 0-255.
    pub fn luminance(self) -> u8 {
        let [r, g, b] = self.0.map(u32::from);
        ((r * 299 + g * 587 + b * 114) / 1000) as u8
    }

    /// Linear interpolation towards `other`, `t` in `0.0..=1.0`.
    pub fn lerp(self, other: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mut out = [0u8; 3];
        for (i, c) in out.iter_mut().enumerate() {
            let a = self.0[i] as f32;
            let b = other.0[i] as f32;
            *c = (a + (b - a) * t).round() as u8;
        }
        Color(out)
    }
}

/// A carousel to render: a title for the first slide plus ordered slide texts.
///
/// Requests reach the pipeline already validated and with every style field
/// filled in.
#[derive(Debug, Clone)]
pub struct CarouselRequest {
    pub title: String,
    pub slides: Vec<SlideInput>,
    pub include_logo: bool,
    pub logo_ref: Option<PathBuf>,
    pub style: StyleOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlideInput {
    pub text: String,
}

impl From<&str> for SlideInput {
    fn from(text: &str) -> Self {
        Self {
            text: text.to_string(),
        }
    }
}

/// Canvas and typography for one carousel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleOptions {
    pub width: u32,
    pub height: u32,
    pub background: Color,
    pub text_color: Color,
    pub title_font: String,
    pub body_font: String,
    pub nav_font: String,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1080,
            background: Color([18, 18, 18]),
            text_color: Color::WHITE,
            title_font: "Arial Bold.ttf".to_string(),
            body_font: "Arial.ttf".to_string(),
            nav_font: "Arial.ttf".to_string(),
        }
    }
}

/// Request document as read from disk. Every `style` field is optional and
/// overrides the configured defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestDocument {
    pub title: String,
    pub slides: Vec<SlideInput>,
    #[serde(default)]
    pub include_logo: bool,
    #[serde(default)]
    pub logo_ref: Option<PathBuf>,
    #[serde(default)]
    pub style: StyleOverrides,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StyleOverrides {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub background: Option<Color>,
    pub text_color: Option<Color>,
    pub title_font: Option<String>,
    pub body_font: Option<String>,
    pub nav_font: Option<String>,
}

impl StyleOverrides {
    pub fn apply(self, base: StyleOptions) -> StyleOptions {
        StyleOptions {
            width: self.width.unwrap_or(base.width),
            height: self.height.unwrap_or(base.height),
            background: self.background.unwrap_or(base.background),
            text_color: self.text_color.unwrap_or(base.text_color),
            title_font: self.title_font.unwrap_or(base.title_font),
            body_font: self.body_font.unwrap_or(base.body_font),
            nav_font: self.nav_font.unwrap_or(base.nav_font),
        }
    }
}

impl RequestDocument {
    /// Fill defaults and produce a pipeline request.
    ///
    /// `default_logo` is used when the document asks for a logo without
    /// naming one.
    pub fn into_request(
        self,
        style_defaults: StyleOptions,
        default_logo: Option<PathBuf>,
    ) -> CarouselRequest {
        let logo_ref = match (self.include_logo, self.logo_ref) {
            (true, None) => default_logo,
            (_, logo_ref) => logo_ref,
        };
        CarouselRequest {
            title: self.title,
            slides: self.slides,
            include_logo: self.include_logo,
            logo_ref,
            style: self.style.apply(style_defaults),
        }
    }
}

/// One finished slide, either composed normally or an error slide.
#[derive(Debug, Clone)]
pub struct RenderedSlide {
    /// 1-based position in the carousel.
    pub index: usize,
    pub total_slides: usize,
    pub image: RgbImage,
    pub warnings: Vec<String>,
    pub is_error_slide: bool,
}

impl RenderedSlide {
    pub fn filename(&self) -> String {
        slide_filename(self.index)
    }
}

/// Stored name of slide `index` (1-based).
pub fn slide_filename(index: usize) -> String {
    format!("slide_{index}.png")
}

/// An encoded file waiting to be stored.
#[derive(Debug, Clone)]
pub struct ArtifactFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Encoded slides of one carousel, in slide order.
#[derive(Debug, Clone)]
pub struct CarouselArtifactSet {
    pub carousel_id: String,
    pub files: Vec<ArtifactFile>,
}

impl CarouselArtifactSet {
    /// PNG-encode rendered slides under a carousel id.
    pub fn from_slides(
        carousel_id: String,
        slides: &[RenderedSlide],
    ) -> Result<Self, image::ImageError> {
        let files = slides
            .iter()
            .map(|slide| {
                let mut bytes = Vec::new();
                slide.image.write_to(
                    &mut std::io::Cursor::new(&mut bytes),
                    image::ImageFormat::Png,
                )?;
                Ok(ArtifactFile {
                    filename: slide.filename(),
                    bytes,
                })
            })
            .collect::<Result<Vec<_>, image::ImageError>>()?;
        Ok(Self { carousel_id, files })
    }
}

/// JSON response for a rendered carousel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarouselResponse {
    /// `"success"`, or `"partial"` when any warning was recorded.
    pub status: String,
    pub carousel_id: String,
    pub slides: Vec<EncodedSlide>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedSlide {
    pub filename: String,
    /// Base64 PNG bytes.
    pub content: String,
}

impl CarouselResponse {
    pub fn new(set: &CarouselArtifactSet, warnings: Vec<String>) -> Self {
        use base64::Engine;
        use base64::engine::general_purpose::STANDARD;

        let status = if warnings.is_empty() {
            "success"
        } else {
            "partial"
        };
        Self {
            status: status.to_string(),
            carousel_id: set.carousel_id.clone(),
            slides: set
                .files
                .iter()
                .map(|f| EncodedSlide {
                    filename: f.filename.clone(),
                    content: STANDARD.encode(&f.bytes),
                })
                .collect(),
            warnings,
        }
    }
}
