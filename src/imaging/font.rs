//! Font resolution, measurement, and rasterization.
//!
//! | Font kind | Shaping / raster |
//! |---|---|
//! | Outline (file or system family) | `usvg` text-to-path over a `fontdb` database, drawn by `resvg` |
//! | Built-in | [`bitmap_font`](super::bitmap_font), printable ASCII only |
//!
//! [`FontResolver::load_font`] never fails. It walks three steps and logs a
//! warning each time it has to move on:
//!
//! 1. the identifier as given: a path (absolute, under `assets_dir`, or under
//!    `assets_dir/fonts`), a system font file name, or a system family name
//! 2. the bundled font at the requested size, then a few common sans-serif
//!    system families at the fallback size
//! 3. the built-in bitmap font at a fixed scale
//!
//! System fonts are scanned once, on first use, and shared by every handle.

use super::backend::RenderError;
use super::bitmap_font;
use crate::types::Color;
use image::{Rgba, RgbaImage};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use usvg::fontdb::{self, Database};

/// Scale of the built-in font when it is the last resort (7 px × 3 = 21 px glyphs).
pub const BUILTIN_SCALE: u32 = 3;

/// Line height as a multiple of the font size.
const LINE_SPACING: f32 = 1.25;

/// Families tried after the bundled font.
const COMMON_FAMILIES: &[&str] = &["DejaVu Sans", "Liberation Sans", "FreeSans", "Arial"];

const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "ttc"];

/// Pixel size of rasterized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextExtent {
    pub width: u32,
    pub height: u32,
}

/// A drawable font at a fixed size.
#[derive(Debug, Clone)]
pub enum FontHandle {
    Outline(OutlineFont),
    Builtin(BuiltinFont),
}

#[derive(Clone)]
pub struct OutlineFont {
    db: Arc<Database>,
    family: String,
    weight: u16,
    italic: bool,
    size: f32,
}

impl std::fmt::Debug for OutlineFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutlineFont")
            .field("family", &self.family)
            .field("weight", &self.weight)
            .field("size", &self.size)
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BuiltinFont {
    pub scale: u32,
}

impl FontHandle {
    pub fn builtin(scale: u32) -> Self {
        FontHandle::Builtin(BuiltinFont {
            scale: scale.max(1),
        })
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, FontHandle::Builtin(_))
    }

    /// Human-readable description for logs.
    pub fn describe(&self) -> String {
        match self {
            FontHandle::Outline(f) => format!("{} {}px", f.family, f.size),
            FontHandle::Builtin(b) => format!("built-in x{}", b.scale),
        }
    }

    /// Size of the layer [`rasterize`](Self::rasterize) would produce.
    ///
    /// Outline text reports its ink width and a fixed line-box height, so
    /// lines of the same font stack on a common baseline.
    pub fn measure(&self, text: &str) -> Result<TextExtent, RenderError> {
        match self {
            FontHandle::Outline(f) => {
                if text.trim().is_empty() {
                    return Ok(TextExtent {
                        width: 0,
                        height: f.line_height(),
                    });
                }
                let tree = f.layout(text, Color::WHITE)?;
                let (_, width) = f.ink_span(&tree, text)?;
                Ok(TextExtent {
                    width,
                    height: f.line_height(),
                })
            }
            FontHandle::Builtin(b) => {
                let (width, height) = bitmap_font::measure(text, b.scale)?;
                Ok(TextExtent { width, height })
            }
        }
    }

    /// Vertical distance between stacked lines.
    pub fn line_height(&self) -> u32 {
        match self {
            FontHandle::Outline(f) => f.line_height(),
            FontHandle::Builtin(b) => (bitmap_font::GLYPH_HEIGHT + 3) * b.scale,
        }
    }

    /// Draw `text` onto a transparent layer sized by [`measure`](Self::measure).
    pub fn rasterize(&self, text: &str, color: Color) -> Result<RgbaImage, RenderError> {
        let extent = self.measure(text)?;
        match self {
            FontHandle::Outline(f) => {
                if extent.width == 0 {
                    return Ok(RgbaImage::new(0, extent.height));
                }
                let tree = f.layout(text, color)?;
                let (x0, _) = f.ink_span(&tree, text)?;
                let mut pixmap = resvg::tiny_skia::Pixmap::new(extent.width, extent.height)
                    .ok_or(RenderError::Allocation {
                        width: extent.width,
                        height: extent.height,
                    })?;
                let transform = resvg::tiny_skia::Transform::from_translate(-x0, 0.0);
                resvg::render(&tree, transform, &mut pixmap.as_mut());
                Ok(pixmap_to_rgba(&pixmap))
            }
            FontHandle::Builtin(b) => {
                let mut layer = RgbaImage::new(extent.width, extent.height);
                bitmap_font::draw(&mut layer, 0, 0, text, b.scale, color.rgba(255))?;
                Ok(layer)
            }
        }
    }
}

impl OutlineFont {
    fn line_height(&self) -> u32 {
        (self.size * LINE_SPACING).ceil() as u32
    }

    /// Lay `text` out as a single SVG text run with its baseline at `size`.
    fn layout(&self, text: &str, color: Color) -> Result<usvg::Tree, RenderError> {
        let style = if self.italic { "italic" } else { "normal" };
        let svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="1" height="1"><text x="0" y="{size}" font-family="'{family}'" font-size="{size}" font-weight="{weight}" font-style="{style}" fill="{fill}" xml:space="preserve">{text}</text></svg>"#,
            size = self.size,
            family = escape_xml(&self.family.replace('\'', "")),
            weight = self.weight,
            fill = color.to_hex(),
            text = escape_xml(text),
        );
        let options = usvg::Options {
            fontdb: Arc::clone(&self.db),
            ..Default::default()
        };
        usvg::Tree::from_str(&svg, &options).map_err(|e| RenderError::Layout(e.to_string()))
    }

    /// Left edge and pixel width of the inked glyphs.
    fn ink_span(&self, tree: &usvg::Tree, text: &str) -> Result<(f32, u32), RenderError> {
        let root = tree.root();
        if !root.has_children() {
            return Err(RenderError::MissingGlyphs {
                family: self.family.clone(),
                text: text.to_string(),
            });
        }
        let bbox = root.abs_bounding_box();
        let x0 = bbox.x().floor();
        let width = (bbox.right().ceil() - x0).max(1.0) as u32;
        Ok((x0, width))
    }
}

fn pixmap_to_rgba(pixmap: &resvg::tiny_skia::Pixmap) -> RgbaImage {
    let mut out = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in out.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    out
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn looks_like_path(name: &str) -> bool {
    name.contains('/')
        || name.contains('\\')
        || Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| FONT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// Font lookup settings.
#[derive(Debug, Clone, Default)]
pub struct FontSources {
    pub assets_dir: PathBuf,
    pub bundled: Option<PathBuf>,
    pub system_fonts: bool,
}

impl FontSources {
    /// Only the built-in font will ever be used.
    pub fn builtin_only() -> Self {
        Self::default()
    }
}

impl From<&crate::config::FontsConfig> for FontSources {
    fn from(config: &crate::config::FontsConfig) -> Self {
        Self {
            assets_dir: PathBuf::from(&config.assets_dir),
            bundled: config.bundled_path(),
            system_fonts: config.system_fonts,
        }
    }
}

/// A face found in a database, ready to be sized.
#[derive(Clone)]
struct Face {
    db: Arc<Database>,
    family: String,
    weight: u16,
    italic: bool,
}

impl Face {
    fn at(&self, size: u32) -> FontHandle {
        FontHandle::Outline(OutlineFont {
            db: Arc::clone(&self.db),
            family: self.family.clone(),
            weight: self.weight,
            italic: self.italic,
            size: size.max(1) as f32,
        })
    }

    fn from_info(db: &Arc<Database>, info: &fontdb::FaceInfo) -> Option<Self> {
        let (family, _) = info.families.first()?;
        Some(Self {
            db: Arc::clone(db),
            family: family.clone(),
            weight: info.weight.0,
            italic: info.style != fontdb::Style::Normal,
        })
    }
}

/// Resolves font identifiers to [`FontHandle`]s. Shared across worker threads.
pub struct FontResolver {
    sources: FontSources,
    system: OnceLock<Arc<Database>>,
    files: Mutex<HashMap<PathBuf, Option<Face>>>,
}

impl FontResolver {
    pub fn new(sources: FontSources) -> Self {
        Self {
            sources,
            system: OnceLock::new(),
            files: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve `name_or_path` at `size`, falling back as described in the
    /// [module docs](self). Always returns a usable handle.
    pub fn load_font(&self, name_or_path: &str, size: u32, fallback_size: u32) -> FontHandle {
        if let Some(face) = self.find_face(name_or_path) {
            return face.at(size);
        }
        tracing::warn!(font = name_or_path, "font not found, trying bundled font");

        if let Some(bundled) = &self.sources.bundled {
            if let Some(face) = self.file_face(bundled) {
                return face.at(size);
            }
            tracing::warn!(path = %bundled.display(), "bundled font unavailable");
        }
        for family in COMMON_FAMILIES {
            if let Some(face) = self.system_family(family) {
                tracing::warn!(font = name_or_path, fallback = *family, "using system fallback font");
                return face.at(fallback_size);
            }
        }

        tracing::warn!(font = name_or_path, "no outline font available, using built-in font");
        FontHandle::builtin(BUILTIN_SCALE)
    }

    fn find_face(&self, name: &str) -> Option<Face> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        if looks_like_path(name) {
            let given = PathBuf::from(name);
            let candidates = [
                given.clone(),
                self.sources.assets_dir.join(&given),
                self.sources.assets_dir.join("fonts").join(&given),
            ];
            for candidate in candidates {
                if candidate.is_file() {
                    return self.file_face(&candidate);
                }
            }
            return self.system_file(name);
        }
        self.system_family(name)
    }

    /// Load a font file into its own database, cached per path.
    fn file_face(&self, path: &Path) -> Option<Face> {
        let mut files = match self.files.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(cached) = files.get(path) {
            return cached.clone();
        }
        let mut db = Database::new();
        let face = match db.load_font_file(path) {
            Ok(()) => {
                let db = Arc::new(db);
                let face = db.faces().next().and_then(|info| Face::from_info(&db, info));
                if face.is_none() {
                    tracing::warn!(path = %path.display(), "font file contains no usable face");
                }
                face
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read font file");
                None
            }
        };
        files.insert(path.to_path_buf(), face.clone());
        face
    }

    fn system_db(&self) -> Option<&Arc<Database>> {
        if !self.sources.system_fonts {
            return None;
        }
        Some(self.system.get_or_init(|| {
            let mut db = Database::new();
            db.load_system_fonts();
            tracing::debug!(faces = db.len(), "loaded system fonts");
            Arc::new(db)
        }))
    }

    /// A system face whose file name matches `file_name`, e.g. `Arial Bold.ttf`.
    fn system_file(&self, file_name: &str) -> Option<Face> {
        let db = self.system_db()?;
        let wanted = Path::new(file_name).file_name()?.to_str()?;
        db.faces()
            .find(|info| {
                let path = match &info.source {
                    fontdb::Source::File(p) | fontdb::Source::SharedFile(p, _) => p,
                    fontdb::Source::Binary(_) => return false,
                };
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.eq_ignore_ascii_case(wanted))
            })
            .and_then(|info| Face::from_info(db, info))
    }

    fn system_family(&self, family: &str) -> Option<Face> {
        let db = self.system_db()?;
        let families = [fontdb::Family::Name(family)];
        let query = fontdb::Query {
            families: &families,
            ..fontdb::Query::default()
        };
        let id = db.query(&query)?;
        db.face(id).and_then(|info| Face::from_info(db, info))
    }
}

impl std::fmt::Debug for FontResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontResolver")
            .field("sources", &self.sources)
            .finish()
    }
}
