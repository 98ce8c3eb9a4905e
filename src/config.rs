//! Renderer configuration.
//!
//! Handles loading, validating, and merging the TOML config file. Stock
//! defaults are serialized into a TOML table first; the user file is merged
//! on top of it, so a config file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! renderer = "enhanced"     # "standard" or "enhanced"
//! log_level = "info"        # error | warn | info | debug | trace | off
//!
//! [canvas]
//! width = 1080
//! height = 1080
//! background = "#121212"
//! text_color = "#ffffff"
//!
//! [fonts]
//! assets_dir = "assets"
//! title = "Arial Bold.ttf"
//! body = "Arial.ttf"
//! nav = "Arial.ttf"
//! bundled = "fonts/DejaVuSans.ttf"   # relative to assets_dir
//! system_fonts = true
//!
//! [text]
//! ascii_only = false
//!
//! [logo]
//! path = "assets/logo.png"
//!
//! [storage]
//! root = "carousel-store"
//! ttl_hours = 24
//!
//! [processing]
//! max_processes = 4         # Max parallel slide workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::types::{Color, StyleOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Largest canvas edge accepted from config or requests.
pub const MAX_CANVAS_EDGE: u32 = 8192;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CarouselConfig {
    /// Registry name of the slide renderer.
    pub renderer: String,
    /// Max log level for the CLI subscriber.
    pub log_level: String,
    pub canvas: CanvasConfig,
    pub fonts: FontsConfig,
    pub text: TextConfig,
    pub logo: LogoConfig,
    pub storage: StorageConfig,
    pub processing: ProcessingConfig,
}

impl Default for CarouselConfig {
    fn default() -> Self {
        Self {
            renderer: "enhanced".to_string(),
            log_level: "info".to_string(),
            canvas: CanvasConfig::default(),
            fonts: FontsConfig::default(),
            text: TextConfig::default(),
            logo: LogoConfig::default(),
            storage: StorageConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl CarouselConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, edge) in [
            ("canvas.width", self.canvas.width),
            ("canvas.height", self.canvas.height),
        ] {
            if edge == 0 || edge > MAX_CANVAS_EDGE {
                return Err(ConfigError::Validation(format!(
                    "{key} must be 1-{MAX_CANVAS_EDGE}"
                )));
            }
        }
        parse_hex_color(&self.canvas.background)?;
        parse_hex_color(&self.canvas.text_color)?;
        self.level_filter()?;
        for (key, value) in [
            ("fonts.title", &self.fonts.title),
            ("fonts.body", &self.fonts.body),
            ("fonts.nav", &self.fonts.nav),
            ("renderer", &self.renderer),
            ("storage.root", &self.storage.root),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        Ok(())
    }

    /// Parsed `log_level`.
    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        self.log_level.parse().map_err(|_| {
            ConfigError::Validation(format!(
                "log_level must be one of error, warn, info, debug, trace, off (got {:?})",
                self.log_level
            ))
        })
    }

    /// Default style applied to requests that do not override it.
    pub fn style_defaults(&self) -> Result<StyleOptions, ConfigError> {
        Ok(StyleOptions {
            width: self.canvas.width,
            height: self.canvas.height,
            background: parse_hex_color(&self.canvas.background)?,
            text_color: parse_hex_color(&self.canvas.text_color)?,
            title_font: self.fonts.title.clone(),
            body_font: self.fonts.body.clone(),
            nav_font: self.fonts.nav.clone(),
        })
    }
}

/// Canvas size and colors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
    /// Background color as `#rrggbb` or `#rgb`.
    pub background: String,
    /// Body text color as `#rrggbb` or `#rgb`.
    pub text_color: String,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1080,
            background: "#121212".to_string(),
            text_color: "#ffffff".to_string(),
        }
    }
}

/// Font identifiers and lookup locations.
///
/// `title`, `body` and `nav` are either paths (absolute, or relative to
/// `assets_dir`), font file names found among the system fonts, or family names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FontsConfig {
    pub assets_dir: String,
    pub title: String,
    pub body: String,
    pub nav: String,
    /// Font file shipped with the deployment, relative to `assets_dir`.
    /// Used as the second fallback step.
    pub bundled: Option<String>,
    /// Search installed system fonts. Disabling this makes rendering
    /// independent of the host font setup.
    pub system_fonts: bool,
}

impl Default for FontsConfig {
    fn default() -> Self {
        Self {
            assets_dir: "assets".to_string(),
            title: "Arial Bold.ttf".to_string(),
            body: "Arial.ttf".to_string(),
            nav: "Arial.ttf".to_string(),
            bundled: Some("fonts/DejaVuSans.ttf".to_string()),
            system_fonts: true,
        }
    }
}

impl FontsConfig {
    pub fn bundled_path(&self) -> Option<PathBuf> {
        self.bundled
            .as_ref()
            .map(|b| Path::new(&self.assets_dir).join(b))
    }
}

/// Text sanitation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextConfig {
    /// Drop every non-ASCII character after substitutions.
    pub ascii_only: bool,
}

/// Logo settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogoConfig {
    /// Logo used when a request asks for one without naming it.
    pub path: Option<String>,
}

impl Default for LogoConfig {
    fn default() -> Self {
        Self {
            path: Some("assets/logo.png".to_string()),
        }
    }
}

/// Artifact store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub root: String,
    /// Hours a stored carousel is kept before a sweep removes it.
    pub ttl_hours: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: "carousel-store".to_string(),
            ttl_hours: 24,
        }
    }
}

impl StorageConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours.saturating_mul(3600))
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel slide workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Parse `#rrggbb` or `#rgb` (leading `#` optional).
pub fn parse_hex_color(value: &str) -> Result<Color, ConfigError> {
    let invalid = || ConfigError::Validation(format!("invalid color {value:?}, expected #rrggbb"));
    let hex = value.trim().trim_start_matches('#');
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
    match hex.len() {
        6 => Ok(Color([
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        ])),
        3 => {
            let short = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
            Ok(Color([short(0)?, short(1)?, short(2)?]))
        }
        _ => Err(invalid()),
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(CarouselConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// Tables merge key by key; any other overlay value replaces the base value.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<CarouselConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: CarouselConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a file, falling back to stock defaults when it is missing.
pub fn load_config(path: &Path) -> Result<CarouselConfig, ConfigError> {
    let overlay = load_raw_config(path)?;
    resolve_config(stock_defaults_value(), overlay)
}

/// Returns a fully-commented stock config file.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# carousel-gen configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# Slide renderer: "standard" (flat) or "enhanced" (tinted background, color gradients).
renderer = "enhanced"

# Log level for diagnostics on stderr: error, warn, info, debug, trace, off.
log_level = "info"

# ---------------------------------------------------------------------------
# Canvas
# ---------------------------------------------------------------------------
[canvas]
width = 1080
height = 1080
background = "#121212"
text_color = "#ffffff"

# ---------------------------------------------------------------------------
# Fonts
# ---------------------------------------------------------------------------
# Each font is a path (absolute or relative to assets_dir), a font file name
# found among the system fonts, or a family name. When a font cannot be loaded
# the renderer falls back to the bundled font, then common sans-serif system
# families, then a built-in bitmap font.
[fonts]
assets_dir = "assets"
title = "Arial Bold.ttf"
body = "Arial.ttf"
nav = "Arial.ttf"
bundled = "fonts/DejaVuSans.ttf"
system_fonts = true

# ---------------------------------------------------------------------------
# Text
# ---------------------------------------------------------------------------
[text]
# Strip every non-ASCII character after typographic substitutions.
ascii_only = false

# ---------------------------------------------------------------------------
# Logo
# ---------------------------------------------------------------------------
[logo]
# Used when a request sets include_logo without a logo_ref.
path = "assets/logo.png"

# ---------------------------------------------------------------------------
# Storage
# ---------------------------------------------------------------------------
[storage]
# Rendered carousels live in {root}/{carousel_id}/slide_{n}.png
root = "carousel-store"
# Carousels older than this are removed by `carousel-gen sweep`.
ttl_hours = 24

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel slide workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
