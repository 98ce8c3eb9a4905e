//! Shared test utilities.
//!
//! Unit tests must not depend on the fonts installed on the machine running
//! them, so every resolver built here has system fonts disabled and resolves
//! to the built-in bitmap font.

use std::sync::Arc;

use crate::imaging::font::{FontResolver, FontSources};
use crate::types::{CarouselRequest, SlideInput, StyleOptions};

// =========================================================================
// Fonts
// =========================================================================

pub fn builtin_fonts() -> Arc<FontResolver> {
    Arc::new(FontResolver::new(FontSources::builtin_only()))
}

// =========================================================================
// Requests
// =========================================================================

/// A 320×320 request with one slide per text. Small canvases keep tests fast.
pub fn sample_request(texts: &[&str]) -> CarouselRequest {
    CarouselRequest {
        title: "Tips".to_string(),
        slides: texts.iter().copied().map(SlideInput::from).collect(),
        include_logo: false,
        logo_ref: None,
        style: StyleOptions {
            width: 320,
            height: 320,
            ..StyleOptions::default()
        },
    }
}
