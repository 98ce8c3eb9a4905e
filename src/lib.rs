//! # carousel-gen
//!
//! Renders a title and a list of short texts into fixed-size PNG slides for
//! image carousels, and keeps the results on disk for a limited time.
//!
//! # Architecture: Render, Then Store
//!
//! ```text
//! CarouselRequest ─▶ render ─▶ [RenderedSlide; n] ─▶ PNG encode ─▶ ArtifactStore
//!                      │                                              │
//!                 SlideComposer                          {root}/{id}/slide_{n}.png
//!          sanitize → font → wrap → gradient
//! ```
//!
//! Rendering never fails as a whole. Problems are absorbed at the lowest level
//! that can handle them:
//!
//! - a font that cannot be loaded falls back to a bundled font, common system
//!   families, then a built-in bitmap font
//! - gradient text that cannot be drawn falls back to flat text
//! - a missing logo is skipped with a warning
//! - a slide that still fails (or panics) is replaced by an error slide
//!
//! A request therefore always yields one image per input text, plus a list of
//! warnings describing what degraded.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`render`] | Orchestrator: one slide per input, in order, error slides for failures |
//! | [`compose`] | The `standard` and `enhanced` slide renderers |
//! | [`error_slide`] | Placeholder slide drawn with the built-in font only |
//! | [`registry`] | Renderers by name, as selected in the config |
//! | [`sanitize`] | Typographic substitutions, control-character cleanup, Unicode normalization |
//! | [`imaging`] | Fonts, line wrap, gradient text, canvas primitives |
//! | [`store`] | Temporary artifact store: save, get, list, TTL sweep |
//! | [`pipeline`] | Config-built service tying renderer and store together |
//! | [`config`] | `carousel.toml` loading, merging over stock defaults, validation |
//! | [`types`] | Request, slide, artifact, and response types |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Text Is Drawn Through SVG
//!
//! Outline text is laid out and rasterized by `usvg`/`resvg`: each line becomes
//! a one-element SVG document whose text node is converted to paths against a
//! `fontdb` database. This gives real shaping and antialiasing without a system
//! graphics library, and the same code path measures and draws, so wrapped
//! lines are exactly as wide as measured.
//!
//! ## A Font That Always Works
//!
//! The last font fallback is a 5×7 bitmap font compiled into the binary. It
//! covers printable ASCII only and fails loudly on anything else, which is what
//! routes unrenderable text to an error slide instead of drawing tofu boxes.
//!
//! ## Explicit Wiring
//!
//! There is no global service registry. [`pipeline::CarouselPipeline`] is
//! built once from the config and handed to the caller; the sweep is a plain
//! synchronous call the caller schedules (`carousel-gen sweep --every`).

pub mod compose;
pub mod config;
pub mod error_slide;
pub mod imaging;
pub mod output;
pub mod pipeline;
pub mod registry;
pub mod render;
pub mod sanitize;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
