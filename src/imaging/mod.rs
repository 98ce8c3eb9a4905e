//! Raster text and drawing primitives for slides.
//!
//! | Concern | Module / crate |
//! |---|---|
//! | **Font lookup** | [`font`]: file, system family, bundled, built-in fallback |
//! | **Outline text** | `usvg` text-to-path + `resvg` raster |
//! | **Built-in text** | [`bitmap_font`], 5×7 printable ASCII |
//! | **Line wrap** | [`wrap`], greedy against measured widths |
//! | **Gradient text** | [`gradient`], luminance-masked color strip + drop shadow |
//! | **Canvas** | [`canvas`], backgrounds, rectangles, compositing via `image::imageops` |
//!
//! The module is split into:
//! - **Backend**: [`SlideRenderer`] trait, [`SlideJob`], [`RenderError`]
//! - **Text**: fonts, wrap, gradient compositor
//! - **Canvas**: pure drawing helpers shared by slides and error slides

pub mod backend;
pub mod bitmap_font;
pub mod canvas;
pub mod font;
pub mod gradient;
pub mod wrap;

pub use backend::{ComposedSlide, RenderError, SlideJob, SlideRenderer};
pub use font::{FontHandle, FontResolver, FontSources};
