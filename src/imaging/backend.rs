//! Slide renderer trait and shared types.
//!
//! The [`SlideRenderer`] trait is the seam between the orchestrator and the
//! actual drawing code. The production implementation is
//! [`SlideComposer`](crate::compose::SlideComposer) in its `standard` and
//! `enhanced` themes; renderers are looked up by name in the
//! [`RendererRegistry`](crate::registry::RendererRegistry).

use crate::types::StyleOptions;
use image::RgbImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("can't encode character {ch:?} in position {position}: not covered by {font}")]
    UnsupportedCharacter {
        ch: char,
        position: usize,
        font: String,
    },
    #[error("font {family:?} produced no glyphs for {text:?}")]
    MissingGlyphs { family: String, text: String },
    #[error("text layout failed: {0}")]
    Layout(String),
    #[error("cannot allocate {width}x{height} raster: out of memory")]
    Allocation { width: u32, height: u32 },
    #[error("logo {}: {reason}", path.display())]
    Logo { path: PathBuf, reason: String },
    #[error("gradient needs at least one color stop")]
    NoColorStops,
    #[error("renderer panicked: {0}")]
    Panicked(String),
}

/// Everything a renderer needs to draw one slide.
#[derive(Debug, Clone, Copy)]
pub struct SlideJob<'a> {
    /// Present only for the first slide.
    pub title: Option<&'a str>,
    pub body: &'a str,
    /// 1-based.
    pub index: usize,
    pub total: usize,
    pub include_logo: bool,
    pub logo_ref: Option<&'a Path>,
    pub style: &'a StyleOptions,
}

/// A successfully composed slide plus non-fatal warnings (e.g. a missing logo).
#[derive(Debug, Clone)]
pub struct ComposedSlide {
    pub image: RgbImage,
    pub warnings: Vec<String>,
}

/// A slide rendering style.
///
/// `compose_slide` may fail; the orchestrator then calls
/// `compose_error_slide`, which must not.
pub trait SlideRenderer: Sync {
    /// Registry name.
    fn name(&self) -> &str;

    fn compose_slide(&self, job: &SlideJob<'_>) -> Result<ComposedSlide, RenderError>;

    fn compose_error_slide(
        &self,
        index: usize,
        total: usize,
        message: &str,
        style: &StyleOptions,
    ) -> RgbImage {
        crate::error_slide::compose_error_slide(index, total, message, style)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock renderer that records jobs and returns blank slides.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    #[derive(Default)]
    pub struct MockRenderer {
        pub jobs: Mutex<Vec<RecordedJob>>,
        /// Indices whose composition returns an error.
        pub fail_on: Vec<usize>,
        /// Indices whose composition panics.
        pub panic_on: Vec<usize>,
        /// Indices whose composition succeeds with a warning.
        pub warn_on: Vec<usize>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedJob {
        pub index: usize,
        pub total: usize,
        pub title: Option<String>,
        pub body: String,
    }

    impl MockRenderer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_on(indices: &[usize]) -> Self {
            Self {
                fail_on: indices.to_vec(),
                ..Self::default()
            }
        }

        pub fn panicking_on(indices: &[usize]) -> Self {
            Self {
                panic_on: indices.to_vec(),
                ..Self::default()
            }
        }

        /// Recorded jobs sorted by index (rendering order is not deterministic).
        pub fn get_jobs(&self) -> Vec<RecordedJob> {
            let mut jobs = self.jobs.lock().unwrap().clone();
            jobs.sort_by_key(|j| j.index);
            jobs
        }
    }

    impl SlideRenderer for MockRenderer {
        fn name(&self) -> &str {
            "mock"
        }

        fn compose_slide(&self, job: &SlideJob<'_>) -> Result<ComposedSlide, RenderError> {
            self.jobs.lock().unwrap().push(RecordedJob {
                index: job.index,
                total: job.total,
                title: job.title.map(str::to_string),
                body: job.body.to_string(),
            });
            if self.panic_on.contains(&job.index) {
                panic!("mock panic on slide {}", job.index);
            }
            if self.fail_on.contains(&job.index) {
                return Err(RenderError::UnsupportedCharacter {
                    ch: '\u{2603}',
                    position: 0,
                    font: "mock".to_string(),
                });
            }
            let warnings = if self.warn_on.contains(&job.index) {
                vec!["mock warning".to_string()]
            } else {
                Vec::new()
            };
            Ok(ComposedSlide {
                image: RgbImage::new(job.style.width, job.style.height),
                warnings,
            })
        }
    }

    #[test]
    fn mock_records_jobs() {
        let renderer = MockRenderer::new();
        let style = StyleOptions::default();
        let job = SlideJob {
            title: Some("Tips"),
            body: "hello",
            index: 1,
            total: 2,
            include_logo: false,
            logo_ref: None,
            style: &style,
        };
        let slide = renderer.compose_slide(&job).unwrap();
        assert_eq!(slide.image.dimensions(), (1080, 1080));

        let jobs = renderer.get_jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].title.as_deref(), Some("Tips"));
    }

    #[test]
    fn mock_fails_on_request() {
        let renderer = MockRenderer::failing_on(&[2]);
        let style = StyleOptions::default();
        let job = SlideJob {
            title: None,
            body: "x",
            index: 2,
            total: 2,
            include_logo: false,
            logo_ref: None,
            style: &style,
        };
        let err = renderer.compose_slide(&job).unwrap_err();
        assert!(err.to_string().contains("can't encode character"));
    }

    #[test]
    fn render_error_messages() {
        let err = RenderError::Allocation {
            width: 10,
            height: 20,
        };
        assert_eq!(
            err.to_string(),
            "cannot allocate 10x20 raster: out of memory"
        );
        let err = RenderError::Logo {
            path: PathBuf::from("missing.png"),
            reason: "not found".into(),
        };
        assert_eq!(err.to_string(), "logo missing.png: not found");
    }
}
