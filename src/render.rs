//! Carousel orchestration.
//!
//! [`render`] turns a [`CarouselRequest`] into exactly one [`RenderedSlide`]
//! per input slide, in input order. Slides are composed in parallel with
//! rayon; a slide whose composition fails (an `Err` or a panic) is replaced
//! by the renderer's error slide and the failure is recorded as a warning.
//! Nothing here retries: the same input fails the same way every time.
//!
//! Progress can be observed through an optional [`RenderEvent`] channel,
//! which the CLI drains on a printer thread.

use crate::imaging::backend::{RenderError, SlideJob, SlideRenderer};
use crate::types::{CarouselRequest, RenderedSlide};
use rayon::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::Sender;

/// Progress notifications emitted while a carousel renders.
///
/// Slide events arrive in completion order, not index order.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderEvent {
    Started {
        renderer: String,
        total: usize,
    },
    SlideRendered {
        index: usize,
        total: usize,
        warnings: Vec<String>,
    },
    SlideFailed {
        index: usize,
        total: usize,
        error: String,
    },
}

#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub slides: Vec<RenderedSlide>,
    /// Every slide's warnings, prefixed with `slide {index}: `, in index order.
    pub warnings: Vec<String>,
}

impl RenderOutcome {
    pub fn error_slides(&self) -> usize {
        self.slides.iter().filter(|s| s.is_error_slide).count()
    }
}

#[tracing::instrument(skip_all, fields(renderer = renderer.name(), slides = request.slides.len()))]
pub fn render(
    renderer: &dyn SlideRenderer,
    request: &CarouselRequest,
    events: Option<Sender<RenderEvent>>,
) -> RenderOutcome {
    let total = request.slides.len();
    emit(
        events.as_ref(),
        RenderEvent::Started {
            renderer: renderer.name().to_string(),
            total,
        },
    );

    let slides: Vec<RenderedSlide> = request
        .slides
        .par_iter()
        .enumerate()
        .map(|(i, input)| {
            let index = i + 1;
            let job = SlideJob {
                title: (index == 1).then_some(request.title.as_str()),
                body: &input.text,
                index,
                total,
                include_logo: request.include_logo,
                logo_ref: request.logo_ref.as_deref(),
                style: &request.style,
            };
            let slide = render_one(renderer, &job);
            let event = if slide.is_error_slide {
                RenderEvent::SlideFailed {
                    index,
                    total,
                    error: slide.warnings.join("; "),
                }
            } else {
                RenderEvent::SlideRendered {
                    index,
                    total,
                    warnings: slide.warnings.clone(),
                }
            };
            emit(events.as_ref(), event);
            slide
        })
        .collect();

    let warnings: Vec<String> = slides
        .iter()
        .flat_map(|s| s.warnings.iter().map(move |w| format!("slide {}: {w}", s.index)))
        .collect();
    let failed = slides.iter().filter(|s| s.is_error_slide).count();
    tracing::info!(
        slides = slides.len(),
        failed,
        warnings = warnings.len(),
        "carousel rendered"
    );

    RenderOutcome { slides, warnings }
}

fn render_one(renderer: &dyn SlideRenderer, job: &SlideJob<'_>) -> RenderedSlide {
    let result = panic::catch_unwind(AssertUnwindSafe(|| renderer.compose_slide(job)))
        .unwrap_or_else(|payload| Err(RenderError::Panicked(panic_message(payload.as_ref()))));

    match result {
        Ok(composed) => RenderedSlide {
            index: job.index,
            total_slides: job.total,
            image: composed.image,
            warnings: composed.warnings,
            is_error_slide: false,
        },
        Err(e) => {
            let message = e.to_string();
            tracing::warn!(slide = job.index, error = %message, "slide failed, substituting error slide");
            RenderedSlide {
                index: job.index,
                total_slides: job.total,
                image: renderer.compose_error_slide(job.index, job.total, &message, job.style),
                warnings: vec![message],
                is_error_slide: true,
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn emit(events: Option<&Sender<RenderEvent>>, event: RenderEvent) {
    if let Some(tx) = events {
        // A closed receiver only means nobody is watching.
        tx.send(event).ok();
    }
}
