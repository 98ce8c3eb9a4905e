//! The carousel service: renderer, font resolver, and store wired together
//! from configuration.
//!
//! A [`CarouselPipeline`] is built once at startup and passed to whatever
//! drives it (the CLI here). It holds no global state.
//!
//! ```text
//! RequestDocument ──request()──▶ CarouselRequest ──render()──▶ RenderOutcome
//!                                                   │
//!                                                publish()
//!                                                   ▼
//!                       PNG encode ──▶ ArtifactStore::save ──▶ CarouselResponse
//! ```

use crate::config::{CarouselConfig, ConfigError, MAX_CANVAS_EDGE};
use crate::imaging::backend::SlideRenderer;
use crate::imaging::font::{FontResolver, FontSources};
use crate::registry::{RegistryError, RendererContext, RendererRegistry};
use crate::render::{self, RenderEvent, RenderOutcome};
use crate::sanitize::Sanitizer;
use crate::store::{self, ArtifactStore, StoreError, StoredFile};
use crate::types::{
    CarouselArtifactSet, CarouselRequest, CarouselResponse, RequestDocument, StyleOptions,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// A rendered and stored carousel.
#[derive(Debug, Clone)]
pub struct Publication {
    pub response: CarouselResponse,
    pub stored: Vec<StoredFile>,
    pub error_slides: usize,
}

pub struct CarouselPipeline {
    renderer: Box<dyn SlideRenderer + Send>,
    store: ArtifactStore,
    style_defaults: StyleOptions,
    default_logo: Option<PathBuf>,
}

impl CarouselPipeline {
    pub fn new(config: &CarouselConfig) -> Result<Self, PipelineError> {
        Self::with_registry(config, &RendererRegistry::builtin())
    }

    /// Build the pipeline with renderers from a custom registry.
    pub fn with_registry(
        config: &CarouselConfig,
        registry: &RendererRegistry,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        let ctx = RendererContext {
            fonts: Arc::new(FontResolver::new(FontSources::from(&config.fonts))),
            sanitizer: Sanitizer::new(config.text.ascii_only),
        };
        let renderer = registry.create(&config.renderer, &ctx)?;
        let store = ArtifactStore::open(&config.storage.root)?;
        tracing::debug!(
            renderer = renderer.name(),
            store = %store.root().display(),
            "pipeline ready"
        );
        Ok(Self {
            renderer,
            store,
            style_defaults: config.style_defaults()?,
            default_logo: config.logo.path.as_ref().map(PathBuf::from),
        })
    }

    pub fn renderer_name(&self) -> &str {
        self.renderer.name()
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Fill a request document with configured defaults.
    pub fn request(&self, document: RequestDocument) -> Result<CarouselRequest, PipelineError> {
        if document.slides.is_empty() {
            return Err(PipelineError::InvalidRequest(
                "slides must contain at least one text".to_string(),
            ));
        }
        if document.title.trim().is_empty() {
            return Err(PipelineError::InvalidRequest(
                "title must not be empty".to_string(),
            ));
        }
        let request = document.into_request(self.style_defaults.clone(), self.default_logo.clone());
        let style = &request.style;
        for (name, edge) in [("width", style.width), ("height", style.height)] {
            if edge == 0 || edge > MAX_CANVAS_EDGE {
                return Err(PipelineError::InvalidRequest(format!(
                    "style.{name} must be between 1 and {MAX_CANVAS_EDGE}, got {edge}"
                )));
            }
        }
        for (name, font) in [
            ("title_font", &style.title_font),
            ("body_font", &style.body_font),
            ("nav_font", &style.nav_font),
        ] {
            if font.trim().is_empty() {
                return Err(PipelineError::InvalidRequest(format!(
                    "style.{name} must not be empty"
                )));
            }
        }
        Ok(request)
    }

    /// Render every slide. Never fails; see [`render::render`].
    pub fn render(
        &self,
        request: &CarouselRequest,
        events: Option<Sender<RenderEvent>>,
    ) -> RenderOutcome {
        render::render(self.renderer.as_ref(), request, events)
    }

    /// Render, encode, and store a carousel under a fresh id.
    pub fn publish(
        &self,
        request: &CarouselRequest,
        events: Option<Sender<RenderEvent>>,
    ) -> Result<Publication, PipelineError> {
        let outcome = self.render(request, events);
        let set = CarouselArtifactSet::from_slides(store::new_carousel_id(), &outcome.slides)
            .map_err(StoreError::from)?;
        let stored = self.store.save(&set)?;
        let error_slides = outcome.error_slides();
        Ok(Publication {
            response: CarouselResponse::new(&set, outcome.warnings),
            stored,
            error_slides,
        })
    }
}
