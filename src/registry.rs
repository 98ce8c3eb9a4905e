//! Named slide renderers.
//!
//! The configured `renderer` name is looked up here. `standard` and
//! `enhanced` are always registered; other renderers can be added with
//! [`RendererRegistry::register`] before the pipeline is built.

use crate::compose::{SlideComposer, Theme};
use crate::imaging::backend::SlideRenderer;
use crate::imaging::font::FontResolver;
use crate::sanitize::Sanitizer;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Shared resources handed to every renderer constructor.
#[derive(Debug, Clone)]
pub struct RendererContext {
    pub fonts: Arc<FontResolver>,
    pub sanitizer: Sanitizer,
}

pub type RendererConstructor = fn(&RendererContext) -> Box<dyn SlideRenderer + Send>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown renderer '{name}' (available: {})", known.join(", "))]
    Unknown { name: String, known: Vec<String> },
    #[error("renderer '{0}' is already registered")]
    AlreadyRegistered(String),
}

pub struct RendererRegistry {
    constructors: BTreeMap<String, RendererConstructor>,
}

impl RendererRegistry {
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// Registry holding the built-in `standard` and `enhanced` renderers.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry
            .constructors
            .insert("standard".to_string(), |ctx| {
                Box::new(SlideComposer::new(Theme::standard(), ctx.fonts.clone(), ctx.sanitizer))
            });
        registry
            .constructors
            .insert("enhanced".to_string(), |ctx| {
                Box::new(SlideComposer::new(Theme::enhanced(), ctx.fonts.clone(), ctx.sanitizer))
            });
        registry
    }

    pub fn register(
        &mut self,
        name: &str,
        constructor: RendererConstructor,
    ) -> Result<(), RegistryError> {
        if self.constructors.contains_key(name) {
            return Err(RegistryError::AlreadyRegistered(name.to_string()));
        }
        self.constructors.insert(name.to_string(), constructor);
        Ok(())
    }

    pub fn create(
        &self,
        name: &str,
        ctx: &RendererContext,
    ) -> Result<Box<dyn SlideRenderer + Send>, RegistryError> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| RegistryError::Unknown {
                name: name.to_string(),
                known: self.names(),
            })?;
        Ok(constructor(ctx))
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.constructors.keys().cloned().collect()
    }
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
