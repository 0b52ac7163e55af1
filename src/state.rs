use std::sync::Arc;

use crate::config::AppConfig;
use crate::generation::typst::TypstPageRenderer;
use crate::generation::{GenerationOptions, PageRenderer};

/// Shared, read-only service state. Nothing here carries data between requests.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub renderer: Arc<dyn PageRenderer>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let renderer = TypstPageRenderer::new(
            config.typst_bin.clone(),
            config.templates_dir.clone(),
            Some(config.fonts_dir.clone()),
        );
        Self::with_renderer(config, Arc::new(renderer))
    }

    pub fn with_renderer(config: AppConfig, renderer: Arc<dyn PageRenderer>) -> Self {
        Self { config, renderer }
    }

    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            render_concurrency: self.config.render_concurrency,
        }
    }
}
