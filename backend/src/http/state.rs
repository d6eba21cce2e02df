//! Application state for the HTTP server.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::repository::FullRepository;
use crate::images::CoverImageGenerator;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Repository instance for database operations
    pub repository: Arc<dyn FullRepository>,
    pub config: Arc<AppConfig>,
    /// Cover-image service for automated articles, when configured
    pub images: Option<Arc<dyn CoverImageGenerator>>,
}

impl AppState {
    /// Create a new application state with the given repository and default configuration.
    pub fn new(repository: Arc<dyn FullRepository>) -> Self {
        Self {
            repository,
            config: Arc::new(AppConfig::default()),
            images: None,
        }
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    pub fn with_image_generator(mut self, images: Arc<dyn CoverImageGenerator>) -> Self {
        self.images = Some(images);
        self
    }
}
