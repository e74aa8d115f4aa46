//! Shared application state injected into every handler.

use codezen_core::{CodezenConfig, CodezenError};
use codezen_review::llm::LlmClient;
use codezen_review::pipeline::ReviewService;
use codezen_store::Store;

/// State shared across all HTTP handlers.
pub struct AppState {
    /// Orchestrates storage and generation.
    pub service: ReviewService,
}

impl AppState {
    /// Wrap an already constructed service.
    pub fn new(service: ReviewService) -> Self {
        Self { service }
    }

    /// Open the configured database and build the generation client.
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::Database`] if the store cannot be opened, or
    /// [`CodezenError::Llm`] if the HTTP client cannot be built.
    pub fn from_config(config: &CodezenConfig) -> Result<Self, CodezenError> {
        let store = Store::open(&config.database.path)?;
        let llm = LlmClient::new(&config.llm)?;
        Ok(Self::new(ReviewService::new(store, llm)))
    }
}
