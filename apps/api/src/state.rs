use std::sync::Arc;

use crate::config::Config;
use crate::extraction::ocr::OcrEngine;
use crate::llm_client::LlmClient;

/// Shared application state injected into all route handlers via Axum extractors.
/// Read-only after startup; requests share nothing mutable.
#[derive(Clone)]
pub struct AppState {
    pub llm: LlmClient,
    /// Pluggable OCR backend. `None` when OCR_ENABLED=false.
    pub ocr: Option<Arc<dyn OcrEngine>>,
    pub config: Config,
}
