mod analysis;
mod config;
mod errors;
mod extraction;
mod llm_client;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::extraction::ocr::{OcrEngine, TesseractCli};
use crate::llm_client::{LlmClient, LlmSettings};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume Analyzer v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm = LlmClient::new(LlmSettings::from(&config))?;
    match llm.fallback_model() {
        Some(fallback) => info!(
            "LLM client initialized (primary: {}, fallback: {fallback})",
            llm.primary_model()
        ),
        None => warn!(
            "LLM client initialized (primary: {}) with no fallback model",
            llm.primary_model()
        ),
    }

    // OCR is optional; image uploads are rejected without it
    let ocr = if config.ocr_enabled {
        let engine = TesseractCli::from_config(&config);
        info!("OCR enabled via `{}` ({})", engine.command(), config.ocr_lang);
        Some(Arc::new(engine) as Arc<dyn OcrEngine>)
    } else {
        info!("OCR disabled");
        None
    };

    let state = AppState {
        llm,
        ocr,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
