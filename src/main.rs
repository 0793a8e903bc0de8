//! Eco Predict Server
//!
//! Serves the pre-trained footprint regression model over HTTP.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      ECO PREDICT                         │
//! ├──────────────────────────────────────────────────────────┤
//! │  POST /predict                                           │
//! │     │  JSON record                                       │
//! │     ▼                                                    │
//! │  ┌───────────┐   ┌──────────────┐   ┌─────────────────┐  │
//! │  │  Handler  │──▶│ FeatureFrame │──▶│  OnnxPredictor  │  │
//! │  │  (Axum)   │   │  (one row)   │   │  (loaded once)  │  │
//! │  └───────────┘   └──────────────┘   └─────────────────┘  │
//! │     ▲                                        │           │
//! │     └──── {co2_emissions, water_consumption} ┘           │
//! └──────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod handlers;
mod logic;
mod models;

use std::sync::Arc;

use anyhow::Context;
use axum::{extract::DefaultBodyLimit, routing::post, Router};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use logic::model::{OnnxPredictor, Predictor};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    // Initialize logging
    init_tracing(&config);

    tracing::info!("Eco Predict Server v{} starting...", env!("CARGO_PKG_VERSION"));

    // Load model, no model means no server
    let predictor = OnnxPredictor::load(&config.model_path, config.inference_threads)
        .with_context(|| format!("Failed to load model from {}", config.model_path.display()))
        .inspect_err(|e| tracing::error!("{:#}", e))?;

    let state = AppState {
        predictor: Arc::new(predictor),
    };

    let app = create_router(state, config.max_body_bytes);

    // Start server
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("🚀 Server listening on http://{}", addr);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn init_tracing(config: &config::Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "eco_predict=debug,tower_http=debug".into());

    if config.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<dyn Predictor>,
}

/// Create the router
fn create_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/predict", post(handlers::predict::predict))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
