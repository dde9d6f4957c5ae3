//! Fruit Ripeness API Server
//!
//! HTTP boundary for the ripeness pipeline: upload handling, health and
//! metrics endpoints, logging and configuration.

pub mod config;
pub mod error;
pub mod rate_limit;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use inference_engine::{InferenceEngine, ModelHandle};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use pipeline::RipenessPipeline;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

pub use crate::config::AppConfig;
pub use crate::error::{ApiError, ErrorResponse};
pub use crate::rate_limit::RateLimitConfig;

/// Room for multipart framing on top of the upload cap
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Application state shared across handlers
pub struct AppState {
    pub pipeline: RipenessPipeline,
    pub config: AppConfig,
    /// Prometheus handle, absent when no recorder was installed
    pub metrics: Option<PrometheusHandle>,
    pub version: String,
    pub start_time: Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(config: AppConfig, pipeline: RipenessPipeline, metrics: Option<PrometheusHandle>) -> Self {
        Self {
            pipeline,
            config,
            metrics,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
        }
    }

    /// Load the model and start the inference worker
    pub async fn build(config: AppConfig, metrics: Option<PrometheusHandle>) -> anyhow::Result<Self> {
        let model_path = config.model_path.clone();
        let labels_path = config.labels_path.clone();
        let handle =
            tokio::task::spawn_blocking(move || ModelHandle::load(&model_path, Some(labels_path.as_path())))
                .await?;

        let engine = Arc::new(InferenceEngine::start(handle, config.engine_config()));
        let pipeline = RipenessPipeline::new(config.pipeline_config(), engine);
        Ok(Self::new(config, pipeline, metrics))
    }
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);

    let mut predict_route = post(routes::predict::predict).layer(DefaultBodyLimit::max(body_limit));
    if let Some(layer) = state.config.rate_limit().as_ref().and_then(rate_limit::governor_layer) {
        predict_route = predict_route.layer(layer);
    }

    Router::new()
        .route("/", get(routes::info::root))
        .route("/health", get(routes::info::health))
        .route("/metrics", get(routes::info::metrics))
        .route("/predict", predict_route)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_origins)),
        )
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(parsed)
}

/// Initialize logging
pub fn init_logging(config: &AppConfig) {
    let level = config.log_level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = FmtSubscriber::builder().with_max_level(level).with_target(true);

    let result = if config.log_json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    if let Err(e) = result {
        eprintln!("Tracing subscriber already set: {e}");
    }
}

/// Install the Prometheus recorder and describe pipeline metrics
pub fn init_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            pipeline::telemetry::describe();
            Some(handle)
        }
        Err(e) => {
            warn!("Metrics exporter unavailable: {}", e);
            None
        }
    }
}

/// Run the server until Ctrl-C
pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    let metrics = init_metrics();
    let addr = config.bind_addr.clone();
    let state = Arc::new(AppState::build(config, metrics).await?);
    let app = create_router(Arc::clone(&state));

    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped, draining inference queue");
    let engine = Arc::clone(state.pipeline.engine());
    tokio::task::spawn_blocking(move || engine.shutdown()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
