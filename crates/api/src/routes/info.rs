//! Service info, health and metrics routes

use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::AppState;

/// Response for `GET /`
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub health: String,
    pub predict: String,
    pub metrics: String,
}

/// Response for `GET /health`
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub gate_available: bool,
    pub gate_enabled: bool,
    pub gate_threshold: f64,
    pub model_input_shape: Option<Vec<Option<usize>>>,
    /// `(H, W, C)` fed to the model, dynamic axes filled with defaults
    pub resolved_input_shape: Option<[usize; 3]>,
    pub labels_loaded: bool,
    pub num_classes: Option<usize>,
    pub uptime_seconds: u64,
    pub message: Option<String>,
}

/// Service info
pub async fn root(State(state): State<Arc<AppState>>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: "Fruit Ripeness API".to_string(),
        version: state.version.clone(),
        health: "/health".to_string(),
        predict: "/predict".to_string(),
        metrics: "/metrics".to_string(),
    })
}

/// Health check handler
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let info = state.pipeline.model_info();
    let gate = state.pipeline.gate().config();

    Json(HealthResponse {
        status: "ok".to_string(),
        model_loaded: info.loaded,
        gate_available: true,
        gate_enabled: gate.enabled,
        gate_threshold: gate.threshold_pct,
        model_input_shape: info.loaded.then(|| info.declared_shape.to_dims()),
        resolved_input_shape: info.loaded.then(|| {
            let shape = &info.resolved_shape;
            [shape.height, shape.width, shape.channels]
        }),
        labels_loaded: info.labels.is_some(),
        num_classes: info.labels.as_ref().map(|labels| labels.len()),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        message: (!info.loaded).then(|| {
            format!(
                "Place the ONNX model at '{}' and restart.",
                state.config.model_path.display()
            )
        }),
    })
}

/// Prometheus text exposition
pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let handle = state.metrics.as_ref().ok_or(ApiError::MetricsUnavailable)?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    ))
}
