//! HTTP error mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use image_intake::IntakeError;
use inference_engine::InferenceError;
use pipeline::PipelineError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

/// Error body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{error}")]
    BadRequest { error: String, detail: Option<String> },

    #[error("Upload rejected: {0}")]
    Upload(String, StatusCode),

    #[error("Metrics exporter not installed")]
    MetricsUnavailable,

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ApiError {
    /// Bad request with a short reason
    pub fn bad_request(error: impl Into<String>) -> Self {
        Self::BadRequest {
            error: error.into(),
            detail: None,
        }
    }

    fn parts(&self) -> (StatusCode, String, Option<String>) {
        match self {
            ApiError::BadRequest { error, detail } => (StatusCode::BAD_REQUEST, error.clone(), detail.clone()),
            ApiError::Upload(detail, status) => (*status, "Cannot read upload".to_string(), Some(detail.clone())),
            ApiError::MetricsUnavailable => (StatusCode::SERVICE_UNAVAILABLE, self.to_string(), None),
            ApiError::Pipeline(e) => pipeline_parts(e),
        }
    }
}

fn pipeline_parts(e: &PipelineError) -> (StatusCode, String, Option<String>) {
    let detail = Some(e.to_string());
    match e {
        PipelineError::Intake(intake) => match intake {
            IntakeError::Empty => (StatusCode::BAD_REQUEST, "Empty file".into(), None),
            IntakeError::UnsupportedContentType(_) => (
                StatusCode::BAD_REQUEST,
                intake.to_string(),
                Some("Please upload a JPEG, PNG, WEBP, BMP, TIFF or GIF image.".into()),
            ),
            IntakeError::SizeExceeded { limit, .. } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("File too large (max {} MB)", limit / (1024 * 1024)),
                detail,
            ),
            IntakeError::Decode { .. } => (StatusCode::BAD_REQUEST, "Cannot decode image".into(), detail),
            IntakeError::LimitExceeded(_) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "Image dimensions too large".into(),
                detail,
            ),
        },
        PipelineError::InvalidThreshold(_) => (StatusCode::BAD_REQUEST, e.to_string(), None),
        PipelineError::Inference(inference) => match inference {
            InferenceError::ModelNotLoaded => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Model not loaded".into(),
                Some("Place the ONNX model at the configured model_path and restart the server.".into()),
            ),
            InferenceError::QueueFull(_) => (StatusCode::SERVICE_UNAVAILABLE, "Server busy".into(), detail),
            InferenceError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "Inference timed out".into(), detail),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Inference failed".into(), detail),
        },
        PipelineError::Preprocess(_) | PipelineError::Task(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Processing failed".into(), detail)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, detail) = self.parts();
        if status.is_server_error() {
            error!("{}: {}", error, detail.as_deref().unwrap_or(""));
        } else {
            warn!("Request rejected ({}): {}", status.as_u16(), error);
        }

        let body = ErrorResponse {
            success: false,
            error,
            detail,
        };
        (status, Json(body)).into_response()
    }
}
