//! Prediction route

use std::sync::Arc;

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, Query, State};
use axum::Json;
use pipeline::{PredictRequest, PredictionResponse};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::AppState;

/// Multipart field carrying the image
pub const FILE_FIELD: &str = "file";
/// Optional multipart field overriding the gate threshold
pub const THRESHOLD_FIELD: &str = "threshold";

/// Query parameters for the predict endpoint
#[derive(Debug, Default, Deserialize)]
pub struct PredictParams {
    /// Gate threshold in percent
    pub threshold: Option<f64>,
}

/// Classify an uploaded image
pub async fn predict(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PredictParams>,
    mut multipart: Multipart,
) -> Result<Json<PredictionResponse>, ApiError> {
    let mut upload: Option<(Vec<u8>, Option<String>)> = None;
    let mut threshold = params.threshold;

    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(FILE_FIELD) => {
                let filename = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(upload_error)?;
                info!(
                    "Received upload {:?} ({} bytes, {:?})",
                    filename.as_deref().unwrap_or("<unnamed>"),
                    bytes.len(),
                    content_type
                );
                upload = Some((bytes.to_vec(), content_type));
            }
            Some(THRESHOLD_FIELD) => threshold = Some(parse_threshold(field).await?),
            other => debug!("Ignoring multipart field {:?}", other),
        }
    }

    let (bytes, content_type) =
        upload.ok_or_else(|| ApiError::bad_request(format!("Missing '{FILE_FIELD}' field")))?;
    let request = PredictRequest::new(bytes, content_type).with_threshold(threshold);

    let response = state.pipeline.predict(request).await?;
    Ok(Json(response))
}

async fn parse_threshold(field: Field<'_>) -> Result<f64, ApiError> {
    let text = field.text().await.map_err(upload_error)?;
    text.trim().parse::<f64>().map_err(|_| ApiError::BadRequest {
        error: "Invalid threshold".to_string(),
        detail: Some(format!("'{}' is not a number", text.trim())),
    })
}

fn upload_error(e: MultipartError) -> ApiError {
    ApiError::Upload(e.body_text(), e.status())
}
