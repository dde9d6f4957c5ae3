use std::io::Cursor;
use std::sync::Arc;

use api::{create_router, AppConfig, AppState};
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use image::{ImageFormat, Rgb, RgbImage};
use inference_engine::{
    EngineConfig, InferenceEngine, InferenceError, LabelVocabulary, ModelBackend, ModelHandle, RawOutput,
};
use pipeline::RipenessPipeline;
use preprocess::{InputShape, InputTensor};
use serde_json::Value;
use tower::ServiceExt;

const BOUNDARY: &str = "ripeness-test-boundary";

struct FakeModel;

impl ModelBackend for FakeModel {
    fn name(&self) -> &str {
        "fake"
    }

    fn run(&mut self, _input: &InputTensor) -> Result<Vec<RawOutput>, InferenceError> {
        Ok(vec![
            RawOutput::new(vec![1, 4, 4, 1], (0..16).map(|i| i as f32).collect()),
            RawOutput::new(vec![1, 3], vec![0.1, 0.7, 0.2]),
            RawOutput::new(vec![1, 1], vec![0.95]),
        ])
    }
}

fn test_config() -> AppConfig {
    AppConfig {
        rate_limit_enabled: false,
        ..AppConfig::default()
    }
}

fn router_with(handle: ModelHandle) -> Router {
    let config = test_config();
    let engine = Arc::new(InferenceEngine::start(handle, EngineConfig::default()));
    let pipeline = RipenessPipeline::new(config.pipeline_config(), engine);
    create_router(Arc::new(AppState::new(config, pipeline, None)))
}

fn loaded_router() -> Router {
    let labels = LabelVocabulary::new(vec!["unripe".into(), "ripe".into(), "overripe".into()]);
    router_with(ModelHandle::from_backend(
        Box::new(FakeModel),
        InputShape::fixed(8, 8, 3),
        Some(labels),
    ))
}

fn unloaded_router() -> Router {
    router_with(ModelHandle::not_loaded(None, None))
}

fn png(color: [u8; 3]) -> Vec<u8> {
    let image = RgbImage::from_pixel(12, 12, Rgb(color));
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
}

fn multipart(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, content_type, data) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match content_type {
            Some(ct) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"upload\"\r\nContent-Type: {ct}\r\n\r\n"
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            ),
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n".as_slice());
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn predict_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_root_lists_endpoints() {
    let (status, body) = send(loaded_router(), get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Fruit Ripeness API");
    assert_eq!(body["health"], "/health");
}

#[tokio::test]
async fn test_health_reports_loaded_model() {
    let (status, body) = send(loaded_router(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["model_loaded"], true);
    assert_eq!(body["gate_enabled"], true);
    assert_eq!(body["gate_threshold"], 20.0);
    assert_eq!(body["num_classes"], 3);
    assert_eq!(body["model_input_shape"], serde_json::json!([1, 8, 8, 3]));
    assert_eq!(body["resolved_input_shape"], serde_json::json!([8, 8, 3]));
    assert!(body["message"].is_null());
}

#[tokio::test]
async fn test_health_resolves_dynamic_input_shape() {
    let router = router_with(ModelHandle::from_backend(
        Box::new(FakeModel),
        InputShape::from_dims(&[None, None, None, Some(3)]),
        None,
    ));
    let (status, body) = send(router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model_input_shape"], serde_json::json!([null, null, null, 3]));
    assert_eq!(body["resolved_input_shape"], serde_json::json!([224, 224, 3]));
}

#[tokio::test]
async fn test_health_without_model() {
    let (status, body) = send(unloaded_router(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model_loaded"], false);
    assert!(body["model_input_shape"].is_null());
    assert!(body["resolved_input_shape"].is_null());
    assert!(body["message"].as_str().unwrap().contains("model.onnx"));
}

#[tokio::test]
async fn test_predict_green_image() {
    let body = multipart(&[("file", Some("image/png"), png([60, 200, 40]).as_slice())]);
    let (status, body) = send(loaded_router(), predict_request("/predict", body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["is_guava"], true);
    assert_eq!(body["predictions"][0]["label"], "ripe");
    assert_eq!(body["predictions"].as_array().unwrap().len(), 3);
    assert!(body["thermal_image"]
        .as_str()
        .unwrap()
        .starts_with("data:image/png;base64,"));
    assert_eq!(body["meta"]["resolved_input_shape"], serde_json::json!([8, 8, 3]));
}

#[tokio::test]
async fn test_predict_rejected_by_gate() {
    let body = multipart(&[("file", Some("image/png"), png([30, 60, 220]).as_slice())]);
    let (status, body) = send(loaded_router(), predict_request("/predict", body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["is_guava"], false);
    assert_eq!(body["predictions"], serde_json::json!([]));
    assert!(body["thermal_image"].is_null());
    assert_eq!(body["meta"]["gate_confidence"], 0.0);
}

#[tokio::test]
async fn test_threshold_field_and_query() {
    let green = png([60, 200, 40]);

    let body = multipart(&[("threshold", None, b"150".as_slice()), ("file", Some("image/png"), green.as_slice())]);
    let (status, body) = send(loaded_router(), predict_request("/predict", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let body = multipart(&[("threshold", None, b"abc".as_slice()), ("file", Some("image/png"), green.as_slice())]);
    let (status, _) = send(loaded_router(), predict_request("/predict", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let body = multipart(&[("file", Some("image/png"), green.as_slice())]);
    let (status, body) = send(loaded_router(), predict_request("/predict?threshold=100", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_guava"], true);
}

#[tokio::test]
async fn test_predict_without_model_is_unavailable() {
    let body = multipart(&[("file", Some("image/png"), png([60, 200, 40]).as_slice())]);
    let (status, body) = send(unloaded_router(), predict_request("/predict", body)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Model not loaded");
}

#[tokio::test]
async fn test_bad_uploads_are_client_errors() {
    let garbage = multipart(&[("file", Some("image/png"), b"definitely not an image".as_slice())]);
    let (status, body) = send(loaded_router(), predict_request("/predict", garbage)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Cannot decode image");

    let text = multipart(&[("file", Some("text/plain"), b"hello".as_slice())]);
    let (status, _) = send(loaded_router(), predict_request("/predict", text)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let empty = multipart(&[("file", Some("image/png"), b"".as_slice())]);
    let (status, body) = send(loaded_router(), predict_request("/predict", empty)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Empty file");

    let missing = multipart(&[("other", None, b"x".as_slice())]);
    let (status, _) = send(loaded_router(), predict_request("/predict", missing)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oversized_upload() {
    let config = AppConfig {
        max_upload_bytes: 64,
        ..test_config()
    };
    let handle = ModelHandle::from_backend(Box::new(FakeModel), InputShape::fixed(8, 8, 3), None);
    let engine = Arc::new(InferenceEngine::start(handle, EngineConfig::default()));
    let pipeline = RipenessPipeline::new(config.pipeline_config(), engine);
    let router = create_router(Arc::new(AppState::new(config, pipeline, None)));

    let body = multipart(&[("file", Some("image/png"), [0u8; 1024].as_slice())]);
    let (status, _) = send(router, predict_request("/predict", body)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_image_dimensions_over_cap() {
    let config = AppConfig {
        max_image_dimension: 8,
        ..test_config()
    };
    let handle = ModelHandle::from_backend(Box::new(FakeModel), InputShape::fixed(8, 8, 3), None);
    let engine = Arc::new(InferenceEngine::start(handle, EngineConfig::default()));
    let pipeline = RipenessPipeline::new(config.pipeline_config(), engine);
    let router = create_router(Arc::new(AppState::new(config, pipeline, None)));

    let body = multipart(&[("file", Some("image/png"), png([60, 200, 40]).as_slice())]);
    let (status, body) = send(router, predict_request("/predict", body)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"], "Image dimensions too large");
}

#[tokio::test]
async fn test_metrics_without_recorder() {
    let response = loaded_router().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
