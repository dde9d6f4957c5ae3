//! Request orchestration

use std::sync::Arc;
use std::time::Instant;

use color_gate::{ColorGate, GateConfig, GateVerdict};
use image_intake::{DecodedImage, ImageDecoder, IntakeConfig, RawImage};
use inference_engine::{build_predictions, InferenceEngine, ModelInfo};
use metrics::{counter, histogram};
use ndarray::ArrayD;
use preprocess::{PreparedInput, PreprocessConfig, Preprocessor};
use serde::{Deserialize, Serialize};
use thermal_render::{HeatmapImage, RenderConfig, RenderError, ThermalRenderer};
use tracing::{debug, info, warn};

use crate::assembler::{PredictionResponse, ResponseParts, ResultAssembler, Timing};
use crate::telemetry::{GATE_REJECTIONS_TOTAL, INFERENCE_MS, RENDER_FAILURES_TOTAL, REQUESTS_TOTAL};
use crate::PipelineError;

/// Per-stage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub intake: IntakeConfig,
    pub gate: GateConfig,
    pub preprocess: PreprocessConfig,
    pub render: RenderConfig,
}

/// One uploaded image
#[derive(Debug, Clone)]
pub struct PredictRequest {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    /// Gate threshold in percent, overriding the configured one
    pub threshold: Option<f64>,
}

impl PredictRequest {
    /// Create a request using the configured gate threshold
    pub fn new(bytes: Vec<u8>, content_type: Option<String>) -> Self {
        Self {
            bytes,
            content_type,
            threshold: None,
        }
    }

    /// Override the gate threshold
    pub fn with_threshold(mut self, threshold: Option<f64>) -> Self {
        self.threshold = threshold;
        self
    }
}

/// Ripeness prediction pipeline.
///
/// Decoding, gating, preprocessing and rendering run on the blocking pool
/// and may proceed in parallel across requests. Only the model call is
/// serialized, inside the [`InferenceEngine`].
#[derive(Clone)]
pub struct RipenessPipeline {
    decoder: Arc<ImageDecoder>,
    gate: Arc<ColorGate>,
    preprocessor: Arc<Preprocessor>,
    renderer: Arc<ThermalRenderer>,
    engine: Arc<InferenceEngine>,
}

impl RipenessPipeline {
    /// Create a new pipeline around a started engine
    pub fn new(config: PipelineConfig, engine: Arc<InferenceEngine>) -> Self {
        Self {
            decoder: Arc::new(ImageDecoder::new(config.intake)),
            gate: Arc::new(ColorGate::new(config.gate)),
            preprocessor: Arc::new(Preprocessor::new(config.preprocess)),
            renderer: Arc::new(ThermalRenderer::new(config.render)),
            engine,
        }
    }

    /// Inference engine in use
    pub fn engine(&self) -> &Arc<InferenceEngine> {
        &self.engine
    }

    /// Model metadata
    pub fn model_info(&self) -> &ModelInfo {
        self.engine.info()
    }

    /// Color gate in use
    pub fn gate(&self) -> &ColorGate {
        &self.gate
    }

    /// Upload cap in bytes
    pub fn max_upload_bytes(&self) -> usize {
        self.decoder.config().max_bytes
    }

    /// Handle one upload end to end.
    ///
    /// Gate rejection is a successful response with no predictions and no
    /// heat map; the model is never called for it. A render failure only
    /// drops the heat map.
    pub async fn predict(&self, request: PredictRequest) -> Result<PredictionResponse, PipelineError> {
        let started = Instant::now();
        counter!(REQUESTS_TOTAL).increment(1);

        if let Some(threshold) = request.threshold {
            if !(0.0..=100.0).contains(&threshold) {
                return Err(PipelineError::InvalidThreshold(threshold));
            }
        }
        self.engine.ensure_loaded()?;

        let info = self.engine.info();
        let model_input_shape = info.declared_shape.to_dims();

        let raw = RawImage::new(request.bytes, request.content_type);
        let (image, verdict) = self.decode_and_gate(raw, request.threshold).await?;

        if !verdict.passed {
            counter!(GATE_REJECTIONS_TOTAL).increment(1);
            info!("Color gate rejected image: {}", verdict.message);
            let parts = ResponseParts::rejected(verdict, model_input_shape, started.elapsed());
            return Ok(ResultAssembler::assemble(parts));
        }

        let prepared = self.prepare(image).await?;
        let run = self.engine.infer(prepared.tensor).await?;
        histogram!(INFERENCE_MS).record(run.elapsed.as_secs_f64() * 1000.0);

        let predictions = build_predictions(&run.outputs.ripeness_values(), info.labels.as_ref())?;
        if let Some(top) = predictions.first() {
            info!(
                "Prediction: {} ({:.1}%) in {}ms",
                top.label,
                top.confidence * 100.0,
                run.elapsed.as_millis()
            );
        }

        let mut warnings = Vec::new();
        let heatmap = match run.outputs.thermal {
            Some(thermal) => match self.render(thermal).await {
                Ok(heatmap) => Some(heatmap),
                Err(e) => {
                    counter!(RENDER_FAILURES_TOTAL).increment(1);
                    warn!("Could not render thermal image: {}", e);
                    warnings.push(format!("Thermal image omitted: {e}"));
                    None
                }
            },
            None => {
                debug!("Model produced no thermal output");
                None
            }
        };

        Ok(ResultAssembler::assemble(ResponseParts {
            verdict,
            predictions,
            heatmap,
            model_input_shape,
            resolved_shape: Some(prepared.shape),
            timing: Timing {
                processing: run.elapsed,
                queued: run.queued,
                total: started.elapsed(),
            },
            warnings,
        }))
    }

    async fn decode_and_gate(
        &self,
        raw: RawImage,
        threshold: Option<f64>,
    ) -> Result<(DecodedImage, GateVerdict), PipelineError> {
        self.decoder.admit(&raw)?;
        let decoder = Arc::clone(&self.decoder);
        let gate = Arc::clone(&self.gate);
        tokio::task::spawn_blocking(move || -> Result<_, PipelineError> {
            let image = decoder.decode(&raw)?;
            let verdict = gate.check(&image, threshold);
            Ok((image, verdict))
        })
        .await
        .map_err(|e| PipelineError::Task(e.to_string()))?
    }

    async fn prepare(&self, image: DecodedImage) -> Result<PreparedInput, PipelineError> {
        let preprocessor = Arc::clone(&self.preprocessor);
        let declared = self.engine.info().declared_shape;
        tokio::task::spawn_blocking(move || preprocessor.prepare(&image, &declared))
            .await
            .map_err(|e| PipelineError::Task(e.to_string()))?
            .map_err(PipelineError::from)
    }

    async fn render(&self, thermal: ArrayD<f32>) -> Result<HeatmapImage, RenderError> {
        let renderer = Arc::clone(&self.renderer);
        tokio::task::spawn_blocking(move || renderer.render(thermal.view()))
            .await
            .unwrap_or_else(|e| Err(RenderError::Task(e.to_string())))
    }
}
