//! Response assembly

use std::time::Duration;

use color_gate::GateVerdict;
use inference_engine::LabeledPrediction;
use preprocess::ResolvedShape;
use serde::{Deserialize, Serialize};
use thermal_render::HeatmapImage;

/// Body returned for a handled prediction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub success: bool,
    pub is_guava: bool,
    /// Gate explanation, set when the gate rejected the image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Labeled confidences, highest first
    pub predictions: Vec<LabeledPrediction>,
    /// Heat map as a `data:image/png;base64,...` URI
    pub thermal_image: Option<String>,
    pub meta: ResponseMeta,
}

/// Timing and shape details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMeta {
    /// Input shape as the model declares it, `None` for dynamic axes
    pub model_input_shape: Vec<Option<usize>>,
    /// `[H, W, C]` actually fed to the model
    pub resolved_input_shape: Option<[usize; 3]>,
    pub processing_time_ms: f64,
    pub queue_wait_ms: f64,
    pub total_time_ms: f64,
    /// Share of matching pixels in [0, 1]
    pub gate_confidence: Option<f64>,
    pub gate_message: String,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Elapsed times for one request
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Timing {
    /// Model execution
    pub processing: Duration,
    /// Wait for the inference worker
    pub queued: Duration,
    /// Whole request
    pub total: Duration,
}

/// Everything the assembler needs
#[derive(Debug, Clone)]
pub struct ResponseParts {
    pub verdict: GateVerdict,
    pub predictions: Vec<LabeledPrediction>,
    pub heatmap: Option<HeatmapImage>,
    pub model_input_shape: Vec<Option<usize>>,
    pub resolved_shape: Option<ResolvedShape>,
    pub timing: Timing,
    pub warnings: Vec<String>,
}

impl ResponseParts {
    /// Parts for a gate rejection: no predictions, no heat map
    pub fn rejected(verdict: GateVerdict, model_input_shape: Vec<Option<usize>>, total: Duration) -> Self {
        Self {
            verdict,
            predictions: Vec::new(),
            heatmap: None,
            model_input_shape,
            resolved_shape: None,
            timing: Timing {
                total,
                ..Timing::default()
            },
            warnings: Vec::new(),
        }
    }
}

/// Builds the response value
pub struct ResultAssembler;

impl ResultAssembler {
    /// Combine gate outcome, predictions and heat map.
    ///
    /// A failed gate always yields an empty prediction list and no heat map.
    pub fn assemble(parts: ResponseParts) -> PredictionResponse {
        let ResponseParts {
            verdict,
            mut predictions,
            mut heatmap,
            model_input_shape,
            resolved_shape,
            timing,
            mut warnings,
        } = parts;

        if !verdict.passed {
            predictions.clear();
            heatmap = None;
        }
        if let Some(shape) = &resolved_shape {
            warnings.extend(shape.warnings.iter().cloned());
        }

        PredictionResponse {
            success: true,
            is_guava: verdict.passed,
            message: (!verdict.passed).then(|| verdict.message.clone()),
            predictions,
            thermal_image: heatmap.map(|h| h.to_data_uri()),
            meta: ResponseMeta {
                model_input_shape,
                resolved_input_shape: resolved_shape.map(|s| [s.height, s.width, s.channels]),
                processing_time_ms: millis(timing.processing),
                queue_wait_ms: millis(timing.queued),
                total_time_ms: millis(timing.total),
                gate_confidence: verdict.match_fraction.map(|f| round_to(f, 4)),
                gate_message: verdict.message,
                warnings,
            },
        }
    }
}

fn millis(duration: Duration) -> f64 {
    round_to(duration.as_secs_f64() * 1000.0, 2)
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}
