//! Ripeness Prediction Pipeline
//!
//! Drives one upload through decode, color gate, preprocessing, inference
//! and heat map rendering, then assembles the response. Gate rejection
//! short-circuits before any model work.

pub mod assembler;
pub mod telemetry;
mod pipeline;

pub use assembler::{PredictionResponse, ResponseMeta, ResponseParts, ResultAssembler, Timing};
pub use pipeline::{PipelineConfig, PredictRequest, RipenessPipeline};

use image_intake::IntakeError;
use inference_engine::InferenceError;
use preprocess::PreprocessError;
use thiserror::Error;

/// Errors that fail a prediction request
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Intake(#[from] IntakeError),

    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error("Invalid threshold {0}: must be between 0 and 100")]
    InvalidThreshold(f64),

    #[error("Pipeline task failed: {0}")]
    Task(String),
}
