//! ONNX Inference Engine
//!
//! Owns the loaded ripeness model and runs it on a dedicated worker thread.
//! All model calls are serialized through a bounded queue; callers wait with
//! a deadline and queued jobs whose caller gave up are never executed.

mod backend;
mod engine;
mod handle;
mod labels;
mod outputs;
mod worker;

pub use backend::{ModelBackend, RawOutput, TractBackend};
pub use engine::{EngineConfig, InferenceEngine, InferenceRun};
pub use handle::{ModelHandle, ModelInfo};
pub use labels::{build_predictions, LabelVocabulary, LabeledPrediction};
pub use outputs::ModelOutputs;

use thiserror::Error;

/// Errors during inference
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model not loaded")]
    ModelNotLoaded,
    #[error("Model load failed: {0}")]
    ModelLoadError(String),
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Invalid input shape: expected {expected}, got {actual}")]
    InvalidInputShape { expected: String, actual: String },
    #[error("Inference queue full ({0} pending)")]
    QueueFull(usize),
    #[error("Inference timeout after {0}ms")]
    Timeout(u64),
    #[error("Inference worker stopped")]
    WorkerStopped,
}
