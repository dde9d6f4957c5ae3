//! Preprocessing for Model Inference
//!
//! Adapts a decoded image to the model's fixed input tensor:
//! - Declared shape with explicit dynamic axes and documented defaults
//! - Deterministic resize, optional luminance reduction
//! - Normalization of 8-bit samples to float32 in [0, 1]

mod shape;
mod tensor;

pub use shape::{Dimension, InputShape, ResolvedShape, DEFAULT_CHANNELS, DEFAULT_SPATIAL};
pub use tensor::{InputTensor, PreparedInput, PreprocessConfig, Preprocessor, ResizeFilter};

use thiserror::Error;

/// Errors during preprocessing
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Unsupported channel count: {0} (expected 1, 3 or 4)")]
    UnsupportedChannels(usize),
    #[error("Invalid target shape: {0}")]
    InvalidShape(String),
    #[error("Image has no pixels")]
    EmptyImage,
}
