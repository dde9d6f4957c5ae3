//! Thermal Map Rendering
//!
//! Converts the model's single-channel thermal head into a displayable
//! false-color PNG:
//! - Singleton axes are squeezed to an H×W map
//! - Values are min-max normalized per map to 8-bit intensity
//! - Intensity is mapped through a perceptual palette (inferno by default)
//! - The image is PNG encoded and exposed as a `data:` URI

pub mod normalize;
pub mod palette;
pub mod renderer;

pub use normalize::{normalize_intensity, spatial_dims};
pub use palette::Palette;
pub use renderer::{HeatmapImage, RenderConfig, ThermalRenderer};

use thiserror::Error;

/// Rendering error types
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Thermal map has unusable shape {0:?}")]
    Shape(Vec<usize>),

    #[error("Thermal map contains non-finite values")]
    NonFinite,

    #[error("PNG encoding failed: {0}")]
    Encode(String),

    #[error("Render task failed: {0}")]
    Task(String),
}
