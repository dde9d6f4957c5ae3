//! Image to tensor conversion

use image::imageops::{self, FilterType};
use image_intake::DecodedImage;
use ndarray::Array3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::shape::{InputShape, ResolvedShape};
use crate::PreprocessError;

/// Largest value of an 8-bit sample
const U8_MAX: f32 = 255.0;

/// Resize interpolation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    Nearest,
    #[default]
    Triangle,
    CatmullRom,
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Preprocessing configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Interpolation used when resizing
    pub resize_filter: ResizeFilter,
}

/// Model input: `(H, W, C)` float32 in [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    data: Array3<f32>,
}

impl InputTensor {
    /// Wrap an existing array
    pub fn new(data: Array3<f32>) -> Self {
        Self { data }
    }

    /// `(H, W, C)`
    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// `[1, H, W, C]`
    pub fn batched_shape(&self) -> [usize; 4] {
        let (h, w, c) = self.data.dim();
        [1, h, w, c]
    }

    /// Underlying array
    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    /// Values in row-major (H, W, C) order
    pub fn to_vec(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }
}

/// Tensor plus the shape it was built for
#[derive(Debug, Clone)]
pub struct PreparedInput {
    pub tensor: InputTensor,
    pub shape: ResolvedShape,
}

/// Converts decoded images into model input tensors
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    config: PreprocessConfig,
}

impl Preprocessor {
    /// Create a new preprocessor
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    /// Resolve the declared shape and build the tensor.
    ///
    /// Dynamic axes fall back to defaults and are reported in the
    /// returned shape's warnings.
    pub fn prepare(
        &self,
        image: &DecodedImage,
        declared: &InputShape,
    ) -> Result<PreparedInput, PreprocessError> {
        let shape = declared.resolve();
        let tensor = self.prepare_resolved(image, &shape)?;
        Ok(PreparedInput { tensor, shape })
    }

    /// Build a tensor for a concrete `(H, W, C)`
    pub fn prepare_resolved(
        &self,
        image: &DecodedImage,
        shape: &ResolvedShape,
    ) -> Result<InputTensor, PreprocessError> {
        let (h, w, c) = (shape.height, shape.width, shape.channels);
        if h == 0 || w == 0 {
            return Err(PreprocessError::InvalidShape(format!("{h}x{w}x{c}")));
        }
        if image.pixel_count() == 0 {
            return Err(PreprocessError::EmptyImage);
        }

        let resized = imageops::resize(
            image.pixels(),
            w as u32,
            h as u32,
            self.config.resize_filter.into(),
        );

        let values: Vec<f32> = match c {
            1 => imageops::grayscale(&resized)
                .into_raw()
                .into_iter()
                .map(|v| v as f32 / U8_MAX)
                .collect(),
            3 => resized
                .into_raw()
                .into_iter()
                .map(|v| v as f32 / U8_MAX)
                .collect(),
            4 => resized
                .pixels()
                .flat_map(|p| {
                    let [r, g, b] = p.0;
                    [r as f32 / U8_MAX, g as f32 / U8_MAX, b as f32 / U8_MAX, 1.0]
                })
                .collect(),
            other => return Err(PreprocessError::UnsupportedChannels(other)),
        };

        let data = Array3::from_shape_vec((h, w, c), values)
            .map_err(|e| PreprocessError::InvalidShape(e.to_string()))?;

        debug!(
            "Preprocessed {}x{} image to ({}, {}, {})",
            image.width(),
            image.height(),
            h,
            w,
            c
        );
        Ok(InputTensor::new(data))
    }
}
