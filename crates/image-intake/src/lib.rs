//! Image Intake for the Ripeness Pipeline
//!
//! Turns an uploaded byte stream into a normalized RGB pixel buffer:
//! - Cheap admission checks (content type, empty body, size cap)
//! - Primary decode using the declared format
//! - Fallback decode that sniffs the format from magic bytes
//! - Dimension and allocation limits on both decodes

pub mod codec;
pub mod decoder;
pub mod frame;

pub use codec::{CodecError, DeclaredFormatCodec, ImageCodec, SniffingCodec};
pub use decoder::ImageDecoder;
pub use frame::{DecodedImage, RawImage};

use image::Limits;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default upload cap (20 MiB)
pub const DEFAULT_MAX_BYTES: usize = 20 * 1024 * 1024;

/// Default cap on either image side, in pixels
pub const DEFAULT_MAX_DIMENSION: u32 = 10_000;

/// Default cap on the decoder's buffer allocation (512 MiB)
pub const DEFAULT_MAX_DECODED_BYTES: u64 = 512 * 1024 * 1024;

/// Content types accepted by default
pub const DEFAULT_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "image/bmp",
    "image/tiff",
    "image/gif",
    "application/octet-stream",
];

/// Intake error types
#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Empty upload")]
    Empty,

    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("Upload too large: {size} bytes exceeds limit of {limit} bytes")]
    SizeExceeded { size: usize, limit: usize },

    #[error("Cannot decode image: {primary}; fallback: {fallback}")]
    Decode { primary: String, fallback: String },

    #[error("Image exceeds decode limits: {0}")]
    LimitExceeded(String),
}

/// Intake configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// Maximum accepted upload size in bytes
    pub max_bytes: usize,
    /// Accepted content types (lowercase, without parameters)
    pub allowed_content_types: Vec<String>,
    /// Maximum width and height of a decoded image
    pub max_dimension: u32,
    /// Maximum bytes a codec may allocate while decoding
    pub max_decoded_bytes: u64,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            allowed_content_types: DEFAULT_CONTENT_TYPES.iter().map(|s| s.to_string()).collect(),
            max_dimension: DEFAULT_MAX_DIMENSION,
            max_decoded_bytes: DEFAULT_MAX_DECODED_BYTES,
        }
    }
}

impl IntakeConfig {
    /// Create config with a custom size cap
    pub fn with_max_bytes(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            ..Default::default()
        }
    }

    /// Decode limits applied by both codecs
    pub fn limits(&self) -> Limits {
        let mut limits = Limits::default();
        limits.max_image_width = Some(self.max_dimension);
        limits.max_image_height = Some(self.max_dimension);
        limits.max_alloc = Some(self.max_decoded_bytes);
        limits
    }

    /// Check a declared content type against the allow list.
    ///
    /// Parameters such as `; charset=...` are ignored. An absent or blank
    /// content type is accepted and left to the codecs.
    pub fn accepts(&self, content_type: Option<&str>) -> bool {
        let Some(raw) = content_type else {
            return true;
        };
        let essence = essence(raw);
        if essence.is_empty() {
            return true;
        }
        self.allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&essence))
    }
}

/// Strip MIME parameters and normalize case
pub(crate) fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
