//! Image codecs used by the decoder

use std::io::Cursor;

use image::{DynamicImage, ImageError, ImageFormat, ImageReader, Limits};
use thiserror::Error;

/// Codec failure
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("no image format declared")]
    NoFormatHint,

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodecError {
    /// Whether the image was refused for its dimensions or allocation size
    pub fn is_limit(&self) -> bool {
        matches!(self, CodecError::Image(ImageError::Limits(_)))
    }
}

/// A single decoding strategy
pub trait ImageCodec: Send + Sync + std::fmt::Debug {
    /// Short name used in logs and metadata
    fn name(&self) -> &'static str;

    /// Decode bytes, optionally guided by the declared format
    fn decode(&self, bytes: &[u8], hint: Option<ImageFormat>) -> Result<DynamicImage, CodecError>;
}

/// Strict codec: decodes with the format named by the content type
#[derive(Debug, Default, Clone)]
pub struct DeclaredFormatCodec {
    limits: Limits,
}

impl DeclaredFormatCodec {
    pub fn new(limits: Limits) -> Self {
        Self { limits }
    }
}

impl ImageCodec for DeclaredFormatCodec {
    fn name(&self) -> &'static str {
        "declared"
    }

    fn decode(&self, bytes: &[u8], hint: Option<ImageFormat>) -> Result<DynamicImage, CodecError> {
        let format = hint.ok_or(CodecError::NoFormatHint)?;
        let mut reader = ImageReader::with_format(Cursor::new(bytes), format);
        reader.limits(self.limits.clone());
        Ok(reader.decode()?)
    }
}

/// Permissive codec: sniffs the format from magic bytes, ignoring the declared one
#[derive(Debug, Default, Clone)]
pub struct SniffingCodec {
    limits: Limits,
}

impl SniffingCodec {
    pub fn new(limits: Limits) -> Self {
        Self { limits }
    }
}

impl ImageCodec for SniffingCodec {
    fn name(&self) -> &'static str {
        "sniffing"
    }

    fn decode(&self, bytes: &[u8], _hint: Option<ImageFormat>) -> Result<DynamicImage, CodecError> {
        let mut reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
        reader.limits(self.limits.clone());
        Ok(reader.decode()?)
    }
}
