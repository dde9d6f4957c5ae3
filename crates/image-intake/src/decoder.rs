//! Admission checks and primary/fallback decoding

use tracing::{debug, warn};

use crate::codec::{DeclaredFormatCodec, ImageCodec, SniffingCodec};
use crate::frame::{DecodedImage, RawImage};
use crate::{IntakeConfig, IntakeError};

/// Image decoder with a fallback codec
#[derive(Debug)]
pub struct ImageDecoder {
    config: IntakeConfig,
    primary: Box<dyn ImageCodec>,
    fallback: Box<dyn ImageCodec>,
}

impl ImageDecoder {
    /// Create a decoder with the default codec pair, both bound by the configured limits
    pub fn new(config: IntakeConfig) -> Self {
        let limits = config.limits();
        Self::with_codecs(
            config,
            Box::new(DeclaredFormatCodec::new(limits.clone())),
            Box::new(SniffingCodec::new(limits)),
        )
    }

    /// Create a decoder with explicit codecs
    pub fn with_codecs(
        config: IntakeConfig,
        primary: Box<dyn ImageCodec>,
        fallback: Box<dyn ImageCodec>,
    ) -> Self {
        Self {
            config,
            primary,
            fallback,
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    /// Reject uploads that cannot be images before touching a codec
    pub fn admit(&self, raw: &RawImage) -> Result<(), IntakeError> {
        if !self.config.accepts(raw.content_type.as_deref()) {
            return Err(IntakeError::UnsupportedContentType(
                raw.content_type.clone().unwrap_or_default(),
            ));
        }
        if raw.is_empty() {
            return Err(IntakeError::Empty);
        }
        if raw.len() > self.config.max_bytes {
            return Err(IntakeError::SizeExceeded {
                size: raw.len(),
                limit: self.config.max_bytes,
            });
        }
        Ok(())
    }

    /// Decode an upload into an RGB image
    pub fn decode(&self, raw: &RawImage) -> Result<DecodedImage, IntakeError> {
        self.admit(raw)?;
        let hint = raw.format_hint();

        let primary_err = match self.primary.decode(&raw.bytes, hint) {
            Ok(image) => {
                let decoded = DecodedImage::from_dynamic(image, self.primary.name());
                debug!(
                    "Image decoded via {} codec: {}x{} ({:?})",
                    decoded.codec(),
                    decoded.width(),
                    decoded.height(),
                    decoded.source_color()
                );
                return Ok(decoded);
            }
            Err(e) => e,
        };

        if primary_err.is_limit() {
            warn!("{} codec refused image: {}", self.primary.name(), primary_err);
            return Err(IntakeError::LimitExceeded(primary_err.to_string()));
        }

        warn!(
            "{} codec failed ({}); trying {} codec",
            self.primary.name(),
            primary_err,
            self.fallback.name()
        );

        match self.fallback.decode(&raw.bytes, hint) {
            Ok(image) => {
                let decoded = DecodedImage::from_dynamic(image, self.fallback.name());
                debug!(
                    "Image decoded via {} codec: {}x{} ({:?})",
                    decoded.codec(),
                    decoded.width(),
                    decoded.height(),
                    decoded.source_color()
                );
                Ok(decoded)
            }
            Err(fallback_err) if fallback_err.is_limit() => {
                Err(IntakeError::LimitExceeded(fallback_err.to_string()))
            }
            Err(fallback_err) => Err(IntakeError::Decode {
                primary: primary_err.to_string(),
                fallback: fallback_err.to_string(),
            }),
        }
    }
}

impl Default for ImageDecoder {
    fn default() -> Self {
        Self::new(IntakeConfig::default())
    }
}
