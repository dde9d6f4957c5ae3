//! Hue-band gate evaluation

use image_intake::DecodedImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::GateConfig;
use crate::hsv::{rgb_to_hsv, Hsv};

/// Outcome of the color gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateVerdict {
    /// Whether the image looks like the target fruit
    pub passed: bool,
    /// Share of matching pixels in [0, 1]; absent when the gate is disabled
    pub match_fraction: Option<f64>,
    /// Human-readable explanation
    pub message: String,
}

impl GateVerdict {
    /// Verdict used when the gate is switched off
    pub fn bypassed() -> Self {
        Self {
            passed: true,
            match_fraction: None,
            message: "Gate disabled, all images pass".to_string(),
        }
    }
}

/// Pixel counts behind a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HueCounts {
    /// Pixels inside the admissible band
    pub matching: usize,
    /// Pixels counted in the denominator
    pub counted: usize,
}

impl HueCounts {
    /// Matching share in [0, 1]
    pub fn fraction(&self) -> f64 {
        if self.counted == 0 {
            0.0
        } else {
            self.matching as f64 / self.counted as f64
        }
    }

    /// Matching share in percent, always `fraction() * 100`
    pub fn percent(&self) -> f64 {
        self.fraction() * 100.0
    }
}

/// Color gate
///
/// Pure function of the pixels, the configured band and the threshold.
#[derive(Debug, Clone, Default)]
pub struct ColorGate {
    config: GateConfig,
}

impl ColorGate {
    /// Create a new gate with given config
    pub fn new(config: GateConfig) -> Self {
        if config.enabled {
            info!(
                "Color gate ready: hue {}-{}, min match {:.1}%",
                config.hue_range.0, config.hue_range.1, config.threshold_pct
            );
        } else {
            info!("Color gate disabled, all images will pass through");
        }
        Self { config }
    }

    /// Configuration in use
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Whether the gate runs at all
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Configured threshold in percent
    pub fn threshold(&self) -> f64 {
        self.config.threshold_pct
    }

    /// Whether one pixel falls inside the admissible band
    pub fn matches(&self, hsv: Hsv) -> bool {
        let (low, high) = self.config.hue_range;
        hsv.hue >= low
            && hsv.hue <= high
            && hsv.saturation >= self.config.min_saturation
            && hsv.value >= self.config.min_value
    }

    /// Count matching pixels
    pub fn count(&self, image: &DecodedImage) -> HueCounts {
        let mut counts = HueCounts::default();
        for pixel in image.pixels().pixels() {
            let [r, g, b] = pixel.0;
            let hsv = rgb_to_hsv(r, g, b);
            if self.config.exclude_achromatic && hsv.is_achromatic() {
                continue;
            }
            counts.counted += 1;
            if self.matches(hsv) {
                counts.matching += 1;
            }
        }
        counts
    }

    /// Evaluate an image against a threshold in percent
    pub fn evaluate(&self, image: &DecodedImage, threshold_pct: f64) -> GateVerdict {
        let counts = self.count(image);
        let fraction = counts.fraction();
        let percent = fraction * 100.0;
        let passed = percent >= threshold_pct;

        let message = if passed {
            format!("Guava confirmed ({:.1}% green/yellow pixels)", percent)
        } else {
            format!(
                "Not a guava: only {:.1}% green/yellow pixels (need at least {:.1}%)",
                percent, threshold_pct
            )
        };

        debug!(
            "Color gate: {}/{} pixels matched ({:.2}%), threshold {:.1}%",
            counts.matching, counts.counted, percent, threshold_pct
        );

        GateVerdict {
            passed,
            match_fraction: Some(fraction),
            message,
        }
    }

    /// Run the gate with an optional per-request threshold
    ///
    /// A disabled gate skips evaluation entirely.
    pub fn check(&self, image: &DecodedImage, threshold_override: Option<f64>) -> GateVerdict {
        if !self.config.enabled {
            return GateVerdict::bypassed();
        }
        let threshold = threshold_override.unwrap_or(self.config.threshold_pct);
        let verdict = self.evaluate(image, threshold);
        info!("Color gate: {}", verdict.message);
        verdict
    }
}
