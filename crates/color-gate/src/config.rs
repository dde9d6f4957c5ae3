//! Gate configuration

use serde::{Deserialize, Serialize};

/// Default minimum share of matching pixels, in percent
pub const DEFAULT_THRESHOLD_PCT: f64 = 20.0;

/// Default admissible hue band on the 0-180 scale (yellow through green)
pub const DEFAULT_HUE_RANGE: (u8, u8) = (25, 85);

/// Color gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Run the gate at all; when false every image passes
    pub enabled: bool,

    /// Minimum percentage (0-100) of matching pixels to pass
    pub threshold_pct: f64,

    /// Inclusive hue band (0-180 scale)
    pub hue_range: (u8, u8),

    /// Minimum saturation (0-255) for a pixel to match
    pub min_saturation: u8,

    /// Minimum value (0-255) for a pixel to match
    pub min_value: u8,

    /// Leave black, white and gray pixels out of the denominator
    pub exclude_achromatic: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold_pct: DEFAULT_THRESHOLD_PCT,
            hue_range: DEFAULT_HUE_RANGE,
            min_saturation: 0,
            min_value: 0,
            exclude_achromatic: false,
        }
    }
}

impl GateConfig {
    /// Create strict config (dim and washed-out pixels never match)
    pub fn strict() -> Self {
        Self {
            min_saturation: 40,
            min_value: 40,
            ..Default::default()
        }
    }

    /// Create lenient config (lower threshold, background ignored)
    pub fn lenient() -> Self {
        Self {
            threshold_pct: 10.0,
            exclude_achromatic: true,
            ..Default::default()
        }
    }

    /// Config with the gate switched off
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GateConfig::default();
        assert!(config.enabled);
        assert_eq!(config.threshold_pct, 20.0);
        assert_eq!(config.hue_range, (25, 85));
        assert_eq!(config.min_saturation, 0);
        assert!(!config.exclude_achromatic);
    }

    #[test]
    fn test_strict_config() {
        let config = GateConfig::strict();
        assert_eq!(config.min_saturation, 40);
        assert_eq!(config.min_value, 40);
        assert_eq!(config.threshold_pct, 20.0);
    }
}
