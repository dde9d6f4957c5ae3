//! Color Gate
//!
//! Deterministic pre-filter that decides from the color distribution alone
//! whether an image plausibly shows the target fruit:
//! - RGB to 8-bit HSV conversion
//! - Hue-band pixel matching with optional saturation/value floors
//! - Inclusive percentage threshold

pub mod config;
pub mod gate;
pub mod hsv;

pub use config::{GateConfig, DEFAULT_HUE_RANGE, DEFAULT_THRESHOLD_PCT};
pub use gate::{ColorGate, GateVerdict, HueCounts};
pub use hsv::{rgb_to_hsv, Hsv};
