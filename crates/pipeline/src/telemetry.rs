//! Metric names recorded by the pipeline

use metrics::{describe_counter, describe_histogram, Unit};

pub const REQUESTS_TOTAL: &str = "ripeness_requests_total";
pub const GATE_REJECTIONS_TOTAL: &str = "ripeness_gate_rejections_total";
pub const RENDER_FAILURES_TOTAL: &str = "ripeness_render_failures_total";
pub const INFERENCE_MS: &str = "ripeness_inference_ms";

/// Register descriptions with the installed recorder
pub fn describe() {
    describe_counter!(REQUESTS_TOTAL, "Prediction requests received");
    describe_counter!(GATE_REJECTIONS_TOTAL, "Uploads rejected by the color gate");
    describe_counter!(RENDER_FAILURES_TOTAL, "Heat maps omitted after a render failure");
    describe_histogram!(INFERENCE_MS, Unit::Milliseconds, "Model execution time");
}
