//! Service configuration
//!
//! Layered from an optional TOML file and `RIPENESS_*` environment
//! variables, on top of the defaults below.

use std::path::PathBuf;

use color_gate::GateConfig;
use config::{Config, ConfigError, Environment, File};
use image_intake::IntakeConfig;
use inference_engine::EngineConfig;
use pipeline::PipelineConfig;
use serde::{Deserialize, Serialize};
use thermal_render::{Palette, RenderConfig};

use crate::rate_limit::RateLimitConfig;

/// Config file read when `RIPENESS_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "config/ripeness.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "RIPENESS";

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// ONNX model file
    pub model_path: PathBuf,
    /// JSON array of class names
    pub labels_path: PathBuf,
    pub gate_enabled: bool,
    /// Minimum share of in-band pixels, in percent
    pub gate_threshold: f64,
    pub max_upload_bytes: usize,
    /// Largest width or height accepted after decoding
    pub max_image_dimension: u32,
    pub bind_addr: String,
    pub cors_origins: Vec<String>,
    pub queue_depth: usize,
    /// Longest a request waits for the model, queueing included
    pub request_timeout_secs: u64,
    pub heatmap_palette: Palette,
    pub rate_limit_enabled: bool,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
    pub log_level: String,
    pub log_json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("./model/model.onnx"),
            labels_path: PathBuf::from("./model/labels.json"),
            gate_enabled: true,
            gate_threshold: color_gate::DEFAULT_THRESHOLD_PCT,
            max_upload_bytes: image_intake::DEFAULT_MAX_BYTES,
            max_image_dimension: image_intake::DEFAULT_MAX_DIMENSION,
            bind_addr: "0.0.0.0:8000".to_string(),
            cors_origins: vec!["http://localhost:5173".to_string()],
            queue_depth: 8,
            request_timeout_secs: 120,
            heatmap_palette: Palette::Inferno,
            rate_limit_enabled: true,
            rate_limit_per_second: 2,
            rate_limit_burst: 5,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl AppConfig {
    /// Load from `RIPENESS_CONFIG` (or the default path) and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(format!("{ENV_PREFIX}_CONFIG"))
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    /// Load from a specific file; a missing file is not an error
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors_origins"),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=100.0).contains(&self.gate_threshold) {
            return Err(ConfigError::Message(format!(
                "gate_threshold must be between 0 and 100, got {}",
                self.gate_threshold
            )));
        }
        if self.queue_depth == 0 {
            return Err(ConfigError::Message("queue_depth must be at least 1".into()));
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Message("max_upload_bytes must be positive".into()));
        }
        if self.max_image_dimension == 0 {
            return Err(ConfigError::Message("max_image_dimension must be positive".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Message("request_timeout_secs must be positive".into()));
        }
        if self.rate_limit_enabled && (self.rate_limit_per_second == 0 || self.rate_limit_burst == 0) {
            return Err(ConfigError::Message(
                "rate limit period and burst must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Stage configuration for the pipeline
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            intake: IntakeConfig {
                max_dimension: self.max_image_dimension,
                ..IntakeConfig::with_max_bytes(self.max_upload_bytes)
            },
            gate: GateConfig {
                enabled: self.gate_enabled,
                threshold_pct: self.gate_threshold,
                ..GateConfig::default()
            },
            render: RenderConfig {
                palette: self.heatmap_palette,
            },
            ..PipelineConfig::default()
        }
    }

    /// Inference queue settings
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            queue_depth: self.queue_depth,
            wait_timeout_ms: self.request_timeout_secs * 1000,
        }
    }

    /// Per-IP limits for `/predict`, if enabled
    pub fn rate_limit(&self) -> Option<RateLimitConfig> {
        self.rate_limit_enabled.then(|| RateLimitConfig {
            per_second: self.rate_limit_per_second,
            burst_size: self.rate_limit_burst,
        })
    }
}
