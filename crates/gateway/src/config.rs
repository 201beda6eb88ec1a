use inference::{DetectorConfig, ExecutionProvider};
use serde::Deserialize;
use std::env;
use std::time::Duration;

pub use common::Environment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Cpu,
    Cuda,
}

impl From<Provider> for ExecutionProvider {
    fn from(provider: Provider) -> Self {
        match provider {
            Provider::Cpu => ExecutionProvider::Cpu,
            Provider::Cuda => ExecutionProvider::Cuda,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: LogLevel,
    pub environment: Environment,
    pub model_path: String,
    pub execution_provider: Provider,
    pub input_size: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
    pub intra_threads: usize,
    pub fetch_timeout_secs: u64,
    pub max_image_bytes: usize,
    pub otel_endpoint: Option<String>,
}

impl Config {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            model_path: self.model_path.clone(),
            input_size: (self.input_size, self.input_size),
            confidence_threshold: self.confidence_threshold,
            iou_threshold: self.iou_threshold,
            max_detections: self.max_detections,
            intra_threads: self.intra_threads,
            execution_provider: self.execution_provider.into(),
        }
    }

    fn validate(self) -> Result<Self, config::ConfigError> {
        let invalid = |msg: String| Err(config::ConfigError::Message(msg));

        if self.input_size == 0 || self.input_size % 32 != 0 {
            return invalid(format!(
                "input_size must be a positive multiple of 32, got {}",
                self.input_size
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return invalid(format!(
                "confidence_threshold must be within [0, 1], got {}",
                self.confidence_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return invalid(format!(
                "iou_threshold must be within [0, 1], got {}",
                self.iou_threshold
            ));
        }
        if self.fetch_timeout_secs == 0 {
            return invalid("fetch_timeout_secs must be greater than zero".to_string());
        }
        if self.max_detections == 0 || self.max_image_bytes == 0 || self.intra_threads == 0 {
            return invalid(
                "max_detections, max_image_bytes and intra_threads must be greater than zero"
                    .to_string(),
            );
        }

        Ok(self)
    }
}

/// Load configuration from defaults, `GATEWAY_*` environment variables and
/// finally the bare `PORT` variable set by most hosting platforms.
pub fn get_configuration() -> Result<Config, config::ConfigError> {
    let config = config::Config::builder()
        .set_default("host", "0.0.0.0")?
        .set_default("port", 5000_i64)?
        .set_default("log_level", "info")?
        .set_default("environment", "development")?
        .set_default("model_path", inference::config::DEFAULT_MODEL_PATH)?
        .set_default("execution_provider", "cpu")?
        .set_default("input_size", 640_i64)?
        .set_default("confidence_threshold", 0.25_f64)?
        .set_default("iou_threshold", 0.7_f64)?
        .set_default("max_detections", 300_i64)?
        .set_default("intra_threads", 4_i64)?
        .set_default("fetch_timeout_secs", 15_i64)?
        .set_default("max_image_bytes", 16 * 1024 * 1024_i64)?
        .add_source(
            config::Environment::with_prefix("GATEWAY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .set_override_option("port", env::var("PORT").ok())?
        .build()?;

    let config: Config = config.try_deserialize::<Config>()?;

    config.validate()
}
